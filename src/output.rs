use std::fs;
use std::path::Path;
use csv::Writer;

use crate::errors::{ProvincialError, Result};
use crate::pipeline::FillReport;
use crate::validation::ValidationReport;

/// Write a list of coordinates to CSV, one `X,Y` row per point
pub fn write_points_csv<P: AsRef<Path>>(points: &[(u32, u32)], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    create_parent_dir(output_path)?;

    let mut writer = Writer::from_path(output_path)?;
    writer.write_record(["X", "Y"])?;
    for &(x, y) in points {
        writer.write_record(&[x.to_string(), y.to_string()])?;
    }

    writer.flush().map_err(|e| ProvincialError::CsvOutput(csv::Error::from(e)))?;

    Ok(())
}

/// Write one row per filled state
pub fn write_region_summary_csv<P: AsRef<Path>>(report: &FillReport, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    create_parent_dir(output_path)?;

    let mut writer = Writer::from_path(output_path)?;
    writer.write_record([
        "R",
        "G",
        "B",
        "X_Min",
        "Y_Min",
        "X_Max",
        "Y_Max",
        "Provinces",
        "Undetermined_Fragments",
        "Stray_Border_Fragments",
    ])?;

    for region in &report.regions {
        writer.write_record(&[
            region.color[0].to_string(),
            region.color[1].to_string(),
            region.color[2].to_string(),
            region.bbox.x_min.to_string(),
            region.bbox.y_min.to_string(),
            region.bbox.x_max.to_string(),
            region.bbox.y_max.to_string(),
            region.provinces.to_string(),
            region.undetermined_fragments.to_string(),
            region.stray_border_fragments.to_string(),
        ])?;
    }

    writer.flush().map_err(|e| ProvincialError::CsvOutput(csv::Error::from(e)))?;

    Ok(())
}

/// Write every validation finding as `Kind,X,Y` rows
pub fn write_validation_csv<P: AsRef<Path>>(report: &ValidationReport, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    create_parent_dir(output_path)?;

    let mut writer = Writer::from_path(output_path)?;
    writer.write_record(["Kind", "X", "Y"])?;

    let spread: Vec<_> = report.spread_out_colors.iter().map(|s| s.origin).collect();
    let findings = [
        ("x_crossing", report.x_crossings.as_slice()),
        ("small_province", report.small_provinces.as_slice()),
        ("spread_out_color", spread.as_slice()),
        ("undetermined", report.undetermined.as_slice()),
    ];

    for (kind, points) in findings {
        for &(x, y) in points {
            writer.write_record(&[kind.to_string(), x.to_string(), y.to_string()])?;
        }
    }

    writer.flush().map_err(|e| ProvincialError::CsvOutput(csv::Error::from(e)))?;

    Ok(())
}

/// Serialize any report to pretty JSON
pub fn write_json_report<T: serde::Serialize, P: AsRef<Path>>(report: &T, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    create_parent_dir(output_path)?;

    let content = serde_json::to_string_pretty(report)?;
    fs::write(output_path, content)?;

    Ok(())
}

/// Write the fragment lists, region summary and JSON report of a fill run
pub fn write_fill_diagnostics<P: AsRef<Path>>(report: &FillReport, output_dir: P) -> Result<()> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    write_points_csv(&report.undetermined_fragments, output_dir.join("undetermined_fragments.csv"))?;
    write_points_csv(&report.stray_border_fragments, output_dir.join("stray_border_fragments.csv"))?;
    write_region_summary_csv(report, output_dir.join("regions.csv"))?;
    write_json_report(report, output_dir.join("report.json"))?;

    Ok(())
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
