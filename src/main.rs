use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use log::{info, warn};

use provincial_rust_lib::config::{Config, UndeterminedHandling};
use provincial_rust_lib::image_io::{load_image, load_matching_image, save_image};
use provincial_rust_lib::output::{write_fill_diagnostics, write_json_report, write_validation_csv};
use provincial_rust_lib::pipeline::{fill_provinces, render_diagnostics};
use provincial_rust_lib::validation::{render_validation, validate_map, ValidationSettings};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Provincial - fills hand-drawn state outlines with unique province colors")]
struct Args {
    /// Province guide with state borders drawn in their unique colors
    #[clap(short, long)]
    guide: Option<String>,

    /// Existing province map whose colors must not be reused
    #[clap(short, long)]
    existing: Option<String>,

    /// Where to save the filled province map
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Undetermined pixel handling (overwrites config)
    #[clap(short = 'u', long)]
    handling: Option<HandlingArg>,

    /// Minimum province size in pixels (overwrites config)
    #[clap(short = 'm', long)]
    min_pixels: Option<u32>,

    /// Seed for color generation (overwrites config)
    #[clap(short, long)]
    seed: Option<u64>,

    /// Validate an existing province map instead of filling a guide
    #[clap(long, value_name = "PATH")]
    validate: Option<String>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HandlingArg {
    Mark,
    Unique,
    Majority,
}

/// Main function
fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    // Load configuration; a missing default file means built-in defaults
    let mut config = if PathBuf::from(&args.config).is_file() {
        Config::from_file(&args.config)?
    } else {
        warn!("Config file '{}' not found, using defaults", args.config);
        Config::default()
    };

    // Override config with command-line arguments
    if let Some(guide) = args.guide.clone() {
        config.guide_path = guide;
    }

    if let Some(existing) = args.existing.clone() {
        config.existing_provinces_path = Some(existing);
    }

    if let Some(output) = args.output.clone() {
        config.output_path = output;
    }

    if let Some(handling) = args.handling {
        config.undetermined_pixel_handling = match handling {
            HandlingArg::Mark => UndeterminedHandling::Mark,
            HandlingArg::Unique => UndeterminedHandling::UniqueNeighbor,
            HandlingArg::Majority => UndeterminedHandling::MajorityNeighbor,
        };
    }

    if let Some(min_pixels) = args.min_pixels {
        config.min_province_pixels = min_pixels;
    }

    if args.seed.is_some() {
        config.seed = args.seed;
    }

    // Validate configuration
    config.validate()?;

    let start_time = Instant::now();

    match args.validate.clone() {
        Some(map_path) => run_validation(&config, &map_path)?,
        None => run_fill(&config)?,
    }

    // Report elapsed time
    info!("Processing completed in {:.2} seconds", start_time.elapsed().as_secs_f64());

    Ok(())
}

fn run_fill(config: &Config) -> anyhow::Result<()> {
    let guide = load_image(&config.guide_path)
        .with_context(|| format!("Failed to load the province guide '{}'", config.guide_path))?;

    let existing = match &config.existing_provinces_path {
        Some(path) => Some(
            load_matching_image(path, guide.image.dimensions())
                .with_context(|| format!("Failed to load the existing province map '{}'", path))?,
        ),
        None => {
            info!("No existing map specified; pre-existing province colors will not be avoided");
            None
        }
    };

    let outcome = fill_provinces(&guide.image, existing.as_ref().map(|e| &e.image), config)?;

    if let Some(dir) = &config.diagnostics_dir {
        write_fill_diagnostics(&outcome.report, dir)?;
        info!("Diagnostics written to {}", dir);
    }

    if let Some(path) = &config.debug_output_path {
        save_image(&render_diagnostics(&outcome.output, &outcome.report), path)?;
        info!("Debug image saved to {}", path);
    }

    if let Some(err) = outcome.report.incomplete_error() {
        for failure in &outcome.report.failures {
            warn!("State {:?}: {}", failure.color, failure.error);
        }
        bail!(err);
    }

    save_image(&outcome.output, &config.output_path)?;
    info!("Filled province map saved to {}", config.output_path);

    Ok(())
}

fn run_validation(config: &Config, map_path: &str) -> anyhow::Result<()> {
    let map = load_image(map_path)
        .with_context(|| format!("Failed to load the province map '{}'", map_path))?;

    let settings = ValidationSettings {
        reserved: config.reserved_colors(),
        small_province_pixel_count: config.small_province_pixel_count,
        large_province_bounds: config.large_province_bounds,
    };
    let report = validate_map(&map.image, &settings);

    if let Some(dir) = &config.diagnostics_dir {
        let dir = PathBuf::from(dir);
        write_validation_csv(&report, dir.join("validation.csv"))?;
        write_json_report(&report, dir.join("validation.json"))?;
    }

    if !report.is_clean() {
        if let Some(path) = &config.debug_output_path {
            save_image(&render_validation(&map.image, &report), path)?;
            info!("Saving the debug image to {}", path);
        }
    }

    Ok(())
}
