//! Checks on a finished province map.
//!
//! None of the findings are errors; they are places an artist should look at
//! before handing the map to the game.

use std::collections::HashMap;

use image::RgbImage;
use log::{info, warn};
use serde::Serialize;

use crate::color::ReservedColors;
use crate::components::extract_components;
use crate::flood::Connectivity;
use crate::image_utils::{mark_points, Rgb};
use crate::mask::{BoundingBox, Mask};

pub const X_CROSSING_MARKER: Rgb = [255, 0, 0];
pub const SMALL_PROVINCE_MARKER: Rgb = [0, 255, 0];
pub const SPREAD_OUT_MARKER: Rgb = [0, 0, 255];
pub const UNDETERMINED_MARKER: Rgb = [0, 255, 255];

/// Thresholds used by [`validate_map`]
#[derive(Debug, Clone, Copy)]
pub struct ValidationSettings {
    pub reserved: ReservedColors,
    /// Provinces with this many pixels or fewer are reported
    pub small_province_pixel_count: u32,
    /// Colors whose bounds extend further than this are checked for continuity
    pub large_province_bounds: u32,
}

/// A color drawn in several disconnected places over a wide area
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpreadOutColor {
    pub color: Rgb,
    pub areas: usize,
    pub bbox: BoundingBox,
    pub origin: (u32, u32),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Top-left pixel of every 2x2 window where four provinces meet diagonally
    pub x_crossings: Vec<(u32, u32)>,
    /// First pixel of every province at or under the small threshold
    pub small_provinces: Vec<(u32, u32)>,
    pub spread_out_colors: Vec<SpreadOutColor>,
    /// One origin per 8-connected group of undetermined pixels
    pub undetermined: Vec<(u32, u32)>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.x_crossings.is_empty()
            && self.small_provinces.is_empty()
            && self.spread_out_colors.is_empty()
            && self.undetermined.is_empty()
    }
}

/// A 2x2 window is an X crossing when both diagonals join pixels that
/// differ from both of their shared orthogonal neighbors
fn is_x_crossing(map: &RgbImage, x: u32, y: u32) -> bool {
    let top_left = map.get_pixel(x, y);
    let top_right = map.get_pixel(x + 1, y);
    let bottom_left = map.get_pixel(x, y + 1);
    let bottom_right = map.get_pixel(x + 1, y + 1);

    top_left != top_right
        && top_left != bottom_left
        && bottom_right != top_right
        && bottom_right != bottom_left
}

pub fn find_x_crossings(map: &RgbImage) -> Vec<(u32, u32)> {
    let (width, height) = map.dimensions();
    let mut crossings = Vec::new();

    for y in 0..height.saturating_sub(1) {
        for x in 0..width.saturating_sub(1) {
            if is_x_crossing(map, x, y) {
                crossings.push((x, y));
            }
        }
    }

    crossings
}

/// Pixel positions of every province color, in raster order
fn pixels_by_color(map: &RgbImage, reserved: &ReservedColors) -> Vec<(Rgb, Vec<(u32, u32)>)> {
    let mut by_color: HashMap<Rgb, Vec<(u32, u32)>> = HashMap::new();
    for (x, y, pixel) in map.enumerate_pixels() {
        if !reserved.is_reserved(pixel.0) {
            by_color.entry(pixel.0).or_default().push((x, y));
        }
    }

    let mut colors: Vec<_> = by_color.into_iter().collect();
    colors.sort_by_key(|(color, _)| *color);
    colors
}

fn bounds_of(points: &[(u32, u32)]) -> Option<BoundingBox> {
    let (&(x0, y0), rest) = points.split_first()?;
    Some(rest.iter().fold(
        BoundingBox { x_min: x0, y_min: y0, x_max: x0, y_max: y0 },
        |b, &(x, y)| BoundingBox {
            x_min: b.x_min.min(x),
            y_min: b.y_min.min(y),
            x_max: b.x_max.max(x),
            y_max: b.y_max.max(y),
        },
    ))
}

/// Run every check over a province map
pub fn validate_map(map: &RgbImage, settings: &ValidationSettings) -> ValidationReport {
    let (width, height) = map.dimensions();
    let mut report = ValidationReport {
        x_crossings: find_x_crossings(map),
        ..ValidationReport::default()
    };

    for (color, pixels) in pixels_by_color(map, &settings.reserved) {
        let origin = pixels[0];

        if pixels.len() <= settings.small_province_pixel_count as usize {
            report.small_provinces.push(origin);
        }

        let Some(bbox) = bounds_of(&pixels) else { continue };
        let extent = settings.large_province_bounds;
        if bbox.x_max - bbox.x_min > extent || bbox.y_max - bbox.y_min > extent {
            let mut mask = Mask::new(width, height);
            for &(x, y) in &pixels {
                mask.set(x, y, true);
            }
            let areas = extract_components(&mask, 0, Connectivity::EightWay).accepted.len();
            if areas > 1 {
                report.spread_out_colors.push(SpreadOutColor {
                    color,
                    areas,
                    bbox,
                    origin,
                });
            }
        }
    }

    let undetermined = Mask::from_color(map, settings.reserved.undetermined);
    report.undetermined = extract_components(&undetermined, 0, Connectivity::EightWay).origins();

    log_findings(&report, settings);
    report
}

fn log_findings(report: &ValidationReport, settings: &ValidationSettings) {
    if !report.x_crossings.is_empty() {
        warn!(
            "{} 'X' crossings found; only three provinces should meet at a point (red dots)",
            report.x_crossings.len()
        );
    }
    if !report.spread_out_colors.is_empty() {
        warn!(
            "{} province colors span more than {} pixels in several separate areas and may be repeated colors (blue dots)",
            report.spread_out_colors.len(),
            settings.large_province_bounds
        );
        for spread in &report.spread_out_colors {
            info!(
                "Province {:?} has bounds of {}x{} and {} continuous areas",
                spread.color,
                spread.bbox.width(),
                spread.bbox.height(),
                spread.areas
            );
        }
    }
    if !report.small_provinces.is_empty() {
        warn!(
            "{} provinces have {} pixels or fewer (green dots)",
            report.small_provinces.len(),
            settings.small_province_pixel_count
        );
    }
    if !report.undetermined.is_empty() {
        warn!(
            "The undetermined color {:?} is still present in {} places (cyan dots)",
            settings.reserved.undetermined,
            report.undetermined.len()
        );
    }
    if report.is_clean() {
        info!("Map found to be completely valid");
    }
}

/// Copy of the map with a marker dot on every finding
pub fn render_validation(map: &RgbImage, report: &ValidationReport) -> RgbImage {
    let mut debug_image = map.clone();
    mark_points(&mut debug_image, &report.x_crossings, X_CROSSING_MARKER);
    let spread: Vec<_> = report.spread_out_colors.iter().map(|s| s.origin).collect();
    mark_points(&mut debug_image, &spread, SPREAD_OUT_MARKER);
    mark_points(&mut debug_image, &report.small_provinces, SMALL_PROVINCE_MARKER);
    mark_points(&mut debug_image, &report.undetermined, UNDETERMINED_MARKER);
    debug_image
}
