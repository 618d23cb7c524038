// src/pipeline.rs - Filling every state of a province guide

use std::cmp::Reverse;

use image::imageops::crop_imm;
use image::RgbImage;
use log::{debug, error, info};
use rayon::prelude::*;
use serde::Serialize;

use crate::borders::resolve_borders;
use crate::color::{region_rng, ColorAllocator, ReservedColors, UsedColorSet};
use crate::components::extract_components;
use crate::config::{Config, UndeterminedHandling};
use crate::enclosure::{check_enclosure, discover_state_colors, find_state_area};
use crate::errors::{ProvincialError, Result};
use crate::flood::Connectivity;
use crate::fragments::{paint_fragments, FragmentHandler};
use crate::image_utils::{create_debug_image, filled_image, mark_points, Rgb};
use crate::mask::{BoundingBox, Mask};

/// Center color of the marker for an undetermined fragment
pub const UNDETERMINED_MARKER: Rgb = [255, 127, 0];
/// Center color of the marker for a stray border island
pub const STRAY_BORDER_MARKER: Rgb = [0, 0, 255];

/// State shared by every region of one run
pub struct FillContext<'a> {
    pub config: &'a Config,
    pub reserved: ReservedColors,
    pub used: UsedColorSet,
    pub seed: u64,
}

impl<'a> FillContext<'a> {
    /// Build the context, seeding the used colors from an existing province
    /// map when one is given
    pub fn new(config: &'a Config, existing: Option<&RgbImage>) -> Self {
        let reserved = config.reserved_colors();
        let used = match existing {
            Some(image) => UsedColorSet::from_image(image, &reserved),
            None => UsedColorSet::new(),
        };

        Self {
            config,
            reserved,
            used,
            seed: config.seed.unwrap_or_else(rand::random),
        }
    }

    pub fn allocator(&self) -> ColorAllocator<'_> {
        ColorAllocator::from_config(self.config, &self.used)
    }
}

/// One successfully filled state, still in its own cropped buffer
#[derive(Debug, Clone)]
pub struct RegionFill {
    pub color: Rgb,
    pub bbox: BoundingBox,
    /// Pixels of the crop that belong to this state in the output
    pub enclosure: Mask,
    pub view: RgbImage,
    pub provinces: usize,
    /// Global coordinates
    pub undetermined_fragments: Vec<(u32, u32)>,
    /// Global coordinates
    pub stray_border_fragments: Vec<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionSummary {
    pub color: Rgb,
    pub bbox: BoundingBox,
    pub provinces: usize,
    pub undetermined_fragments: usize,
    pub stray_border_fragments: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionFailure {
    pub color: Rgb,
    pub error: String,
}

/// What happened during a run, independent of whether the output is saved
#[derive(Debug, Clone, Default, Serialize)]
pub struct FillReport {
    pub seed: u64,
    pub regions_total: usize,
    pub regions: Vec<RegionSummary>,
    pub failures: Vec<RegionFailure>,
    pub undetermined_fragments: Vec<(u32, u32)>,
    pub stray_border_fragments: Vec<(u32, u32)>,
}

impl FillReport {
    /// True when every state filled; only then is the output a usable map
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn regions_filled(&self) -> usize {
        self.regions.len()
    }

    pub fn province_count(&self) -> usize {
        self.regions.iter().map(|r| r.provinces).sum()
    }

    /// Error to hand back when the output must not be persisted
    pub fn incomplete_error(&self) -> Option<ProvincialError> {
        if self.is_complete() {
            None
        } else {
            Some(ProvincialError::IncompleteFill {
                failed: self.failures.len(),
                total: self.regions_total,
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub output: RgbImage,
    pub report: FillReport,
}

/// Last check before a generated color goes onto the map
fn checked_province_color(color: Rgb, reserved: &ReservedColors) -> Result<Rgb> {
    if reserved.is_reserved(color) {
        return Err(ProvincialError::ReservedColorCollision { color });
    }
    Ok(color)
}

#[inline]
fn to_global(bbox: &BoundingBox, points: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    points.into_iter().map(|(x, y)| bbox.to_global(x, y)).collect()
}

/// Fill a single state: enclosure, provinces, fragments, borders.
///
/// A state that fails gives back every color it claimed, so the remaining
/// states can still use them.
pub fn fill_region(guide: &RgbImage, color: Rgb, ctx: &FillContext<'_>) -> Result<RegionFill> {
    let allocator = ctx.allocator();
    let result = paint_region(guide, color, ctx, &allocator);
    if result.is_err() {
        let released = allocator.release_all();
        if released > 0 {
            debug!("State {:?}: released {} claimed colors after failure", color, released);
        }
    }
    result
}

fn paint_region(
    guide: &RgbImage,
    color: Rgb,
    ctx: &FillContext<'_>,
    allocator: &ColorAllocator<'_>,
) -> Result<RegionFill> {
    let config = ctx.config;
    let reserved = &ctx.reserved;

    // Step 1: Find what the border encloses
    let area = find_state_area(guide, color, reserved)?;
    if config.report_open_borders {
        check_enclosure(guide, &area, reserved)?;
    }
    let bbox = area.bbox;

    // Step 2: Split the interior into provinces
    let components = extract_components(&area.interior(), config.min_province_pixels, Connectivity::FourWay);

    let mut view = crop_imm(guide, bbox.x_min, bbox.y_min, bbox.width(), bbox.height()).to_image();
    let mut rng = region_rng(ctx.seed, color);

    let palette_base = if config.random_state_palette_colors {
        allocator.pick_palette_base(&mut rng)?
    } else {
        color
    };

    // Step 3: One unique color per province, never the state's own marker
    for province in &components.accepted {
        let province_color = allocator.allocate(&mut rng, Some(palette_base), &[color])?;
        let province_color = checked_province_color(province_color, reserved)?;
        for &(x, y) in &province.pixels {
            view.put_pixel(x, y, image::Rgb(province_color));
        }
    }

    // Step 4: Stand-in colors for undersized fragments, so borders resolve around them
    let fragments = match &components.undetermined {
        Some(mask) => paint_fragments(&mut view, mask, allocator, &mut rng, Some(palette_base), &[color])?,
        None => Vec::new(),
    };

    // Step 5: Resolve the border pixels
    let strays = resolve_borders(&mut view, &area, reserved, config.prefer_native_colors)?;

    // Step 6: Decide the fragments' fate
    let handler = FragmentHandler {
        policy: config.undetermined_pixel_handling,
        reserved: *reserved,
        prefer_native: config.prefer_native_colors,
        allocator,
    };
    let undetermined = handler.settle(&mut view, &area, &fragments);

    debug!(
        "State {:?}: bbox {:?}, {} provinces, {} fragments ({} undetermined), {} stray border fragments",
        color,
        bbox,
        components.accepted.len(),
        fragments.len(),
        undetermined.len(),
        strays.len()
    );

    Ok(RegionFill {
        color,
        bbox,
        enclosure: area.enclosure,
        view,
        provinces: components.accepted.len(),
        undetermined_fragments: to_global(&bbox, undetermined),
        stray_border_fragments: to_global(&bbox, strays),
    })
}

/// Fill every state drawn on `guide`.
///
/// Failures are caught per state and listed in the report; the other states
/// are still filled. Pixels outside every state keep the ignore color.
pub fn fill_provinces(guide: &RgbImage, existing: Option<&RgbImage>, config: &Config) -> Result<FillOutcome> {
    if let Some(existing) = existing {
        if existing.dimensions() != guide.dimensions() {
            return Err(ProvincialError::DimensionMismatch {
                expected: guide.dimensions(),
                actual: existing.dimensions(),
            });
        }
    }

    let ctx = FillContext::new(config, existing);
    if existing.is_some() {
        info!("Discovered {} existing province colors", ctx.used.len());
    }

    let state_colors = discover_state_colors(guide, &ctx.reserved);
    info!("Discovered {} state colors; filling with seed {}", state_colors.len(), ctx.seed);
    log_fragment_policy(config);

    let fill = |&color: &Rgb| (color, fill_region(guide, color, &ctx));
    let results: Vec<(Rgb, Result<RegionFill>)> = if config.use_parallel {
        state_colors.par_iter().map(fill).collect()
    } else {
        state_colors.iter().map(fill).collect()
    };

    let mut report = FillReport {
        seed: ctx.seed,
        regions_total: state_colors.len(),
        ..FillReport::default()
    };
    let mut filled = Vec::new();

    for (color, result) in results {
        match result {
            Ok(region) => filled.push(region),
            Err(e) => {
                error!("Failure while filling the state of color {:?}: {}", color, e);
                report.failures.push(RegionFailure {
                    color,
                    error: e.to_string(),
                });
            }
        }
    }

    // Larger states first, so states drawn inside another keep their own fill
    filled.sort_by_cached_key(|region| (Reverse(region.enclosure.count()), region.color));

    let (width, height) = guide.dimensions();
    let mut output = filled_image(width, height, ctx.reserved.ignore);
    for region in filled {
        for (x, y) in region.enclosure.iter_true() {
            let (gx, gy) = region.bbox.to_global(x, y);
            output.put_pixel(gx, gy, *region.view.get_pixel(x, y));
        }

        report.regions.push(RegionSummary {
            color: region.color,
            bbox: region.bbox,
            provinces: region.provinces,
            undetermined_fragments: region.undetermined_fragments.len(),
            stray_border_fragments: region.stray_border_fragments.len(),
        });
        report.undetermined_fragments.extend(region.undetermined_fragments);
        report.stray_border_fragments.extend(region.stray_border_fragments);
    }

    log_summary(&report, config);

    Ok(FillOutcome { output, report })
}

fn log_fragment_policy(config: &Config) {
    let fragments = format!(
        "Small province fragments (less than {} non-border pixels)",
        config.min_province_pixels
    );
    match config.undetermined_pixel_handling {
        UndeterminedHandling::Mark => info!(
            "{} will be colored {:?} and marked on the debug output",
            fragments, config.undetermined_color
        ),
        UndeterminedHandling::UniqueNeighbor => info!(
            "{} will join a neighboring province if it is the only province touching them",
            fragments
        ),
        UndeterminedHandling::MajorityNeighbor => info!(
            "{} will join the neighboring province they border the most",
            fragments
        ),
    }
}

fn log_summary(report: &FillReport, config: &Config) {
    if report.is_complete() {
        info!(
            "All {} states filled successfully with {} provinces",
            report.regions_total,
            report.province_count()
        );
    } else {
        error!(
            "Not all states filled successfully; the result is not a reliable province map. States filled: {} / {}",
            report.regions_filled(),
            report.regions_total
        );
    }

    if !report.undetermined_fragments.is_empty() {
        info!(
            "Undetermined fragments found: {} (areas below min_province_pixels = {} with no clear owner; orange dots on the debug image)",
            report.undetermined_fragments.len(),
            config.min_province_pixels
        );
    }
    if !report.stray_border_fragments.is_empty() {
        info!(
            "Stray border fragments found: {} (border pixels with no enclosed area, likely tiny islands; blue dots on the debug image)",
            report.stray_border_fragments.len()
        );
    }
}

/// Copy of the output with a marker dot on every fragment of the report
pub fn render_diagnostics(output: &RgbImage, report: &FillReport) -> RgbImage {
    let mut debug_image = create_debug_image(output, &report.undetermined_fragments, UNDETERMINED_MARKER);
    mark_points(&mut debug_image, &report.stray_border_fragments, STRAY_BORDER_MARKER);
    debug_image
}
