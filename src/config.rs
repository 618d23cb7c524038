use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::color::ReservedColors;
use crate::errors::{ProvincialError, Result};
use crate::image_utils::Rgb;

/// Configuration for Provincial
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Image defining the outlines of each state, drawn in the state's unique color
    #[serde(default = "default_guide_path")]
    pub guide_path: String,

    /// Optional existing province map whose colors must not be reused
    #[serde(default)]
    pub existing_provinces_path: Option<String>,

    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Copy of the output with diagnostic dots painted on it
    #[serde(default)]
    pub debug_output_path: Option<String>,

    /// Directory receiving fragment CSVs and the JSON run report
    #[serde(default)]
    pub diagnostics_dir: Option<String>,

    // Reserved colors
    #[serde(default = "default_ignore_color")]
    pub ignore_color: Rgb,

    #[serde(default = "default_paint_over_color")]
    pub paint_over_color: Rgb,

    #[serde(default = "default_undetermined_color")]
    pub undetermined_color: Rgb,

    /// Minimum number of 4-connected interior pixels for an area to become a province
    #[serde(default = "default_min_province_pixels")]
    pub min_province_pixels: u32,

    /// Pick a random palette base per state instead of the state's border color
    #[serde(default)]
    pub random_state_palette_colors: bool,

    // Palette variation, on a 0-1 scale
    #[serde(default = "default_hue_variation")]
    pub hue_variation: f64,

    #[serde(default = "default_sat_variation")]
    pub sat_variation: f64,

    #[serde(default = "default_val_variation")]
    pub val_variation: f64,

    #[serde(default)]
    pub undetermined_pixel_handling: UndeterminedHandling,

    #[serde(default = "default_color_generation_attempts")]
    pub color_generation_attempts: u32,

    /// Prefer colors reached directly from a province over larger inherited counts
    #[serde(default = "default_true")]
    pub prefer_native_colors: bool,

    #[serde(default = "default_true")]
    pub report_open_borders: bool,

    #[serde(default = "default_true")]
    pub use_parallel: bool,

    #[serde(default)]
    pub seed: Option<u64>,

    // Map validation
    #[serde(default = "default_small_province_pixel_count")]
    pub small_province_pixel_count: u32,

    #[serde(default = "default_large_province_bounds")]
    pub large_province_bounds: u32,
}

/// What to do with interior fragments smaller than `min_province_pixels`.
///
/// Configuration files may name the policy or give its number (0, 1 or 2).
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case", try_from = "HandlingSetting")]
pub enum UndeterminedHandling {
    /// Fill with the undetermined color and report the fragment
    Mark,
    /// Adopt the neighboring color if it is the only one touching the fragment
    UniqueNeighbor,
    /// Adopt the neighboring color with the strongest vote
    #[default]
    MajorityNeighbor,
}

impl UndeterminedHandling {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(UndeterminedHandling::Mark),
            1 => Some(UndeterminedHandling::UniqueNeighbor),
            2 => Some(UndeterminedHandling::MajorityNeighbor),
            _ => None,
        }
    }
}

impl FromStr for UndeterminedHandling {
    type Err = String;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        match name {
            "mark" => Ok(UndeterminedHandling::Mark),
            "unique_neighbor" => Ok(UndeterminedHandling::UniqueNeighbor),
            "majority_neighbor" => Ok(UndeterminedHandling::MajorityNeighbor),
            other => Err(format!(
                "unknown undetermined_pixel_handling '{}', expected mark, unique_neighbor or majority_neighbor",
                other
            )),
        }
    }
}

/// Raw form of `undetermined_pixel_handling` as written in a config file
#[derive(Deserialize)]
#[serde(untagged)]
enum HandlingSetting {
    Code(i64),
    Name(String),
}

impl TryFrom<HandlingSetting> for UndeterminedHandling {
    type Error = String;

    fn try_from(setting: HandlingSetting) -> std::result::Result<Self, Self::Error> {
        match setting {
            HandlingSetting::Code(code) => Self::from_code(code)
                .ok_or_else(|| format!("unknown undetermined_pixel_handling {}, expected 0, 1 or 2", code)),
            HandlingSetting::Name(name) => name.parse(),
        }
    }
}

fn default_guide_path() -> String {
    "Workspace/ProvinceOutlines.bmp".to_string()
}

fn default_output_path() -> String {
    "Workspace/FilledProvinces.bmp".to_string()
}

fn default_ignore_color() -> Rgb {
    [0, 0, 0]
}

fn default_paint_over_color() -> Rgb {
    [255, 255, 255]
}

fn default_undetermined_color() -> Rgb {
    [127, 127, 127]
}

fn default_min_province_pixels() -> u32 {
    4
}

fn default_hue_variation() -> f64 {
    0.05
}

fn default_sat_variation() -> f64 {
    0.5
}

fn default_val_variation() -> f64 {
    0.5
}

fn default_color_generation_attempts() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_small_province_pixel_count() -> u32 {
    8 // the game warns about provinces of 8 pixels or fewer
}

fn default_large_province_bounds() -> u32 {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            guide_path: default_guide_path(),
            existing_provinces_path: None,
            output_path: default_output_path(),
            debug_output_path: None,
            diagnostics_dir: None,
            ignore_color: default_ignore_color(),
            paint_over_color: default_paint_over_color(),
            undetermined_color: default_undetermined_color(),
            min_province_pixels: default_min_province_pixels(),
            random_state_palette_colors: false,
            hue_variation: default_hue_variation(),
            sat_variation: default_sat_variation(),
            val_variation: default_val_variation(),
            undetermined_pixel_handling: UndeterminedHandling::default(),
            color_generation_attempts: default_color_generation_attempts(),
            prefer_native_colors: true,
            report_open_borders: true,
            use_parallel: true,
            seed: None,
            small_province_pixel_count: default_small_province_pixel_count(),
            large_province_bounds: default_large_province_bounds(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ProvincialError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            ProvincialError::Config(format!("Failed to parse config file '{}': {}", path.display(), e))
        })?;

        Ok(config)
    }

    /// The three colors that can never become a province color
    pub fn reserved_colors(&self) -> ReservedColors {
        ReservedColors {
            ignore: self.ignore_color,
            paint_over: self.paint_over_color,
            undetermined: self.undetermined_color,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.color_generation_attempts == 0 {
            return Err(ProvincialError::Config(
                "color_generation_attempts must be > 0".to_string(),
            ));
        }

        for (name, value) in [
            ("hue_variation", self.hue_variation),
            ("sat_variation", self.sat_variation),
            ("val_variation", self.val_variation),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ProvincialError::Config(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }

        if self.ignore_color == self.paint_over_color
            || self.ignore_color == self.undetermined_color
            || self.paint_over_color == self.undetermined_color
        {
            return Err(ProvincialError::Config(
                "ignore_color, paint_over_color and undetermined_color must all differ".to_string(),
            ));
        }

        if self.guide_path.is_empty() || self.output_path.is_empty() {
            return Err(ProvincialError::Config(
                "guide_path and output_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ProvincialError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
