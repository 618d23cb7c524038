use thiserror::Error;
use std::io;
use std::path::PathBuf;

use crate::image_utils::Rgb;

/// Custom error types for Provincial
#[derive(Error, Debug)]
pub enum ProvincialError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("Raster dimensions {actual:?} do not match the province guide {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// The exterior flood reached every non-border pixel of the crop while
    /// paintable pixels were present, so the outline is most likely not closed.
    #[error("The border of state {color:?} does not enclose any area; the outline is probably not closed")]
    EnclosureOpenBorder { color: Rgb },

    #[error("After {attempts} attempts, no unused color could be generated from base {base:?}")]
    ColorGenerationExhausted { base: Option<Rgb>, attempts: u32 },

    #[error("No border pixels of color {color:?} were found")]
    NoBorderPixelsFound { color: Rgb },

    #[error("A province was about to be filled with the reserved color {color:?}")]
    ReservedColorCollision { color: Rgb },

    #[error("{failed} of {total} states failed to fill; the output is not a reliable province map")]
    IncompleteFill { failed: usize, total: usize },
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, ProvincialError>;
