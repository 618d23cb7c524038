// src/lib.rs - Library interface for Provincial

pub mod borders;
pub mod color;
pub mod components;
pub mod config;
pub mod enclosure;
pub mod errors;
pub mod flood;
pub mod fragments;
pub mod image_io;
pub mod image_utils;
pub mod mask;
pub mod output;
pub mod pipeline;
pub mod validation;

// Re-export commonly used types and functions
pub use errors::{ProvincialError, Result};
pub use config::{Config, UndeterminedHandling};
pub use image_io::{InputImage, load_image, load_matching_image, save_image};
pub use image_utils::Rgb;
pub use mask::{BoundingBox, Mask};

// Re-export the filling engine
pub use pipeline::{
    fill_provinces,
    fill_region,
    render_diagnostics,
    FillContext,
    FillOutcome,
    FillReport,
    RegionFill,
};

pub use enclosure::{check_enclosure, discover_state_colors, find_state_area, StateArea};
pub use components::{extract_components, Component, ComponentSet};
pub use color::{ColorAllocator, PaletteVariation, ReservedColors, UsedColorSet};
pub use borders::{resolve_borders, NeighborTally};
pub use fragments::{paint_fragments, Fragment, FragmentHandler};
pub use flood::{flood, Connectivity};

// Re-export map validation
pub use validation::{render_validation, validate_map, ValidationReport, ValidationSettings};
