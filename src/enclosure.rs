//! Enclosure test: which pixels lie on or inside a state's border.
//!
//! The border mask is cropped to its bounding box and padded with one ring of
//! empty cells, so the padded corner is guaranteed to be outside. Flooding
//! the non-border cells from that corner finds the exterior; everything the
//! flood cannot reach without crossing the border is on or inside it.

use image::RgbImage;

use crate::color::ReservedColors;
use crate::errors::{ProvincialError, Result};
use crate::flood::{flood, Connectivity};
use crate::image_utils::{has_rgb_color, unique_colors, Rgb};
use crate::mask::{BoundingBox, Mask};

/// The area claimed by one state color, cropped to the border's bounds
#[derive(Debug, Clone)]
pub struct StateArea {
    pub color: Rgb,
    /// Bounds of the border pixels in the full raster
    pub bbox: BoundingBox,
    /// Pixels exactly equal to the state color
    pub border: Mask,
    /// Border plus enclosed interior, without ignore-colored pixels
    pub enclosure: Mask,
}

impl StateArea {
    /// Enclosed pixels that are not part of the border
    pub fn interior(&self) -> Mask {
        self.enclosure.and_not(&self.border)
    }
}

/// Every color on the guide that marks a state border
pub fn discover_state_colors(guide: &RgbImage, reserved: &ReservedColors) -> Vec<Rgb> {
    unique_colors(guide)
        .into_iter()
        .filter(|&c| c != reserved.ignore && c != reserved.paint_over)
        .collect()
}

/// Compute the border and enclosure masks of the state drawn in `color`
pub fn find_state_area(guide: &RgbImage, color: Rgb, reserved: &ReservedColors) -> Result<StateArea> {
    let border = Mask::from_color(guide, color);
    let bbox = border
        .bounds()
        .ok_or(ProvincialError::NoBorderPixelsFound { color })?;
    let border = border.crop(&bbox);

    let padded = border.pad(1, false);
    let exterior = flood(&padded, (0, 0), Connectivity::FourWay);
    let enclosed = exterior.invert().unpad(1);

    let not_ignored = Mask::from_fn(bbox.width(), bbox.height(), |x, y| {
        let (gx, gy) = bbox.to_global(x, y);
        !has_rgb_color(guide.get_pixel(gx, gy), reserved.ignore)
    });

    Ok(StateArea {
        color,
        bbox,
        border,
        enclosure: enclosed.and(&not_ignored),
    })
}

/// Flag states whose outline encloses nothing although there is paintable
/// space within its bounds. A closed outline around paint-over pixels always
/// yields interior pixels; a border island on background yields none and is
/// left to border resolution as a stray.
pub fn check_enclosure(guide: &RgbImage, area: &StateArea, reserved: &ReservedColors) -> Result<()> {
    if !area.interior().is_empty() {
        return Ok(());
    }

    let bbox = &area.bbox;
    let has_paintable_space = (0..bbox.height()).any(|y| {
        (0..bbox.width()).any(|x| {
            let (gx, gy) = bbox.to_global(x, y);
            !area.border.get(x, y) && has_rgb_color(guide.get_pixel(gx, gy), reserved.paint_over)
        })
    });

    if has_paintable_space {
        return Err(ProvincialError::EnclosureOpenBorder { color: area.color });
    }

    Ok(())
}
