//! Boolean pixel masks over raster dimensions.
//!
//! A [`Mask`] marks a derived area of a raster: the pixels of one border
//! color, the enclosed interior of a state, a single province and so on.
//! Masks are plain values; cropping and padding always produce new masks.
//! Coordinates are `(x, y)` with `x` the column and `y` the row, matching
//! the `image` crate. "Raster order" means row by row, left to right.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::image_utils::{has_rgb_color, in_bounds, Rgb};

/// Inclusive pixel bounds of a set of pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl BoundingBox {
    #[inline]
    pub fn width(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    /// Translate a coordinate local to this box into the enclosing raster
    #[inline]
    pub fn to_global(&self, x: u32, y: u32) -> (u32, u32) {
        (x + self.x_min, y + self.y_min)
    }
}

/// A boolean grid with the same shape as the raster it was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    /// An all-false mask
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, false)
    }

    pub fn filled(width: u32, height: u32, value: bool) -> Self {
        Self {
            width,
            height,
            data: vec![value; (width as usize) * (height as usize)],
        }
    }

    pub fn from_fn<F: Fn(u32, u32) -> bool>(width: u32, height: u32, f: F) -> Self {
        let mut mask = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    /// Mask of every pixel exactly equal to `color`
    pub fn from_color(image: &RgbImage, color: Rgb) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.pixels().map(|p| has_rgb_color(p, color)).collect(),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y as usize) * (self.width as usize) + (x as usize)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[self.index(x, y)]
    }

    /// Like [`Mask::get`], but out-of-bounds coordinates read as false
    #[inline]
    pub fn get_or_false(&self, x: i32, y: i32) -> bool {
        in_bounds(x, y, self.width, self.height) && self.get(x as u32, y as u32)
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Number of true cells
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// True when no cell is set
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Coordinates of every true cell, in raster order
    pub fn iter_true(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width as usize;
        self.data
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v)
            .map(move |(i, _)| ((i % width) as u32, (i / width) as u32))
    }

    /// Bounds of the true cells, or `None` for an empty mask
    pub fn bounds(&self) -> Option<BoundingBox> {
        let mut bounds: Option<BoundingBox> = None;
        for (x, y) in self.iter_true() {
            bounds = Some(match bounds {
                None => BoundingBox { x_min: x, y_min: y, x_max: x, y_max: y },
                Some(b) => BoundingBox {
                    x_min: b.x_min.min(x),
                    y_min: b.y_min.min(y),
                    x_max: b.x_max.max(x),
                    y_max: b.y_max.max(y),
                },
            });
        }
        bounds
    }

    /// Copy out the cells inside `bbox`
    pub fn crop(&self, bbox: &BoundingBox) -> Mask {
        Mask::from_fn(bbox.width(), bbox.height(), |x, y| {
            self.get(x + bbox.x_min, y + bbox.y_min)
        })
    }

    /// Surround the mask with `border` cells of `value` on every side
    pub fn pad(&self, border: u32, value: bool) -> Mask {
        let mut padded = Mask::filled(self.width + 2 * border, self.height + 2 * border, value);
        for y in 0..self.height {
            for x in 0..self.width {
                padded.set(x + border, y + border, self.get(x, y));
            }
        }
        padded
    }

    /// Remove `border` cells from every side; inverse of [`Mask::pad`]
    pub fn unpad(&self, border: u32) -> Mask {
        Mask::from_fn(
            self.width.saturating_sub(2 * border),
            self.height.saturating_sub(2 * border),
            |x, y| self.get(x + border, y + border),
        )
    }

    pub fn invert(&self) -> Mask {
        Mask {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| !v).collect(),
        }
    }

    pub fn and(&self, other: &Mask) -> Mask {
        self.zip_with(other, |a, b| a && b)
    }

    pub fn and_not(&self, other: &Mask) -> Mask {
        self.zip_with(other, |a, b| a && !b)
    }

    fn zip_with<F: Fn(bool, bool) -> bool>(&self, other: &Mask, f: F) -> Mask {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        Mask {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }
}
