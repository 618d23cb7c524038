//! Province color generation.
//!
//! Every province color is unique across the whole output and across any
//! pre-existing province map, and is never one of the reserved colors.
//! [`UsedColorSet`] is the single piece of state shared between regions;
//! it is only locked to commit or release a color, never while generating.

use std::cell::RefCell;
use std::collections::HashSet;

use image::RgbImage;
use log::trace;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::{ProvincialError, Result};
use crate::image_utils::Rgb;

/// Sentinel colors with a special meaning on the guide and output rasters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedColors {
    /// No action required; left as-is (background)
    pub ignore: Rgb,
    /// Must receive a province color
    pub paint_over: Rgb,
    /// Ownership could not be resolved automatically
    pub undetermined: Rgb,
}

impl Default for ReservedColors {
    fn default() -> Self {
        Self {
            ignore: [0, 0, 0],
            paint_over: [255, 255, 255],
            undetermined: [127, 127, 127],
        }
    }
}

impl ReservedColors {
    #[inline]
    pub fn is_reserved(&self, color: Rgb) -> bool {
        color == self.ignore || color == self.paint_over || color == self.undetermined
    }
}

/// Process-wide set of colors already given to a province
#[derive(Debug, Default)]
pub struct UsedColorSet {
    colors: Mutex<HashSet<Rgb>>,
}

impl UsedColorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the set with every non-reserved color of an existing province map
    pub fn from_image(image: &RgbImage, reserved: &ReservedColors) -> Self {
        let colors = image
            .pixels()
            .map(|p| p.0)
            .filter(|&c| !reserved.is_reserved(c))
            .collect();
        Self {
            colors: Mutex::new(colors),
        }
    }

    pub fn contains(&self, color: Rgb) -> bool {
        self.colors.lock().contains(&color)
    }

    /// Atomically mark `color` as used. Returns false if it already was.
    pub fn try_claim(&self, color: Rgb) -> bool {
        self.colors.lock().insert(color)
    }

    /// Give a color back, e.g. a temporary fragment color that got replaced
    pub fn release(&self, color: Rgb) {
        self.colors.lock().remove(&color);
    }

    pub fn len(&self) -> usize {
        self.colors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.lock().is_empty()
    }
}

/// A color in hue/saturation/value space, every component in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

pub fn rgb_to_hsv(rgb: Rgb) -> Hsv {
    let r = rgb[0] as f64 / 255.0;
    let g = rgb[1] as f64 / 255.0;
    let b = rgb[2] as f64 / 255.0;

    let max_c = r.max(g).max(b);
    let min_c = r.min(g).min(b);
    let v = max_c;
    if max_c == min_c {
        return Hsv { h: 0.0, s: 0.0, v };
    }

    let delta = max_c - min_c;
    let s = delta / max_c;
    let rc = (max_c - r) / delta;
    let gc = (max_c - g) / delta;
    let bc = (max_c - b) / delta;

    let h = if r == max_c {
        bc - gc
    } else if g == max_c {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };

    Hsv {
        h: (h / 6.0).rem_euclid(1.0),
        s,
        v,
    }
}

pub fn hsv_to_rgb(hsv: Hsv) -> Rgb {
    let Hsv { h, s, v } = hsv;
    let (r, g, b) = if s == 0.0 {
        (v, v, v)
    } else {
        let sector = (h * 6.0).floor();
        let f = h * 6.0 - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        match (sector as i64).rem_euclid(6) {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        }
    };

    [to_channel(r), to_channel(g), to_channel(b)]
}

#[inline]
fn to_channel(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Maximum jitter applied around a palette base
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaletteVariation {
    pub hue: f64,
    pub sat: f64,
    pub val: f64,
}

impl Default for PaletteVariation {
    fn default() -> Self {
        Self {
            hue: 0.05,
            sat: 0.5,
            val: 0.5,
        }
    }
}

/// Per-region random generator derived from the run seed and the state color,
/// so a region's colors do not depend on scheduling order.
pub fn region_rng(seed: u64, state_color: Rgb) -> ChaCha8Rng {
    let key = ((state_color[0] as u64) << 16) | ((state_color[1] as u64) << 8) | state_color[2] as u64;
    ChaCha8Rng::seed_from_u64(seed ^ key.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Produces fresh, unused, non-reserved colors.
///
/// One allocator serves one region and remembers what it claimed, so a
/// region that fails can hand all of its colors back.
pub struct ColorAllocator<'a> {
    reserved: ReservedColors,
    used: &'a UsedColorSet,
    variation: PaletteVariation,
    attempts: u32,
    claimed: RefCell<Vec<Rgb>>,
}

impl<'a> ColorAllocator<'a> {
    pub fn new(
        reserved: ReservedColors,
        used: &'a UsedColorSet,
        variation: PaletteVariation,
        attempts: u32,
    ) -> Self {
        Self {
            reserved,
            used,
            variation,
            attempts,
            claimed: RefCell::new(Vec::new()),
        }
    }

    pub fn from_config(config: &Config, used: &'a UsedColorSet) -> Self {
        Self::new(
            config.reserved_colors(),
            used,
            PaletteVariation {
                hue: config.hue_variation,
                sat: config.sat_variation,
                val: config.val_variation,
            },
            config.color_generation_attempts,
        )
    }

    /// Give one claimed color back to the used set
    pub fn release(&self, color: Rgb) {
        self.claimed.borrow_mut().retain(|&c| c != color);
        self.used.release(color);
    }

    /// Give back every color still held; returns how many there were
    pub fn release_all(&self) -> usize {
        let mut claimed = self.claimed.borrow_mut();
        for &color in claimed.iter() {
            self.used.release(color);
        }
        let count = claimed.len();
        claimed.clear();
        count
    }

    /// Three independent uniform channel samples
    pub fn random_color<R: Rng>(rng: &mut R) -> Rgb {
        [rng.gen(), rng.gen(), rng.gen()]
    }

    /// A jittered variant of `base`.
    ///
    /// Hue moves up by at most `variation.hue` and wraps around. Saturation
    /// and value move up or down inside windows scaled by the base's own
    /// saturation, so grey bases stay grey. The base saturation and value are
    /// first clamped so the window never leaves [0, 1].
    pub fn palette_variant<R: Rng>(&self, rng: &mut R, base: Rgb) -> Rgb {
        let hsv = rgb_to_hsv(base);

        let sat_window = self.variation.sat * hsv.s;
        let val_window = self.variation.val * (hsv.s * 0.5 + 0.5);

        let clamped_sat = hsv.s.min(1.0 - sat_window * 0.5).max(sat_window * 0.5);
        let clamped_val = hsv.v.min(1.0 - val_window * 0.5).max(val_window * 0.5);

        let h = (hsv.h + rng.gen::<f64>() * self.variation.hue).rem_euclid(1.0);
        let s = clamped_sat + rng.gen::<f64>() * sat_window - sat_window * 0.5;
        let v = clamped_val + rng.gen::<f64>() * val_window - val_window * 0.5;

        hsv_to_rgb(Hsv {
            h,
            s: s.clamp(0.0, 1.0),
            v: v.clamp(0.0, 1.0),
        })
    }

    fn candidate<R: Rng>(&self, rng: &mut R, base: Option<Rgb>) -> Rgb {
        match base {
            Some(base) => self.palette_variant(rng, base),
            None => Self::random_color(rng),
        }
    }

    #[inline]
    fn is_acceptable(&self, color: Rgb, disallowed: &[Rgb]) -> bool {
        !self.reserved.is_reserved(color) && !disallowed.contains(&color)
    }

    /// Generate a color and commit it to the used set.
    ///
    /// Each rejected candidate (reserved, disallowed or already used) costs
    /// one attempt; running out of attempts is an error for the caller's region.
    pub fn allocate<R: Rng>(&self, rng: &mut R, base: Option<Rgb>, disallowed: &[Rgb]) -> Result<Rgb> {
        for attempt in 0..self.attempts {
            let color = self.candidate(rng, base);
            if !self.is_acceptable(color, disallowed) {
                trace!("Candidate {:?} rejected on attempt {}", color, attempt);
                continue;
            }
            if self.used.try_claim(color) {
                self.claimed.borrow_mut().push(color);
                return Ok(color);
            }
        }

        Err(ProvincialError::ColorGenerationExhausted {
            base,
            attempts: self.attempts,
        })
    }

    /// Pick a random palette base for a state. The base itself is not
    /// committed; only colors derived from it are.
    pub fn pick_palette_base<R: Rng>(&self, rng: &mut R) -> Result<Rgb> {
        for _ in 0..self.attempts {
            let color = Self::random_color(rng);
            if self.is_acceptable(color, &[]) && !self.used.contains(color) {
                return Ok(color);
            }
        }

        Err(ProvincialError::ColorGenerationExhausted {
            base: None,
            attempts: self.attempts,
        })
    }
}
