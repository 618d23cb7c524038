//! Border resolution by wavefront voting.
//!
//! Border pixels belong to no province. Each pass recolors every unresolved
//! border pixel that touches an already-filled pixel orthogonally, using a
//! weighted vote over its eight neighbors. Votes only read pixels that were
//! filled before the pass started, so the result does not depend on the
//! order pixels are visited within a pass.

use image::RgbImage;
use log::trace;

use crate::color::ReservedColors;
use crate::components::extract_components;
use crate::enclosure::StateArea;
use crate::errors::{ProvincialError, Result};
use crate::flood::{has_cardinal_neighbor_in, Connectivity, MOORE_NEIGHBORHOOD};
use crate::image_utils::Rgb;
use crate::mask::Mask;

/// Vote weight of an orthogonal neighbor
pub const CARDINAL_WEIGHT: u32 = 2;
/// Vote weight of a diagonal neighbor
pub const DIAGONAL_WEIGHT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Vote {
    color: Rgb,
    weight: u32,
    native: bool,
}

/// Weighted color votes, kept in the order colors were first seen
#[derive(Debug, Clone, Default)]
pub struct NeighborTally {
    votes: Vec<Vote>,
}

impl NeighborTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `weight` for `color`. A color becomes native as soon as one of
    /// its votes is native.
    pub fn add(&mut self, color: Rgb, weight: u32, native: bool) {
        match self.votes.iter_mut().find(|v| v.color == color) {
            Some(vote) => {
                vote.weight += weight;
                vote.native |= native;
            }
            None => self.votes.push(Vote {
                color,
                weight,
                native,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn weight_of(&self, color: Rgb) -> u32 {
        self.votes
            .iter()
            .find(|v| v.color == color)
            .map_or(0, |v| v.weight)
    }

    /// The winning color.
    ///
    /// With `prefer_native`, any native color beats any inherited one and
    /// weight decides within each group. Otherwise weight alone decides.
    /// Ties go to the color seen first.
    pub fn winner(&self, prefer_native: bool) -> Option<Rgb> {
        let mut best: Option<&Vote> = None;
        for vote in &self.votes {
            let better = match best {
                None => true,
                Some(current) if prefer_native => {
                    (vote.native, vote.weight) > (current.native, current.weight)
                }
                Some(current) => vote.weight > current.weight,
            };
            if better {
                best = Some(vote);
            }
        }
        best.map(|v| v.color)
    }
}

/// Tally the 8 neighbors of a border pixel at (x, y).
///
/// Only neighbors inside the enclosure that are not unresolved border pixels
/// vote. A vote is native when it comes orthogonally from a pixel that was
/// never a border pixel.
fn tally_border_neighbors(
    view: &RgbImage,
    enclosure: &Mask,
    border: &Mask,
    unresolved: &Mask,
    x: u32,
    y: u32,
) -> NeighborTally {
    let mut tally = NeighborTally::new();

    for (direction, &(dx, dy)) in MOORE_NEIGHBORHOOD.iter().enumerate() {
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if !enclosure.get_or_false(nx, ny) || unresolved.get_or_false(nx, ny) {
            continue;
        }

        let (nx, ny) = (nx as u32, ny as u32);
        let is_cardinal = direction % 2 == 0;
        let weight = if is_cardinal { CARDINAL_WEIGHT } else { DIAGONAL_WEIGHT };
        let native = is_cardinal && !border.get(nx, ny);

        tally.add(view.get_pixel(nx, ny).0, weight, native);
    }

    tally
}

/// Repaint every border pixel of `area` inside `view` with a neighboring
/// province color.
///
/// `view` is the state's cropped buffer, with every interior pixel already
/// painted. Border pixels that can never be reached from the interior are
/// painted `undetermined`; the origins of their 8-connected groups are
/// returned in crop coordinates.
pub fn resolve_borders(
    view: &mut RgbImage,
    area: &StateArea,
    reserved: &ReservedColors,
    prefer_native: bool,
) -> Result<Vec<(u32, u32)>> {
    let border = &area.border;
    let enclosure = &area.enclosure;

    if border.is_empty() {
        return Err(ProvincialError::NoBorderPixelsFound { color: area.color });
    }

    let mut unresolved = border.clone();
    let mut filled = area.interior();
    let mut pending: Vec<(u32, u32)> = border.iter_true().collect();
    let mut pass = 0;

    loop {
        pass += 1;
        let mut painted = Vec::new();
        let mut leftover = Vec::new();

        for &(x, y) in &pending {
            let winner = if has_cardinal_neighbor_in(&filled, x, y) {
                tally_border_neighbors(view, enclosure, border, &unresolved, x, y).winner(prefer_native)
            } else {
                None
            };

            match winner {
                Some(color) => painted.push((x, y, color)),
                None => leftover.push((x, y)),
            }
        }

        trace!(
            "State {:?}: border pass {} resolved {} of {} pixels",
            area.color,
            pass,
            painted.len(),
            pending.len()
        );

        if painted.is_empty() {
            return Ok(mark_strays(view, &leftover, reserved));
        }

        for (x, y, color) in painted {
            view.put_pixel(x, y, image::Rgb(color));
            unresolved.set(x, y, false);
            filled.set(x, y, true);
        }

        if leftover.is_empty() {
            return Ok(Vec::new());
        }
        pending = leftover;
    }
}

/// Paint leftover border pixels `undetermined` and return one origin per
/// 8-connected group of them
fn mark_strays(view: &mut RgbImage, leftover: &[(u32, u32)], reserved: &ReservedColors) -> Vec<(u32, u32)> {
    let mut stray_mask = Mask::new(view.width(), view.height());
    for &(x, y) in leftover {
        stray_mask.set(x, y, true);
        view.put_pixel(x, y, image::Rgb(reserved.undetermined));
    }

    extract_components(&stray_mask, 0, Connectivity::EightWay).origins()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enclosure::find_state_area;
    use crate::image_utils::{filled_image, has_rgb_color};

    const STATE: Rgb = [200, 30, 30];
    const LEFT: Rgb = [10, 100, 10];
    const RIGHT: Rgb = [10, 10, 100];

    #[test]
    fn native_colors_beat_larger_inherited_counts() {
        let mut tally = NeighborTally::new();
        tally.add(LEFT, DIAGONAL_WEIGHT, false);
        tally.add(LEFT, CARDINAL_WEIGHT, false);
        tally.add(RIGHT, CARDINAL_WEIGHT, true);

        assert_eq!(tally.weight_of(LEFT), 3);
        assert_eq!(tally.winner(true), Some(RIGHT));
        assert_eq!(tally.winner(false), Some(LEFT));
    }

    #[test]
    fn ties_go_to_the_first_color_seen() {
        let mut tally = NeighborTally::new();
        tally.add(LEFT, CARDINAL_WEIGHT, true);
        tally.add(RIGHT, CARDINAL_WEIGHT, true);

        assert_eq!(tally.winner(true), Some(LEFT));
        assert_eq!(NeighborTally::new().winner(true), None);
    }

    /// A 9x5 rectangle outlined in `STATE`, split by a vertical border line
    /// at x = 4 into two interior halves painted `LEFT` and `RIGHT`.
    fn split_state() -> (RgbImage, StateArea) {
        let mut guide = filled_image(9, 5, [255, 255, 255]);
        for y in 0..5 {
            for x in 0..9 {
                if x == 0 || x == 8 || x == 4 || y == 0 || y == 4 {
                    guide.put_pixel(x, y, image::Rgb(STATE));
                }
            }
        }
        let area = find_state_area(&guide, STATE, &ReservedColors::default()).unwrap();

        let mut view = guide.clone();
        for (x, y) in area.interior().iter_true() {
            let color = if x < 4 { LEFT } else { RIGHT };
            view.put_pixel(x, y, image::Rgb(color));
        }
        (view, area)
    }

    #[test]
    fn every_border_pixel_takes_a_province_color() {
        let (mut view, area) = split_state();
        let strays = resolve_borders(&mut view, &area, &ReservedColors::default(), true).unwrap();

        assert!(strays.is_empty());
        for (x, y) in area.enclosure.iter_true() {
            let pixel = view.get_pixel(x, y);
            assert!(
                has_rgb_color(pixel, LEFT) || has_rgb_color(pixel, RIGHT),
                "({}, {}) is still {:?}",
                x,
                y,
                pixel.0
            );
        }
        // The outer edges follow the half they bound.
        assert!(has_rgb_color(view.get_pixel(0, 2), LEFT));
        assert!(has_rgb_color(view.get_pixel(8, 2), RIGHT));
        // The splitting line ties and goes to the first neighbor scanned (right).
        assert!(has_rgb_color(view.get_pixel(4, 2), RIGHT));
    }

    #[test]
    fn corners_are_resolved_in_a_later_pass() {
        let (mut view, area) = split_state();
        resolve_borders(&mut view, &area, &ReservedColors::default(), true).unwrap();

        // (0, 0) has no orthogonal interior neighbor; it waits for (1, 0) or (0, 1).
        assert!(has_rgb_color(view.get_pixel(0, 0), LEFT));
        assert!(has_rgb_color(view.get_pixel(8, 4), RIGHT));
    }

    #[test]
    fn border_without_interior_becomes_stray() {
        // A hollow ring whose inside is background: nothing to vote from.
        let mut guide = filled_image(7, 7, [0, 0, 0]);
        for y in 1..6 {
            for x in 1..6 {
                if x == 1 || x == 5 || y == 1 || y == 5 {
                    guide.put_pixel(x, y, image::Rgb(STATE));
                }
            }
        }
        let reserved = ReservedColors::default();
        let area = find_state_area(&guide, STATE, &reserved).unwrap();
        let mut view = image::imageops::crop_imm(&guide, 1, 1, 5, 5).to_image();

        let strays = resolve_borders(&mut view, &area, &reserved, true).unwrap();

        assert_eq!(strays, vec![(0, 0)]);
        for (x, y) in area.border.iter_true() {
            assert!(has_rgb_color(view.get_pixel(x, y), reserved.undetermined));
        }
    }
}
