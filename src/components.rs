//! Connected-component extraction over a mask.
//!
//! Components are discovered in raster order, so their origins (the first
//! pixel of each component) come out in a stable order run after run.

use crate::flood::{walk_connected, Connectivity};
use crate::mask::Mask;

/// One connected group of true cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// First pixel discovered; used as the component's stable identity
    pub origin: (u32, u32),
    pub pixels: Vec<(u32, u32)>,
}

impl Component {
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn to_mask(&self, width: u32, height: u32) -> Mask {
        let mut mask = Mask::new(width, height);
        for &(x, y) in &self.pixels {
            mask.set(x, y, true);
        }
        mask
    }
}

/// Result of splitting a mask into components
#[derive(Debug, Clone)]
pub struct ComponentSet {
    /// Components with at least the minimum pixel count, in discovery order
    pub accepted: Vec<Component>,
    /// Union of every component below the minimum; `None` when there were none
    pub undetermined: Option<Mask>,
}

impl ComponentSet {
    pub fn origins(&self) -> Vec<(u32, u32)> {
        self.accepted.iter().map(|c| c.origin).collect()
    }
}

/// Split `mask` into connected components.
///
/// Components with fewer than `min_pixels` cells are merged into the
/// undetermined mask instead of being accepted. A threshold of 0 accepts
/// everything.
pub fn extract_components(mask: &Mask, min_pixels: u32, connectivity: Connectivity) -> ComponentSet {
    let (width, height) = mask.dimensions();
    let mut visited = Mask::new(width, height);
    let mut accepted = Vec::new();
    let mut undetermined: Option<Mask> = None;

    for (x, y) in mask.iter_true() {
        if visited.get(x, y) {
            continue;
        }

        let pixels = collect_component(mask, &mut visited, (x, y), connectivity);

        if pixels.len() < min_pixels as usize {
            let merged = undetermined.get_or_insert_with(|| Mask::new(width, height));
            for &(px, py) in &pixels {
                merged.set(px, py, true);
            }
        } else {
            accepted.push(Component {
                origin: (x, y),
                pixels,
            });
        }
    }

    ComponentSet {
        accepted,
        undetermined,
    }
}

/// Flood the true cells connected to `seed`, marking them in `visited`
fn collect_component(
    mask: &Mask,
    visited: &mut Mask,
    seed: (u32, u32),
    connectivity: Connectivity,
) -> Vec<(u32, u32)> {
    let mut pixels = vec![seed];
    visited.set(seed.0, seed.1, true);

    walk_connected(mask.dimensions(), seed, connectivity, |x, y| {
        if !mask.get(x, y) || visited.get(x, y) {
            return false;
        }
        visited.set(x, y, true);
        pixels.push((x, y));
        true
    });

    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_rect(mask: &mut Mask, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.set(x, y, true);
            }
        }
    }

    #[test]
    fn small_blobs_go_to_the_undetermined_mask() {
        let mut mask = Mask::new(20, 12);
        fill_rect(&mut mask, 0, 0, 5, 2); // 10 pixels
        fill_rect(&mut mask, 8, 0, 2, 1); // 2 pixels
        fill_rect(&mut mask, 0, 5, 10, 5); // 50 pixels

        let set = extract_components(&mask, 5, Connectivity::FourWay);

        assert_eq!(set.accepted.len(), 2);
        assert_eq!(set.accepted[0].len(), 10);
        assert_eq!(set.accepted[1].len(), 50);
        assert_eq!(set.origins(), vec![(0, 0), (0, 5)]);

        let undetermined = set.undetermined.unwrap();
        assert_eq!(undetermined.count(), 2);
        assert!(undetermined.get(8, 0) && undetermined.get(9, 0));
    }

    #[test]
    fn no_small_blobs_means_no_undetermined_mask() {
        let mut mask = Mask::new(6, 6);
        fill_rect(&mut mask, 1, 1, 3, 3);

        let set = extract_components(&mask, 4, Connectivity::FourWay);
        assert_eq!(set.accepted.len(), 1);
        assert!(set.undetermined.is_none());
    }

    #[test]
    fn eight_way_regroups_diagonal_fragments() {
        let mut mask = Mask::new(5, 5);
        mask.set(0, 0, true);
        mask.set(1, 1, true);
        mask.set(2, 2, true);
        mask.set(4, 0, true);

        let four = extract_components(&mask, 0, Connectivity::FourWay);
        assert_eq!(four.accepted.len(), 4);

        let eight = extract_components(&mask, 0, Connectivity::EightWay);
        assert_eq!(eight.accepted.len(), 2);
        assert_eq!(eight.accepted[0].origin, (0, 0));
        assert_eq!(eight.accepted[0].len(), 3);
        assert_eq!(eight.accepted[1].origin, (4, 0));
    }

    #[test]
    fn component_mask_matches_pixels() {
        let mut mask = Mask::new(4, 4);
        fill_rect(&mut mask, 1, 1, 2, 2);

        let set = extract_components(&mask, 0, Connectivity::FourWay);
        assert_eq!(set.accepted[0].to_mask(4, 4), mask);
    }
}
