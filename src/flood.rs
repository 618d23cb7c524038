use serde::{Deserialize, Serialize};

use crate::mask::Mask;

/// Neighbor relation used when growing connected areas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// Von Neumann neighborhood: up, down, left, right
    #[default]
    FourWay,
    /// Moore neighborhood: also the four diagonals
    EightWay,
}

/// The eight neighbor offsets, clockwise from "right".
/// Even indices are cardinal directions, odd indices are diagonals.
pub static MOORE_NEIGHBORHOOD: [(i32, i32); 8] = [
    (1, 0),   // right
    (1, 1),   // down-right
    (0, 1),   // down
    (-1, 1),  // down-left
    (-1, 0),  // left
    (-1, -1), // up-left
    (0, -1),  // up
    (1, -1),  // up-right
];

pub static CARDINAL_OFFSETS: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

impl Connectivity {
    pub fn offsets(self) -> &'static [(i32, i32)] {
        match self {
            Connectivity::FourWay => &CARDINAL_OFFSETS,
            Connectivity::EightWay => &MOORE_NEIGHBORHOOD,
        }
    }
}

/// Depth-first walk outward from `seed` over in-bounds neighbors.
///
/// `enter` is asked about each candidate cell and returns whether the walk
/// steps onto it. It must remember the cells it accepts, or the walk will
/// not terminate.
pub fn walk_connected<F>(dimensions: (u32, u32), seed: (u32, u32), connectivity: Connectivity, mut enter: F)
where
    F: FnMut(u32, u32) -> bool,
{
    let (width, height) = dimensions;
    let mut stack = vec![seed];

    while let Some((x, y)) = stack.pop() {
        for &(dx, dy) in connectivity.offsets() {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            if enter(nx, ny) {
                stack.push((nx, ny));
            }
        }
    }
}

/// Select every cell connected to `seed` that holds the same value as the seed.
///
/// Works for both polarities: seeding on a false cell floods the
/// complement of the mask, which is what the enclosure test relies on.
pub fn flood(mask: &Mask, seed: (u32, u32), connectivity: Connectivity) -> Mask {
    let (width, height) = mask.dimensions();
    let mut selected = Mask::new(width, height);

    if seed.0 >= width || seed.1 >= height {
        return selected;
    }

    let target = mask.get(seed.0, seed.1);
    selected.set(seed.0, seed.1, true);

    walk_connected((width, height), seed, connectivity, |x, y| {
        if selected.get(x, y) || mask.get(x, y) != target {
            return false;
        }
        selected.set(x, y, true);
        true
    });

    selected
}

/// Whether any cardinal neighbor of (x, y) is set in `mask`
#[inline]
pub fn has_cardinal_neighbor_in(mask: &Mask, x: u32, y: u32) -> bool {
    CARDINAL_OFFSETS
        .iter()
        .any(|&(dx, dy)| mask.get_or_false(x as i32 + dx, y as i32 + dy))
}
