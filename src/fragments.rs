//! Handling of interior fragments too small to be provinces.
//!
//! Fragments are painted a temporary unique color before border resolution,
//! so border pixels next to them resolve as if they were provinces. Once the
//! borders are settled, each fragment (now including any border pixels that
//! took its color) is given to a neighbor or marked undetermined, depending
//! on the configured policy.

use image::RgbImage;
use log::debug;
use rand::Rng;

use crate::borders::{NeighborTally, CARDINAL_WEIGHT, DIAGONAL_WEIGHT};
use crate::color::{ColorAllocator, ReservedColors};
use crate::components::extract_components;
use crate::config::UndeterminedHandling;
use crate::enclosure::StateArea;
use crate::errors::Result;
use crate::flood::{has_cardinal_neighbor_in, Connectivity, MOORE_NEIGHBORHOOD};
use crate::image_utils::{has_rgb_color, Rgb};
use crate::mask::Mask;

/// A group of undersized interior pixels and the placeholder color it wears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub origin: (u32, u32),
    pub temp_color: Rgb,
}

/// Regroup the undetermined mask with 8-connectivity and paint each group a
/// freshly allocated temporary color
pub fn paint_fragments<R: Rng>(
    view: &mut RgbImage,
    undetermined: &Mask,
    allocator: &ColorAllocator<'_>,
    rng: &mut R,
    palette_base: Option<Rgb>,
    disallowed: &[Rgb],
) -> Result<Vec<Fragment>> {
    let groups = extract_components(undetermined, 0, Connectivity::EightWay);
    let mut fragments = Vec::with_capacity(groups.accepted.len());

    for group in groups.accepted {
        let temp_color = allocator.allocate(rng, palette_base, disallowed)?;
        for &(x, y) in &group.pixels {
            view.put_pixel(x, y, image::Rgb(temp_color));
        }
        fragments.push(Fragment {
            origin: group.origin,
            temp_color,
        });
    }

    Ok(fragments)
}

/// Decides the final color of each fragment after border resolution
pub struct FragmentHandler<'a> {
    pub policy: UndeterminedHandling,
    pub reserved: ReservedColors,
    pub prefer_native: bool,
    /// The region's allocator; temporary colors go back through it
    pub allocator: &'a ColorAllocator<'a>,
}

impl<'a> FragmentHandler<'a> {
    /// Recolor every fragment and release its temporary color. Returns the
    /// origins (crop coordinates) of fragments left undetermined.
    ///
    /// Reserved colors and the temporary colors of fragments not yet settled
    /// are never adopted.
    pub fn settle(&self, view: &mut RgbImage, area: &StateArea, fragments: &[Fragment]) -> Vec<(u32, u32)> {
        let mut undetermined = Vec::new();

        for (index, fragment) in fragments.iter().enumerate() {
            let unsettled = &fragments[index + 1..];
            let blocked = |color: Rgb| {
                self.reserved.is_reserved(color) || unsettled.iter().any(|f| f.temp_color == color)
            };

            let fragment_area = Mask::from_fn(view.width(), view.height(), |x, y| {
                area.enclosure.get(x, y) && has_rgb_color(view.get_pixel(x, y), fragment.temp_color)
            });

            let adopted = match self.policy {
                UndeterminedHandling::Mark => None,
                UndeterminedHandling::UniqueNeighbor => unique_neighbor_color(view, area, &fragment_area, blocked),
                UndeterminedHandling::MajorityNeighbor => {
                    neighbor_tally(view, area, &fragment_area, blocked).winner(self.prefer_native)
                }
            };

            let final_color = adopted.unwrap_or(self.reserved.undetermined);
            for (x, y) in fragment_area.iter_true() {
                view.put_pixel(x, y, image::Rgb(final_color));
            }
            self.allocator.release(fragment.temp_color);

            match adopted {
                Some(color) => debug!("Fragment at {:?} adopted {:?}", fragment.origin, color),
                None => undetermined.push(fragment.origin),
            }
        }

        undetermined
    }
}

/// Visit every pixel bordering `fragment_area` in raster order, with the vote
/// weight it would carry: orthogonal contact weighs more than diagonal, and
/// only orthogonal contact from a non-border pixel is native.
fn for_each_area_neighbor<F>(view: &RgbImage, area: &StateArea, fragment_area: &Mask, mut visit: F) -> bool
where
    F: FnMut(Rgb, u32, bool) -> bool,
{
    for (x, y) in area.enclosure.iter_true() {
        if fragment_area.get(x, y) {
            continue;
        }

        let (weight, native) = if has_cardinal_neighbor_in(fragment_area, x, y) {
            (CARDINAL_WEIGHT, !area.border.get(x, y))
        } else if MOORE_NEIGHBORHOOD
            .iter()
            .any(|&(dx, dy)| fragment_area.get_or_false(x as i32 + dx, y as i32 + dy))
        {
            (DIAGONAL_WEIGHT, false)
        } else {
            continue;
        };

        if !visit(view.get_pixel(x, y).0, weight, native) {
            return false;
        }
    }
    true
}

/// Weighted votes of every neighbor whose color may be adopted
fn neighbor_tally<B>(view: &RgbImage, area: &StateArea, fragment_area: &Mask, blocked: B) -> NeighborTally
where
    B: Fn(Rgb) -> bool,
{
    let mut tally = NeighborTally::new();
    for_each_area_neighbor(view, area, fragment_area, |color, weight, native| {
        if !blocked(color) {
            tally.add(color, weight, native);
        }
        true
    });
    tally
}

/// The neighboring color if it is the only one. A blocked neighbor counts
/// as a second color, so the scan stops there too.
fn unique_neighbor_color<B>(view: &RgbImage, area: &StateArea, fragment_area: &Mask, blocked: B) -> Option<Rgb>
where
    B: Fn(Rgb) -> bool,
{
    let mut seen: Option<Rgb> = None;
    let complete = for_each_area_neighbor(view, area, fragment_area, |color, _, _| {
        if blocked(color) {
            return false;
        }
        match seen {
            Some(first) if first != color => false,
            _ => {
                seen = Some(color);
                true
            }
        }
    });

    if complete {
        seen
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{PaletteVariation, UsedColorSet};
    use crate::enclosure::find_state_area;
    use crate::image_utils::filled_image;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const STATE: Rgb = [200, 30, 30];
    const BIG: Rgb = [10, 100, 10];
    const SMALL: Rgb = [10, 10, 100];
    const TEMP: Rgb = [90, 90, 10];

    /// 9x5 state; interior columns 1..=5 are `BIG`, 6..=7 are `SMALL`, and
    /// the pixel (3, 2) is a fragment painted `TEMP`.
    fn state_with_fragment() -> (RgbImage, StateArea) {
        let mut guide = filled_image(9, 5, [255, 255, 255]);
        for y in 0..5 {
            for x in 0..9 {
                if x == 0 || x == 8 || y == 0 || y == 4 {
                    guide.put_pixel(x, y, image::Rgb(STATE));
                }
            }
        }
        let area = find_state_area(&guide, STATE, &ReservedColors::default()).unwrap();

        let mut view = guide.clone();
        for (x, y) in area.interior().iter_true() {
            let color = if x <= 5 { BIG } else { SMALL };
            view.put_pixel(x, y, image::Rgb(color));
        }
        view.put_pixel(3, 2, image::Rgb(TEMP));
        (view, area)
    }

    const UNDETERMINED: Rgb = [127, 127, 127];

    fn allocator(used: &UsedColorSet) -> ColorAllocator<'_> {
        ColorAllocator::new(ReservedColors::default(), used, PaletteVariation::default(), 10)
    }

    fn handler<'a>(policy: UndeterminedHandling, allocator: &'a ColorAllocator<'a>) -> FragmentHandler<'a> {
        FragmentHandler {
            policy,
            reserved: ReservedColors::default(),
            prefer_native: true,
            allocator,
        }
    }

    #[test]
    fn enclosed_fragment_adopts_its_only_neighbor() {
        let (mut view, area) = state_with_fragment();
        let used = UsedColorSet::new();
        used.try_claim(TEMP);
        let allocator = allocator(&used);
        let fragments = [Fragment { origin: (3, 2), temp_color: TEMP }];

        let undetermined = handler(UndeterminedHandling::UniqueNeighbor, &allocator).settle(&mut view, &area, &fragments);

        assert!(undetermined.is_empty());
        assert_eq!(view.get_pixel(3, 2).0, BIG);
        assert!(!used.contains(TEMP));
    }

    #[test]
    fn mark_policy_always_marks() {
        let (mut view, area) = state_with_fragment();
        let used = UsedColorSet::new();
        let allocator = allocator(&used);
        let fragments = [Fragment { origin: (3, 2), temp_color: TEMP }];

        let undetermined = handler(UndeterminedHandling::Mark, &allocator).settle(&mut view, &area, &fragments);

        assert_eq!(undetermined, vec![(3, 2)]);
        assert_eq!(view.get_pixel(3, 2).0, UNDETERMINED);
    }

    #[test]
    fn contested_fragment_needs_majority_policy() {
        let (mut view, area) = state_with_fragment();
        // Move the fragment next to the SMALL side: (5, 2) touches BIG on
        // three sides and SMALL on one.
        view.put_pixel(3, 2, image::Rgb(BIG));
        view.put_pixel(5, 2, image::Rgb(TEMP));
        let fragments = [Fragment { origin: (5, 2), temp_color: TEMP }];
        let used = UsedColorSet::new();
        let allocator = allocator(&used);

        let mut unique_view = view.clone();
        let undetermined =
            handler(UndeterminedHandling::UniqueNeighbor, &allocator).settle(&mut unique_view, &area, &fragments);
        assert_eq!(undetermined, vec![(5, 2)]);
        assert_eq!(unique_view.get_pixel(5, 2).0, UNDETERMINED);

        let undetermined =
            handler(UndeterminedHandling::MajorityNeighbor, &allocator).settle(&mut view, &area, &fragments);
        assert!(undetermined.is_empty());
        assert_eq!(view.get_pixel(5, 2).0, BIG);
    }

    #[test]
    fn undetermined_neighbor_blocks_unique_adoption() {
        let (mut view, area) = state_with_fragment();
        // The fragment touches BIG and an already undetermined pixel.
        view.put_pixel(4, 2, image::Rgb(UNDETERMINED));
        let fragments = [Fragment { origin: (3, 2), temp_color: TEMP }];
        let used = UsedColorSet::new();
        let allocator = allocator(&used);

        let mut unique_view = view.clone();
        let undetermined =
            handler(UndeterminedHandling::UniqueNeighbor, &allocator).settle(&mut unique_view, &area, &fragments);
        assert_eq!(undetermined, vec![(3, 2)]);
        assert_eq!(unique_view.get_pixel(3, 2).0, UNDETERMINED);

        // The majority vote simply ignores it.
        let undetermined =
            handler(UndeterminedHandling::MajorityNeighbor, &allocator).settle(&mut view, &area, &fragments);
        assert!(undetermined.is_empty());
        assert_eq!(view.get_pixel(3, 2).0, BIG);
    }

    #[test]
    fn unsettled_fragment_colors_are_never_adopted() {
        let (mut view, area) = state_with_fragment();
        let other: Rgb = [90, 10, 90];
        // Two fragments side by side, walled in by undetermined pixels, so
        // each one's only adoptable neighbor would be the other.
        for y in 1..=3 {
            for x in 2..=5 {
                view.put_pixel(x, y, image::Rgb(UNDETERMINED));
            }
        }
        view.put_pixel(3, 2, image::Rgb(TEMP));
        view.put_pixel(4, 2, image::Rgb(other));
        let fragments = [
            Fragment { origin: (3, 2), temp_color: TEMP },
            Fragment { origin: (4, 2), temp_color: other },
        ];
        let used = UsedColorSet::new();
        let allocator = allocator(&used);

        let undetermined =
            handler(UndeterminedHandling::MajorityNeighbor, &allocator).settle(&mut view, &area, &fragments);

        assert_eq!(undetermined, vec![(3, 2), (4, 2)]);
        assert_eq!(view.get_pixel(3, 2).0, UNDETERMINED);
        assert_eq!(view.get_pixel(4, 2).0, UNDETERMINED);
    }

    #[test]
    fn diagonal_pieces_share_one_temporary_color() {
        let mut undetermined = Mask::new(6, 6);
        undetermined.set(1, 1, true);
        undetermined.set(2, 2, true);
        undetermined.set(5, 5, true);

        let used = UsedColorSet::new();
        let allocator = ColorAllocator::new(ReservedColors::default(), &used, PaletteVariation::default(), 10);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut view = filled_image(6, 6, [255, 255, 255]);

        let fragments = paint_fragments(&mut view, &undetermined, &allocator, &mut rng, None, &[]).unwrap();

        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].origin, (1, 1));
        assert_eq!(view.get_pixel(2, 2).0, fragments[0].temp_color);
        assert_ne!(fragments[0].temp_color, fragments[1].temp_color);
        assert_eq!(used.len(), 2);
    }
}
