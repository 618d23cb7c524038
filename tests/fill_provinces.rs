use std::collections::BTreeSet;

use image::RgbImage;
use provincial_rust_lib::color::rgb_to_hsv;
use provincial_rust_lib::image_utils::{filled_image, unique_colors};
use provincial_rust_lib::{
    fill_provinces, find_state_area, validate_map, Config, ReservedColors, Rgb, UndeterminedHandling,
    ValidationSettings,
};

const BLACK: Rgb = [0, 0, 0];
const WHITE: Rgb = [255, 255, 255];
const UNDETERMINED: Rgb = [127, 127, 127];

const NORTH: Rgb = [200, 40, 40];
const SOUTH: Rgb = [40, 160, 60];

fn config() -> Config {
    Config {
        seed: Some(2020),
        use_parallel: false,
        ..Config::default()
    }
}

/// Draw a rectangle outline in `color` with a white inside
fn outline(guide: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb) {
    for y in y0..=y1 {
        for x in x0..=x1 {
            let on_edge = x == x0 || x == x1 || y == y0 || y == y1;
            guide.put_pixel(x, y, image::Rgb(if on_edge { color } else { WHITE }));
        }
    }
}

fn vertical_line(guide: &mut RgbImage, x: u32, y0: u32, y1: u32, color: Rgb) {
    for y in y0..=y1 {
        guide.put_pixel(x, y, image::Rgb(color));
    }
}

/// Two separate states: NORTH split into three provinces, SOUTH into two
fn two_states() -> RgbImage {
    let mut guide = filled_image(40, 30, BLACK);

    outline(&mut guide, 1, 1, 31, 11, NORTH);
    vertical_line(&mut guide, 11, 1, 11, NORTH);
    vertical_line(&mut guide, 21, 1, 11, NORTH);

    outline(&mut guide, 3, 15, 25, 27, SOUTH);
    vertical_line(&mut guide, 14, 15, 27, SOUTH);

    guide
}

fn province_colors(image: &RgbImage) -> BTreeSet<Rgb> {
    let reserved = ReservedColors::default();
    unique_colors(image)
        .into_iter()
        .filter(|&c| !reserved.is_reserved(c))
        .collect()
}

#[test]
fn closed_rectangle_enclosure_is_exact() {
    let guide = two_states();
    let area = find_state_area(&guide, SOUTH, &ReservedColors::default()).unwrap();

    assert_eq!(area.enclosure.count(), 23 * 13);
    assert_eq!(area.interior().count(), 23 * 13 - (2 * 23 + 2 * 11) - 11);
}

#[test]
fn every_province_gets_a_unique_color() {
    let guide = two_states();
    let mut existing = filled_image(40, 30, BLACK);
    for x in 0..10 {
        existing.put_pixel(x, 29, image::Rgb([x as u8 + 1, 9, 9]));
    }
    let seeded = province_colors(&existing);

    let outcome = fill_provinces(&guide, Some(&existing), &config()).unwrap();

    assert!(outcome.report.is_complete());
    assert_eq!(outcome.report.province_count(), 5);

    let colors = province_colors(&outcome.output);
    assert_eq!(colors.len(), 5);
    assert!(colors.is_disjoint(&seeded));
}

#[test]
fn no_border_marker_survives_resolution() {
    let guide = two_states();
    let outcome = fill_provinces(&guide, None, &config()).unwrap();

    for pixel in outcome.output.pixels() {
        assert_ne!(pixel.0, NORTH);
        assert_ne!(pixel.0, SOUTH);
        assert_ne!(pixel.0, WHITE);
        assert_ne!(pixel.0, UNDETERMINED);
    }
    // Outside both states stays background.
    assert_eq!(outcome.output.get_pixel(35, 5).0, BLACK);
    assert!(outcome.report.stray_border_fragments.is_empty());
}

#[test]
fn border_ring_without_interior_is_a_stray() {
    let mut guide = two_states();
    // A hollow ring around background: there is nothing for its border to join.
    let tube: Rgb = [90, 90, 200];
    for y in 18..=22 {
        for x in 30..=34 {
            if x == 30 || x == 34 || y == 18 || y == 22 {
                guide.put_pixel(x, y, image::Rgb(tube));
            }
        }
    }

    let outcome = fill_provinces(&guide, None, &config()).unwrap();

    assert!(outcome.report.is_complete());
    assert_eq!(outcome.report.stray_border_fragments, vec![(30, 18)]);
    assert_eq!(outcome.output.get_pixel(30, 18).0, UNDETERMINED);
    assert_eq!(outcome.output.get_pixel(34, 22).0, UNDETERMINED);
    assert_eq!(outcome.output.get_pixel(32, 20).0, BLACK);
}

#[test]
fn province_colors_stay_near_the_state_hue() {
    let guide = two_states();
    let outcome = fill_provinces(&guide, None, &config()).unwrap();
    let area = find_state_area(&guide, NORTH, &ReservedColors::default()).unwrap();
    let base_hue = rgb_to_hsv(NORTH).h;

    for (x, y) in area.enclosure.iter_true() {
        let (gx, gy) = area.bbox.to_global(x, y);
        let hue = rgb_to_hsv(outcome.output.get_pixel(gx, gy).0).h;
        let distance = (hue - base_hue).rem_euclid(1.0);
        assert!(distance.min(1.0 - distance) <= 0.06);
    }
}

/// NORTH-like state with a two-pixel pocket fenced off inside its only province
fn state_with_pocket() -> RgbImage {
    let mut guide = filled_image(14, 10, BLACK);
    outline(&mut guide, 1, 1, 12, 8, NORTH);
    for y in 3..=5 {
        for x in 4..=7 {
            if x == 4 || x == 7 || y == 3 || y == 5 {
                guide.put_pixel(x, y, image::Rgb(NORTH));
            }
        }
    }
    guide
}

#[test]
fn pocket_joins_its_surrounding_province() {
    let guide = state_with_pocket();
    let outcome = fill_provinces(&guide, None, &config()).unwrap();

    assert_eq!(outcome.report.province_count(), 1);
    assert!(outcome.report.undetermined_fragments.is_empty());
    assert_eq!(province_colors(&outcome.output).len(), 1);
    assert_eq!(outcome.output.get_pixel(5, 4), outcome.output.get_pixel(2, 2));
}

#[test]
fn pocket_is_marked_when_configured() {
    let guide = state_with_pocket();
    let config = Config {
        undetermined_pixel_handling: UndeterminedHandling::Mark,
        ..config()
    };
    let outcome = fill_provinces(&guide, None, &config).unwrap();

    assert!(outcome.report.is_complete());
    assert_eq!(outcome.report.undetermined_fragments, vec![(5, 4)]);
    assert_eq!(outcome.output.get_pixel(5, 4).0, UNDETERMINED);
    assert_eq!(outcome.output.get_pixel(6, 4).0, UNDETERMINED);
    // The temporary pocket color never reaches the output.
    assert_eq!(province_colors(&outcome.output).len(), 1);

    let settings = ValidationSettings {
        reserved: ReservedColors::default(),
        small_province_pixel_count: 8,
        large_province_bounds: 50,
    };
    let report = validate_map(&outcome.output, &settings);
    assert_eq!(report.undetermined.len(), 1);
}

#[test]
fn same_seed_gives_the_same_map_in_parallel() {
    let guide = two_states();
    let sequential = fill_provinces(&guide, None, &config()).unwrap();
    let parallel = fill_provinces(
        &guide,
        None,
        &Config {
            use_parallel: true,
            ..config()
        },
    )
    .unwrap();

    assert_eq!(sequential.output, parallel.output);
    assert_eq!(sequential.report.seed, 2020);
}
