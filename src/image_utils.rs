use std::collections::BTreeSet;

use image::RgbImage;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

/// An RGB color as stored in the guide and output rasters
pub type Rgb = [u8; 3];

/// Outline color of every diagnostic marker dot
pub const MARKER_OUTLINE: Rgb = [255, 255, 255];

/// Check if a pixel has the specified RGB color
#[inline]
pub fn has_rgb_color(pixel: &image::Rgb<u8>, color: Rgb) -> bool {
    pixel.0 == color
}

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i32, y: i32, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height
}

/// Collect every distinct color of an image, in ascending channel order
pub fn unique_colors(image: &RgbImage) -> BTreeSet<Rgb> {
    image.pixels().map(|p| p.0).collect()
}

/// Create an image of the given size filled with a single color
pub fn filled_image(width: u32, height: u32, color: Rgb) -> RgbImage {
    RgbImage::from_pixel(width, height, image::Rgb(color))
}

/// Paint a 3x3 marker dot centred on (x, y): an outline ring around one
/// pixel of `center` color. Parts falling outside the image are clipped.
pub fn draw_marker(image: &mut RgbImage, x: u32, y: u32, center: Rgb, outline: Rgb) {
    let rect = Rect::at(x as i32 - 1, y as i32 - 1).of_size(3, 3);
    draw_filled_rect_mut(image, rect, image::Rgb(outline));

    if x < image.width() && y < image.height() {
        image.put_pixel(x, y, image::Rgb(center));
    }
}

/// Create a debug image with the specified points marked by colored dots
pub fn create_debug_image(image: &RgbImage, points: &[(u32, u32)], color: Rgb) -> RgbImage {
    let mut debug_image = image.clone();
    mark_points(&mut debug_image, points, color);
    debug_image
}

/// Mark each point of `points` with a marker dot of the given center color
pub fn mark_points(image: &mut RgbImage, points: &[(u32, u32)], color: Rgb) {
    for &(x, y) in points {
        draw_marker(image, x, y, color, MARKER_OUTLINE);
    }
}
