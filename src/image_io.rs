use std::path::{Path, PathBuf};
use image::RgbImage;
use log::debug;

use crate::errors::{ProvincialError, Result};

/// Represents an input raster with its metadata
pub struct InputImage {
    pub image: RgbImage,
    pub path: PathBuf,
}

/// Load an image as 8-bit RGB. Any alpha channel is dropped.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(ProvincialError::InvalidPath(path.to_path_buf()));
    }

    let img = image::open(path)?;
    let rgb_img = img.to_rgb8();
    debug!(
        "Loaded {} ({}x{})",
        path.display(),
        rgb_img.width(),
        rgb_img.height()
    );

    Ok(InputImage {
        image: rgb_img,
        path: path.to_path_buf(),
    })
}

/// Load an optional raster that has to match the given dimensions
pub fn load_matching_image<P: AsRef<Path>>(path: P, expected: (u32, u32)) -> Result<InputImage> {
    let input = load_image(path)?;
    let actual = input.image.dimensions();
    if actual != expected {
        return Err(ProvincialError::DimensionMismatch { expected, actual });
    }
    Ok(input)
}

/// Save an RGB image; the format follows the file extension
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    image.save(path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_invalid_path() {
        let result = load_image("definitely/not/here.bmp");
        assert!(matches!(result, Err(ProvincialError::InvalidPath(_))));
    }

    #[test]
    fn saved_bmp_loads_back_as_rgb() {
        let dir = std::env::temp_dir().join("provincial_image_io_test");
        let path = dir.join("roundtrip.bmp");
        let mut image = RgbImage::new(3, 2);
        image.put_pixel(2, 1, image::Rgb([12, 34, 56]));

        save_image(&image, &path).unwrap();
        let loaded = load_matching_image(&path, (3, 2)).unwrap();
        assert_eq!(loaded.image.get_pixel(2, 1).0, [12, 34, 56]);

        let mismatch = load_matching_image(&path, (4, 4));
        assert!(matches!(mismatch, Err(ProvincialError::DimensionMismatch { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
