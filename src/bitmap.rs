use std::path::Path;

use image::{GrayImage, ImageReader};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use log::debug;

use crate::config::{ThresholdMethod, TracingConfig};
use crate::error::TraceError;
use crate::mask::PixelMask;

/// Load an image and convert it to a binary (black/white) GrayImage.
///
/// Foreground (ink) pixels are 255, background pixels are 0. Dark ink on a
/// light background is the default; `config.invert` flips that.
pub fn load_and_threshold(path: &Path, config: &TracingConfig) -> Result<GrayImage, TraceError> {
    let img = ImageReader::open(path)
        .map_err(|e| TraceError::ImageLoad(e.to_string()))?
        .decode()
        .map_err(|e| TraceError::ImageLoad(e.to_string()))?
        .into_luma8();
    Ok(binarize(&img, config))
}

/// Threshold a grayscale image into 0/255 foreground.
pub fn binarize(img: &GrayImage, config: &TracingConfig) -> GrayImage {
    let level = match config.threshold {
        ThresholdMethod::Fixed(t) => t,
        ThresholdMethod::Otsu => {
            let t = otsu_level(img);
            debug!("otsu threshold = {}", t);
            t
        }
    };

    let mut binary = threshold(img, level, ThresholdType::BinaryInverted);

    if config.invert {
        for pixel in binary.pixels_mut() {
            pixel.0[0] = 255 - pixel.0[0];
        }
    }
    binary
}

/// Load an image straight into a [`PixelMask`].
pub fn load_mask(path: &Path, config: &TracingConfig) -> Result<PixelMask, TraceError> {
    let binary = load_and_threshold(path, config)?;
    Ok(PixelMask::from_gray(&binary))
}
