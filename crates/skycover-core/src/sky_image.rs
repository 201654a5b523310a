//! Validated 8-bit RGB input raster.
//!
//! Decoding from disk belongs to the caller; this type only checks that the
//! buffer it is handed is a non-empty, 3-channel image.

use image::{DynamicImage, RgbImage};

use crate::error::{Result, SegmentError};

/// Immutable width×height raster of RGB triples.
#[derive(Debug, Clone)]
pub struct SkyImage {
    pixels: RgbImage,
}

impl SkyImage {
    /// Build from interleaved bytes with a declared channel count.
    pub fn from_raw(width: u32, height: u32, channels: usize, data: Vec<u8>) -> Result<Self> {
        if channels != 3 {
            return Err(SegmentError::invalid_image(format!(
                "expected 3 channels, got {channels}"
            )));
        }
        if width == 0 || height == 0 {
            return Err(SegmentError::invalid_image(format!(
                "zero-area image ({width}x{height})"
            )));
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(SegmentError::invalid_image(format!(
                "buffer holds {} bytes, {width}x{height}x3 needs {expected}",
                data.len()
            )));
        }
        let pixels = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| SegmentError::invalid_image("buffer does not fit dimensions"))?;
        Ok(Self { pixels })
    }

    /// Build from an already-decoded RGB image.
    pub fn from_rgb(pixels: RgbImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(SegmentError::invalid_image(format!(
                "zero-area image ({}x{})",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self { pixels })
    }

    /// Build from a decoded image of any layout; only 3-channel colour is accepted.
    pub fn from_dynamic(img: DynamicImage) -> Result<Self> {
        let channels = img.color().channel_count();
        if channels != 3 {
            return Err(SegmentError::invalid_image(format!(
                "expected 3 channels, got {channels} ({:?})",
                img.color()
            )));
        }
        Self::from_rgb(img.to_rgb8())
    }

    pub fn width(&self) -> usize {
        self.pixels.width() as usize
    }

    pub fn height(&self) -> usize {
        self.pixels.height() as usize
    }

    #[inline]
    pub fn pixel(&self, row: usize, col: usize) -> [u8; 3] {
        self.pixels.get_pixel(col as u32, row as u32).0
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }
}
