//! Image artifacts: cluster map, binary mask and a tinted overlay.
use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::raster::Raster;
use crate::sky_image::SkyImage;

/// Fixed cluster colours; label `i` uses `CLUSTER_PALETTE[i % 7]`.
pub const CLUSTER_PALETTE: [[u8; 3]; 7] = [
    [255, 0, 0],     // red
    [0, 255, 0],     // green
    [0, 0, 255],     // blue
    [255, 255, 0],   // yellow
    [0, 255, 255],   // cyan
    [255, 0, 255],   // magenta
    [128, 128, 128], // gray
];

/// Overlay tint for cloud pixels.
const CLOUD_TINT: [u8; 3] = [255, 64, 64];
/// Weight of the tint when blending onto the photo.
const TINT_ALPHA: f32 = 0.5;

pub fn cluster_color(label: usize) -> [u8; 3] {
    CLUSTER_PALETTE[label % CLUSTER_PALETTE.len()]
}

/// One palette colour per pixel by cluster label.
pub fn segmentation_image(labels: &Raster<usize>) -> RgbImage {
    RgbImage::from_fn(labels.width as u32, labels.height as u32, |x, y| {
        Rgb(cluster_color(*labels.get(y as usize, x as usize)))
    })
}

/// 255 where cloud, 0 elsewhere.
pub fn mask_image(mask: &Raster<bool>) -> GrayImage {
    GrayImage::from_fn(mask.width as u32, mask.height as u32, |x, y| {
        Luma([if *mask.get(y as usize, x as usize) { 255 } else { 0 }])
    })
}

/// Source photo with cloud pixels blended towards a red tint.
pub fn overlay_image(image: &SkyImage, mask: &Raster<bool>) -> RgbImage {
    let mut out = image.as_rgb().clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        if !*mask.get(y as usize, x as usize) {
            continue;
        }
        for (ch, &tint) in px.0.iter_mut().zip(CLOUD_TINT.iter()) {
            let v = *ch as f32 * (1.0 - TINT_ALPHA) + tint as f32 * TINT_ALPHA;
            *ch = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Scale a float channel to 8-bit gray over its own min..max range.
pub fn channel_image(channel: &Raster<f64>) -> GrayImage {
    let lo = channel.min_value();
    let range = (channel.max_value() - lo).max(1e-12);
    GrayImage::from_fn(channel.width as u32, channel.height as u32, |x, y| {
        let t = (channel.get(y as usize, x as usize) - lo) / range;
        Luma([(t.clamp(0.0, 1.0) * 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_cycles_after_seven() {
        assert_eq!(cluster_color(0), [255, 0, 0]);
        assert_eq!(cluster_color(6), [128, 128, 128]);
        assert_eq!(cluster_color(7), cluster_color(0));
        assert_eq!(cluster_color(12), [255, 0, 255]);
    }

    #[test]
    fn segmentation_uses_palette() {
        let labels = Raster::from_vec(2, 1, vec![2usize, 4]);
        let img = segmentation_image(&labels);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 255, 255]);
    }

    #[test]
    fn mask_is_binary() {
        let mask = Raster::from_vec(2, 2, vec![true, false, false, true]);
        let img = mask_image(&mask);
        assert_eq!(img.get_pixel(0, 0).0, [255]);
        assert_eq!(img.get_pixel(1, 0).0, [0]);
        assert_eq!(img.get_pixel(1, 1).0, [255]);
    }

    #[test]
    fn overlay_tints_only_cloud() {
        let img = SkyImage::from_raw(2, 1, 3, vec![0, 0, 0, 0, 0, 0]).unwrap();
        let mask = Raster::from_vec(2, 1, vec![true, false]);
        let out = overlay_image(&img, &mask);
        assert_eq!(out.get_pixel(0, 0).0, [128, 32, 32]);
        assert_eq!(out.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn channel_image_spans_full_range() {
        let ch = Raster::from_vec(3, 1, vec![-5.0, 0.0, 5.0]);
        let img = channel_image(&ch);
        assert_eq!(img.get_pixel(0, 0).0, [0]);
        assert_eq!(img.get_pixel(2, 0).0, [255]);
    }
}
