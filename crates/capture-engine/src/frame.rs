//! Captured frames and their contrast normalization.
//!
//! Frames are 8-bit RGB. Normalization equalizes the CIE L* (perceptual
//! lightness) channel and leaves a*/b* alone, so faces in dim or washed-out
//! shots get usable contrast without a colour shift.

use std::path::Path;

use image::{GrayImage, Rgb, RgbImage};
use mo_common::error::{MoError, MoResult};
use mo_pose_model::landmarks::FrameSize;

/// D65 reference white.
const WHITE: [f64; 3] = [0.950_47, 1.0, 1.088_83];

const LAB_EPSILON: f64 = 6.0 / 29.0;

/// One camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// A frame filled with one colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::new(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width(), self.height())
    }

    pub fn is_empty(&self) -> bool {
        self.size().is_empty()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Write the frame as PNG, creating parent directories as needed.
    pub fn save_png(&self, path: &Path) -> MoResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| MoError::classification(format!("failed to write {path:?}: {e}")))
    }

    /// Equalize the lightness channel in place.
    pub fn normalize_contrast(&mut self) {
        equalize_lightness(&mut self.image);
    }
}

/// Histogram-equalize the L* channel of an RGB image in place.
pub fn equalize_lightness(image: &mut RgbImage) {
    if image.width() == 0 || image.height() == 0 {
        return;
    }

    let (width, height) = image.dimensions();
    let lab: Vec<[f64; 3]> = image.pixels().map(|p| rgb_to_lab(p.0)).collect();
    let mut lightness = GrayImage::from_fn(width, height, |x, y| {
        let l = lab[(y * width + x) as usize][0];
        image::Luma([(l / 100.0 * 255.0).round().clamp(0.0, 255.0) as u8])
    });
    imageproc::contrast::equalize_histogram_mut(&mut lightness);

    for ((pixel, [_, a, b]), l) in image
        .pixels_mut()
        .zip(lab)
        .zip(lightness.pixels().map(|p| f64::from(p.0[0]) / 255.0 * 100.0))
    {
        pixel.0 = lab_to_rgb([l, a, b]);
    }
}

/// sRGB (8-bit) to CIE L*a*b* under D65.
pub fn rgb_to_lab(rgb: [u8; 3]) -> [f64; 3] {
    let [r, g, b] = rgb.map(|c| srgb_to_linear(f64::from(c) / 255.0));
    let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
    let z = 0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b;

    let fx = lab_f(x / WHITE[0]);
    let fy = lab_f(y / WHITE[1]);
    let fz = lab_f(z / WHITE[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// CIE L*a*b* (D65) back to 8-bit sRGB, clamping out-of-gamut values.
pub fn lab_to_rgb(lab: [f64; 3]) -> [u8; 3] {
    let [l, a, b] = lab;
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;
    let x = WHITE[0] * lab_f_inv(fx);
    let y = WHITE[1] * lab_f_inv(fy);
    let z = WHITE[2] * lab_f_inv(fz);

    let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
    let g = -0.969_266_0 * x + 1.876_010_8 * y + 0.041_556_0 * z;
    let b = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;
    [r, g, b].map(|c| (linear_to_srgb(c) * 255.0).round().clamp(0.0, 255.0) as u8)
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> f64 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON.powi(3) {
        t.cbrt()
    } else {
        t / (3.0 * LAB_EPSILON * LAB_EPSILON) + 4.0 / 29.0
    }
}

fn lab_f_inv(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.powi(3)
    } else {
        3.0 * LAB_EPSILON * LAB_EPSILON * (t - 4.0 / 29.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_gap(a: [u8; 3], b: [u8; 3]) -> i32 {
        (i32::from(a[0]) - i32::from(b[0])).abs()
    }

    #[test]
    fn lab_round_trip_is_close() {
        for rgb in [[0, 0, 0], [255, 255, 255], [120, 80, 200], [10, 200, 30], [128, 128, 128]] {
            let back = lab_to_rgb(rgb_to_lab(rgb));
            for (orig, round) in rgb.iter().zip(back.iter()) {
                assert!(
                    (i32::from(*orig) - i32::from(*round)).abs() <= 1,
                    "{rgb:?} came back as {back:?}"
                );
            }
        }
    }

    #[test]
    fn lightness_extremes() {
        assert!(rgb_to_lab([0, 0, 0])[0].abs() < 1e-6);
        assert!((rgb_to_lab([255, 255, 255])[0] - 100.0).abs() < 1e-3);
    }

    #[test]
    fn equalization_stretches_low_contrast_frames() {
        let dark = [100, 100, 100];
        let light = [110, 110, 110];
        let mut frame = Frame::new(RgbImage::from_fn(16, 8, |x, _| {
            Rgb(if x < 8 { dark } else { light })
        }));

        frame.normalize_contrast();

        let new_dark = frame.image().get_pixel(0, 0).0;
        let new_light = frame.image().get_pixel(15, 0).0;
        assert!(channel_gap(new_dark, new_light) > 2 * channel_gap(dark, light));
        assert_eq!(frame.size(), FrameSize::new(16, 8));
    }

    #[test]
    fn equalization_keeps_grey_grey() {
        let mut frame = Frame::new(RgbImage::from_fn(8, 8, |x, y| {
            let v = (40 + x * 10 + y * 5) as u8;
            Rgb([v, v, v])
        }));
        frame.normalize_contrast();
        for pixel in frame.image().pixels() {
            let [r, g, b] = pixel.0;
            assert!(r.abs_diff(g) <= 2 && g.abs_diff(b) <= 2, "tinted pixel {:?}", pixel.0);
        }
    }

    #[test]
    fn empty_frame_is_left_alone() {
        let mut image = RgbImage::new(0, 0);
        equalize_lightness(&mut image);
        assert_eq!(image.dimensions(), (0, 0));
    }

    #[test]
    fn save_png_writes_file() {
        let dir = std::env::temp_dir().join(format!("mo-frame-test-{}", std::process::id()));
        let path = dir.join("nested").join("cap.png");
        Frame::solid(4, 4, [10, 20, 30]).save_png(&path).unwrap();
        assert!(path.exists());
        std::fs::remove_dir_all(dir).ok();
    }
}
