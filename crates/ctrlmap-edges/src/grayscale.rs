//! Luminance conversion and intensity level helpers.
//!
//! Every detector starts here: an [`Image`] in, a single-channel
//! luminance image out. RGB input is converted with the `image` crate's
//! luma weights (Rec. 709), so green contributes most and blue least.

use std::borrow::Cow;

use image::{GrayImage, Luma};

use crate::types::{GrayBuffer, Image};

/// Convert an image to 8-bit luminance.
///
/// Single-channel input is borrowed unchanged.
#[must_use = "returns the luminance image"]
pub fn luma(image: &Image) -> Cow<'_, GrayImage> {
    match image {
        Image::Gray(gray) => Cow::Borrowed(gray),
        Image::Rgb(rgb) => Cow::Owned(image::imageops::grayscale(rgb)),
    }
}

/// Convert an image to normalized luminance in `[0, 1]`.
#[must_use = "returns the normalized grayscale buffer"]
pub fn normalized(image: &Image) -> GrayBuffer {
    let gray = luma(image);
    GrayBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([f32::from(gray.get_pixel(x, y).0[0]) / 255.0])
    })
}

/// Linearly stretch a buffer so its minimum maps to 0 and its maximum to 1.
///
/// Flat buffers (maximum equal to minimum) are returned unchanged, so a
/// uniform input never gains spurious structure.
#[must_use = "returns the stretched buffer"]
pub fn stretch_contrast(mut buffer: GrayBuffer) -> GrayBuffer {
    let (lo, hi) = buffer
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if hi <= lo {
        return buffer;
    }

    let range = hi - lo;
    for v in buffer.iter_mut() {
        *v = ((*v - lo) / range).clamp(0.0, 1.0);
    }
    buffer
}

/// Center-weighted 5x5 smoothing kernel; weights sum to 100.
const SMOOTH_KERNEL: [[f32; 5]; 5] = [
    [1.0, 1.0, 1.0, 1.0, 1.0],
    [1.0, 5.0, 5.0, 5.0, 1.0],
    [1.0, 5.0, 44.0, 5.0, 1.0],
    [1.0, 5.0, 5.0, 5.0, 1.0],
    [1.0, 1.0, 1.0, 1.0, 1.0],
];

const SMOOTH_KERNEL_SUM: f32 = 100.0;

/// Soften a buffer with a fixed center-weighted 5x5 kernel.
///
/// Pixels outside the buffer repeat the nearest edge pixel. Output stays
/// within the input's value range.
#[must_use]
pub fn smooth(buffer: &GrayBuffer) -> GrayBuffer {
    let (w, h) = buffer.dimensions();
    if w == 0 || h == 0 {
        return buffer.clone();
    }
    GrayBuffer::from_fn(w, h, |x, y| {
        let mut sum = 0.0;
        for (dy, row) in (-2..=2).zip(&SMOOTH_KERNEL) {
            let sy = y.saturating_add_signed(dy).min(h - 1);
            for (dx, weight) in (-2..=2).zip(row) {
                let sx = x.saturating_add_signed(dx).min(w - 1);
                sum += weight * buffer.get_pixel(sx, sy).0[0];
            }
        }
        Luma([sum / SMOOTH_KERNEL_SUM])
    })
}
