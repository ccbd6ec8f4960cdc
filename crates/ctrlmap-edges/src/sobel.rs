//! Sobel gradients on 8-bit luminance.
//!
//! Gradients are expressed in step-height units: the raw 3x3 Sobel
//! response on `[0, 1]` intensities divided by 4, so a sharp black/white
//! step has magnitude 1. Magnitudes are clamped to `[0, 1]` (corner
//! configurations can slightly exceed 1 otherwise).
//!
//! Border pixels are handled by edge replication, inherited from
//! [`imageproc::filter::filter_clamped`]. Requires the `imageproc` backend.

use image::GrayImage;

use crate::types::{EdgeError, GrayBuffer};

/// Sobel response to a unit step on `[0, 1]` intensities.
pub const SOBEL_GAIN: f32 = 4.0;

/// Raw Sobel response of a full-range step on 8-bit input.
#[cfg(feature = "imageproc")]
const STEP_RESPONSE: f32 = SOBEL_GAIN * 255.0;

/// Per-pixel gradient components and magnitude.
#[derive(Debug, Clone)]
pub struct Gradients {
    /// Horizontal derivative.
    pub gx: GrayBuffer,
    /// Vertical derivative (image rows grow downward).
    pub gy: GrayBuffer,
    /// `sqrt(gx^2 + gy^2)`, clamped to `[0, 1]`.
    pub magnitude: GrayBuffer,
}

impl Gradients {
    /// Largest magnitude in the image (0 for a uniform image).
    #[must_use]
    pub fn peak(&self) -> f32 {
        self.magnitude.iter().copied().fold(0.0, f32::max)
    }
}

/// Compute Sobel gradients.
///
/// # Errors
///
/// Infallible with the `imageproc` backend; the signature is shared with
/// builds that lack it.
#[cfg(feature = "imageproc")]
#[allow(clippy::unnecessary_wraps)]
pub fn sobel(image: &GrayImage) -> Result<Gradients, EdgeError> {
    use image::Luma;
    use imageproc::definitions::Image;
    use imageproc::filter::filter_clamped;
    use imageproc::kernel;

    let raw_gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let raw_gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);

    let (w, h) = image.dimensions();
    let gx = GrayBuffer::from_fn(w, h, |x, y| {
        Luma([f32::from(raw_gx.get_pixel(x, y).0[0]) / STEP_RESPONSE])
    });
    let gy = GrayBuffer::from_fn(w, h, |x, y| {
        Luma([f32::from(raw_gy.get_pixel(x, y).0[0]) / STEP_RESPONSE])
    });
    let magnitude = GrayBuffer::from_fn(w, h, |x, y| {
        let dx = gx.get_pixel(x, y).0[0];
        let dy = gy.get_pixel(x, y).0[0];
        Luma([dx.hypot(dy).min(1.0)])
    });

    Ok(Gradients { gx, gy, magnitude })
}

/// Compute Sobel gradients.
///
/// # Errors
///
/// Always returns [`EdgeError::UnavailableBackend`]: this build has no
/// `imageproc` backend.
#[cfg(not(feature = "imageproc"))]
pub fn sobel(_image: &GrayImage) -> Result<Gradients, EdgeError> {
    Err(EdgeError::UnavailableBackend {
        backend: crate::capability::Backend::Imageproc,
    })
}

#[cfg(all(test, feature = "imageproc"))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn uniform_image_has_zero_gradient() {
        let img = GrayImage::from_pixel(8, 8, image::Luma([200]));
        let gradients = sobel(&img).unwrap();
        assert!(gradients.peak().abs() < f32::EPSILON);
    }

    #[test]
    fn full_step_has_unit_magnitude() {
        let img = GrayImage::from_fn(8, 8, |x, _| image::Luma([if x < 4 { 0 } else { 255 }]));
        let gradients = sobel(&img).unwrap();

        // Both pixels adjacent to the step see the full response.
        assert!((gradients.magnitude.get_pixel(3, 4).0[0] - 1.0).abs() < 1e-6);
        assert!((gradients.magnitude.get_pixel(4, 4).0[0] - 1.0).abs() < 1e-6);
        // One pixel further away the 3x3 kernel no longer reaches the step.
        assert!(gradients.magnitude.get_pixel(2, 4).0[0].abs() < f32::EPSILON);
        assert!(gradients.magnitude.get_pixel(5, 4).0[0].abs() < f32::EPSILON);
        // A vertical step has no vertical derivative.
        assert!(gradients.gy.get_pixel(4, 4).0[0].abs() < f32::EPSILON);
    }

    #[test]
    fn border_replication_keeps_border_flat() {
        // A vertical step far from the border: the border columns see
        // replicated neighbors and no gradient.
        let img = GrayImage::from_fn(9, 5, |x, _| image::Luma([if x < 4 { 10 } else { 240 }]));
        let gradients = sobel(&img).unwrap();
        for y in 0..5 {
            assert!(gradients.magnitude.get_pixel(0, y).0[0].abs() < f32::EPSILON);
            assert!(gradients.magnitude.get_pixel(8, y).0[0].abs() < f32::EPSILON);
        }
    }

    #[test]
    fn magnitude_is_clamped() {
        let img = GrayImage::from_fn(3, 3, |x, y| {
            image::Luma([if x == 2 || y == 2 { 255 } else { 0 }])
        });
        let gradients = sobel(&img).unwrap();
        assert!(gradients.magnitude.iter().all(|&m| (0.0..=1.0).contains(&m)));
    }
}
