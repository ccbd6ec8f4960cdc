//! Gaussian smoothing before gradient computation.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`], which pads by
//! continuity (edge replication) so that uniform borders stay uniform.
//! Requires the `imageproc` backend.

use image::GrayImage;

use crate::types::EdgeError;

/// Apply Gaussian blur with standard deviation `sigma`.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`.
///
/// # Errors
///
/// Returns [`EdgeError::UnavailableBackend`] when built without the
/// `imageproc` feature and smoothing was requested.
#[cfg(feature = "imageproc")]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> Result<GrayImage, EdgeError> {
    if sigma <= 0.0 {
        return Ok(image.clone());
    }

    Ok(imageproc::filter::gaussian_blur_f32(image, sigma))
}

/// Apply Gaussian blur with standard deviation `sigma`.
///
/// # Errors
///
/// Always returns [`EdgeError::UnavailableBackend`] for positive sigma:
/// this build has no `imageproc` backend.
#[cfg(not(feature = "imageproc"))]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> Result<GrayImage, EdgeError> {
    if sigma <= 0.0 {
        return Ok(image.clone());
    }

    Err(EdgeError::UnavailableBackend {
        backend: crate::capability::Backend::Imageproc,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn step(width: u32) -> GrayImage {
        GrayImage::from_fn(width, 6, |x, _| {
            image::Luma([if x < width / 2 { 20 } else { 220 }])
        })
    }

    #[test]
    fn non_positive_sigma_is_identity_on_every_build() {
        let img = step(10);
        assert_eq!(gaussian_blur(&img, 0.0).unwrap(), img);
        assert_eq!(gaussian_blur(&img, -3.0).unwrap(), img);
    }

    #[cfg(not(feature = "imageproc"))]
    #[test]
    fn smoothing_needs_the_backend() {
        let err = gaussian_blur(&step(10), 1.0).unwrap_err();
        assert_eq!(
            err,
            EdgeError::UnavailableBackend {
                backend: crate::capability::Backend::Imageproc,
            }
        );
        assert!(!err.is_configuration());
    }

    #[cfg(feature = "imageproc")]
    #[test]
    fn step_profile_stays_symmetric() {
        let blurred = gaussian_blur(&step(12), 1.0).unwrap();
        assert_eq!(blurred.dimensions(), (12, 6));
        for y in 0..6 {
            let left = i16::from(blurred.get_pixel(5, y).0[0]);
            let right = i16::from(blurred.get_pixel(6, y).0[0]);
            assert!(left > 20 && right < 220, "row {y}: {left} {right}");
            // Mirror pixels around the step sum to the two levels.
            assert!((left + right - 240).abs() <= 2, "row {y}: {left} {right}");
        }
    }

    #[cfg(feature = "imageproc")]
    #[test]
    fn far_from_step_is_untouched() {
        let blurred = gaussian_blur(&step(24), 1.0).unwrap();
        assert!(blurred.get_pixel(0, 3).0[0].abs_diff(20) <= 1);
        assert!(blurred.get_pixel(23, 3).0[0].abs_diff(220) <= 1);
    }
}
