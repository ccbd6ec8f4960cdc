//! Sobel gradient magnitude thresholding.

use image::Luma;
use serde::{Deserialize, Serialize};

use crate::detector::{DetectorKind, EdgeDetector};
use crate::grayscale;
use crate::sobel;
use crate::types::{EdgeError, EdgeMap, GrayBuffer, Image};

const DETECTOR: &str = "gradient";

/// Configuration for [`GradientDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientConfig {
    threshold: f32,
    normalize: bool,
}

impl GradientConfig {
    /// Default magnitude cutoff.
    pub const DEFAULT_THRESHOLD: f32 = 30.0 / 255.0;

    /// Configuration with the given magnitude cutoff and peak
    /// normalization enabled.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidConfig`] if `threshold` is negative or
    /// not finite.
    pub fn new(threshold: f32) -> Result<Self, EdgeError> {
        let config = Self {
            threshold,
            normalize: true,
        };
        config.validate()?;
        Ok(config)
    }

    /// Enable or disable division by the peak magnitude.
    #[must_use]
    pub const fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Magnitude cutoff (strict).
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether magnitudes are divided by the image's peak magnitude.
    #[must_use]
    pub const fn normalize(&self) -> bool {
        self.normalize
    }

    /// Check the configuration. Needed for values that bypassed
    /// [`GradientConfig::new`], such as deserialized ones.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidConfig`] if the threshold is negative
    /// or not finite.
    pub fn validate(&self) -> Result<(), EdgeError> {
        if !self.threshold.is_finite() {
            return Err(EdgeError::config(
                DETECTOR,
                format!("threshold must be finite, got {}", self.threshold),
            ));
        }
        if self.threshold < 0.0 {
            return Err(EdgeError::config(
                DETECTOR,
                format!("threshold must be non-negative, got {}", self.threshold),
            ));
        }
        Ok(())
    }
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            normalize: true,
        }
    }
}

/// Marks pixels whose Sobel gradient magnitude reaches a cutoff.
///
/// Magnitudes are in step-height units (a full black/white step is 1).
/// With normalization on, they are first divided by the image's peak
/// magnitude, so the cutoff is relative to the strongest edge. A uniform
/// image has peak 0 and produces no edges; zero magnitude is never an
/// edge, even with a zero cutoff. Output is binary.
#[derive(Debug, Clone, Default)]
pub struct GradientDetector {
    config: GradientConfig,
}

impl GradientDetector {
    /// Create a detector.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidConfig`] if `config` is invalid.
    pub fn new(config: GradientConfig) -> Result<Self, EdgeError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The detector's configuration.
    #[must_use]
    pub const fn config(&self) -> &GradientConfig {
        &self.config
    }
}

impl EdgeDetector for GradientDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Gradient
    }

    fn detect(&self, image: &Image) -> Result<EdgeMap, EdgeError> {
        image.validate()?;
        let gray = grayscale::luma(image);
        let gradients = sobel::sobel(&gray)?;

        let peak = gradients.peak();
        // Divide rather than multiply by the reciprocal so the peak maps to
        // exactly 1.
        let divisor = if self.config.normalize && peak > 0.0 {
            peak
        } else {
            1.0
        };

        let magnitude = &gradients.magnitude;
        let threshold = self.config.threshold;
        let edges = GrayBuffer::from_fn(magnitude.width(), magnitude.height(), |x, y| {
            let m = magnitude.get_pixel(x, y).0[0] / divisor;
            Luma([if m > 0.0 && m >= threshold { 1.0 } else { 0.0 }])
        });
        Ok(EdgeMap::from_buffer(edges))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_threshold() {
        let err = GradientConfig::new(-0.1).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn rejects_nan_threshold() {
        assert!(GradientConfig::new(f32::NAN).is_err());
        assert!(GradientConfig::new(f32::INFINITY).is_err());
    }

    #[test]
    fn zero_threshold_is_valid() {
        assert!(GradientConfig::new(0.0).is_ok());
    }

    #[test]
    fn deserialized_config_is_validated() {
        let config: GradientConfig = serde_json::from_str(r#"{"threshold": -1.0}"#).unwrap();
        assert!(GradientDetector::new(config).is_err());
    }

    #[cfg(feature = "imageproc")]
    mod detect {
        use super::*;
        use crate::types::GrayImage;

        fn step_image() -> Image {
            Image::Gray(GrayImage::from_fn(12, 8, |x, _| {
                Luma([if x < 6 { 40 } else { 200 }])
            }))
        }

        #[test]
        fn uniform_image_has_no_edges() {
            let img = Image::Gray(GrayImage::from_pixel(16, 16, Luma([90])));
            let edges = GradientDetector::default().detect(&img).unwrap();
            assert!(!edges.has_edges());
        }

        #[test]
        fn step_marks_two_columns() {
            let edges = GradientDetector::default().detect(&step_image()).unwrap();
            assert!(edges.is_binary());
            for y in 0..8 {
                assert_eq!(edges.value(4, y), Some(0.0));
                assert_eq!(edges.value(5, y), Some(1.0));
                assert_eq!(edges.value(6, y), Some(1.0));
                assert_eq!(edges.value(7, y), Some(0.0));
            }
        }

        #[test]
        fn unit_cutoff_keeps_peak_when_normalized() {
            let detector = GradientDetector::new(GradientConfig::new(1.0).unwrap()).unwrap();
            let edges = detector.detect(&step_image()).unwrap();
            for y in 0..8 {
                assert_eq!(edges.value(5, y), Some(1.0));
                assert_eq!(edges.value(6, y), Some(1.0));
            }
            assert_eq!(edges.edge_pixel_count(), 16);
        }

        #[test]
        fn zero_cutoff_skips_flat_pixels() {
            let detector = GradientDetector::new(GradientConfig::new(0.0).unwrap()).unwrap();
            let edges = detector.detect(&step_image()).unwrap();
            assert_eq!(edges.edge_pixel_count(), 16);
        }

        #[test]
        fn normalization_makes_cutoff_relative() {
            // Step height 160/255 is about 0.63. Without normalization a
            // cutoff of 0.7 rejects it; with normalization the peak is 1.
            let config = GradientConfig::new(0.7).unwrap();
            let normalized = GradientDetector::new(config).unwrap();
            assert!(normalized.detect(&step_image()).unwrap().has_edges());

            let absolute = GradientDetector::new(config.with_normalize(false)).unwrap();
            assert!(!absolute.detect(&step_image()).unwrap().has_edges());
        }
    }
}
