//! Run a detector at several resolutions and keep the strongest response.

use crate::detector::{DetectorKind, EdgeDetector};
use crate::resample;
use crate::types::{EdgeError, EdgeMap, Image, check_dimensions};

const DETECTOR: &str = "multi_scale";

/// Composite detector: for each scale, resize the image, run the base
/// detector, bring the edge map back to the input resolution, and keep
/// the per-pixel maximum across scales.
///
/// A scale whose rounded size equals the input size (such as `1.0`) runs
/// the base detector on the input itself, so `scales == [1.0]` is an
/// identity wrapper around `base`.
///
/// Scales are capped at [`MultiScaleDetector::MAX_SCALE`], and a scaled
/// working image may hold at most [`MultiScaleDetector::MAX_SCALED_PIXELS`]
/// pixels; larger requests fail with [`EdgeError::ImageTooLarge`].
#[derive(Debug)]
pub struct MultiScaleDetector {
    base: Box<dyn EdgeDetector>,
    scales: Vec<f32>,
}

impl MultiScaleDetector {
    /// Largest accepted scale factor.
    pub const MAX_SCALE: f32 = 8.0;

    /// Largest pixel count of a resized working image (64 megapixels).
    pub const MAX_SCALED_PIXELS: u64 = 1 << 26;

    /// Wrap `base` with the given scale factors.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidConfig`] if `scales` is empty or holds a
    /// value that is not positive and finite, or above [`Self::MAX_SCALE`].
    pub fn new(base: Box<dyn EdgeDetector>, scales: Vec<f32>) -> Result<Self, EdgeError> {
        if scales.is_empty() {
            return Err(EdgeError::config(DETECTOR, "scales must not be empty"));
        }
        if let Some(bad) = scales.iter().find(|s| !s.is_finite() || **s <= 0.0) {
            return Err(EdgeError::config(
                DETECTOR,
                format!("scales must be positive and finite, got {bad}"),
            ));
        }
        if let Some(big) = scales.iter().find(|s| **s > Self::MAX_SCALE) {
            return Err(EdgeError::config(
                DETECTOR,
                format!("scales must not exceed {}, got {big}", Self::MAX_SCALE),
            ));
        }
        Ok(Self { base, scales })
    }

    /// The wrapped detector.
    #[must_use]
    pub fn base(&self) -> &dyn EdgeDetector {
        self.base.as_ref()
    }

    /// Scale factors, in evaluation order.
    #[must_use]
    pub fn scales(&self) -> &[f32] {
        &self.scales
    }
}

impl EdgeDetector for MultiScaleDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::MultiScale
    }

    fn detect(&self, image: &Image) -> Result<EdgeMap, EdgeError> {
        let original = image.validate()?;
        let mut combined = EdgeMap::new(original);

        for &scale in &self.scales {
            let target = resample::scaled_dimensions(original, scale);
            let edges = if target == original {
                self.base.detect(image)?
            } else {
                if target.pixel_count() > Self::MAX_SCALED_PIXELS {
                    return Err(EdgeError::ImageTooLarge {
                        dimensions: target,
                        limit: Self::MAX_SCALED_PIXELS,
                    });
                }
                let scaled = resample::resize_image(image, target);
                let edges = self.base.detect(&scaled)?;
                check_dimensions(target, edges.dimensions())?;
                resample::resize_nearest(&edges, original)
            };
            log::trace!(
                "{} at scale {scale}: {} edge pixels",
                self.base.kind(),
                edges.edge_pixel_count()
            );
            combined.max_assign(&edges)?;
        }

        Ok(combined)
    }
}
