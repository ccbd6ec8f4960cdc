//! Weighted blend of two detectors.

use std::fmt;

use image::Luma;
use serde::{Deserialize, Serialize};

use crate::detector::{DetectorKind, EdgeDetector};
use crate::grayscale;
use crate::types::{EdgeError, EdgeMap, GrayBuffer, Image, check_dimensions};

const DETECTOR: &str = "hybrid";

/// How a [`HybridDetector`] turns the blended map into its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HybridOutput {
    /// Edge (1.0) where the blend is at least [`HybridDetector::BINARY_CUTOFF`].
    #[default]
    Binary,
    /// The blend stretched to the full `[0, 1]` range, softened with
    /// [`grayscale::smooth`] and stretched again.
    Continuous,
}

impl fmt::Display for HybridOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => f.write_str("binary"),
            Self::Continuous => f.write_str("continuous"),
        }
    }
}

/// Composite detector computing `w * primary + (1 - w) * secondary`.
///
/// At `w == 1.0` the primary map is returned as is and the secondary
/// detector never runs; at `w == 0.0` the reverse holds.
#[derive(Debug)]
pub struct HybridDetector {
    primary: Box<dyn EdgeDetector>,
    secondary: Box<dyn EdgeDetector>,
    combine_weight: f32,
    output: HybridOutput,
}

impl HybridDetector {
    /// Default weight of the primary detector.
    pub const DEFAULT_COMBINE_WEIGHT: f32 = 0.7;

    /// Blend value at or above which [`HybridOutput::Binary`] marks an
    /// edge.
    pub const BINARY_CUTOFF: f32 = 0.5;

    /// Blend two detectors with binary output.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidConfig`] unless `combine_weight` is a
    /// finite value in `[0, 1]`.
    pub fn new(
        primary: Box<dyn EdgeDetector>,
        secondary: Box<dyn EdgeDetector>,
        combine_weight: f32,
    ) -> Result<Self, EdgeError> {
        if !(0.0..=1.0).contains(&combine_weight) {
            return Err(EdgeError::config(
                DETECTOR,
                format!("combine_weight must be within [0, 1], got {combine_weight}"),
            ));
        }
        Ok(Self {
            primary,
            secondary,
            combine_weight,
            output: HybridOutput::default(),
        })
    }

    /// Select the output mode.
    #[must_use]
    pub fn with_output(mut self, output: HybridOutput) -> Self {
        self.output = output;
        self
    }

    /// Weight of the primary detector.
    #[must_use]
    pub const fn combine_weight(&self) -> f32 {
        self.combine_weight
    }

    /// The output mode.
    #[must_use]
    pub const fn output(&self) -> HybridOutput {
        self.output
    }
}

fn run(detector: &dyn EdgeDetector, image: &Image) -> Result<EdgeMap, EdgeError> {
    let edges = detector.detect(image)?;
    check_dimensions(image.dimensions(), edges.dimensions())?;
    Ok(edges)
}

impl EdgeDetector for HybridDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Hybrid
    }

    #[allow(clippy::float_cmp)]
    fn detect(&self, image: &Image) -> Result<EdgeMap, EdgeError> {
        image.validate()?;
        let w = self.combine_weight;
        if w == 1.0 {
            return run(self.primary.as_ref(), image);
        }
        if w == 0.0 {
            return run(self.secondary.as_ref(), image);
        }

        let primary = run(self.primary.as_ref(), image)?;
        let secondary = run(self.secondary.as_ref(), image)?;

        let dims = primary.dimensions();
        let (p, s) = (primary.values(), secondary.values());
        let blended: Vec<f32> = p
            .iter()
            .zip(s)
            .map(|(&p, &s)| w.mul_add(p, (1.0 - w) * s))
            .collect();
        let blended = GrayBuffer::from_raw(dims.width, dims.height, blended).ok_or(
            EdgeError::DimensionMismatch {
                expected: dims,
                actual: secondary.dimensions(),
            },
        )?;

        let out = match self.output {
            HybridOutput::Binary => {
                let cutoff = Self::BINARY_CUTOFF;
                GrayBuffer::from_fn(dims.width, dims.height, |x, y| {
                    Luma([if blended.get_pixel(x, y).0[0] >= cutoff { 1.0 } else { 0.0 }])
                })
            }
            HybridOutput::Continuous => {
                let stretched = grayscale::stretch_contrast(blended);
                grayscale::stretch_contrast(grayscale::smooth(&stretched))
            }
        };
        Ok(EdgeMap::from_buffer(out))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::types::{Dimensions, GrayImage};

    /// Returns a fixed map and counts how often it runs.
    #[derive(Debug)]
    struct Fixed {
        values: Vec<f32>,
        calls: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn boxed(values: &[f32]) -> (Box<dyn EdgeDetector>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let detector = Self {
                values: values.to_vec(),
                calls: Arc::clone(&calls),
            };
            (Box::new(detector), calls)
        }
    }

    impl EdgeDetector for Fixed {
        fn kind(&self) -> DetectorKind {
            DetectorKind::Baseline
        }

        fn detect(&self, _image: &Image) -> Result<EdgeMap, EdgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let width = u32::try_from(self.values.len()).unwrap();
            let buffer = GrayBuffer::from_raw(width, 1, self.values.clone()).unwrap();
            Ok(EdgeMap::from_buffer(buffer))
        }
    }

    fn image(width: u32) -> Image {
        Image::Gray(GrayImage::new(width, 1))
    }

    #[test]
    fn rejects_out_of_range_weight() {
        for w in [-0.1, 1.1, f32::NAN] {
            let (p, _) = Fixed::boxed(&[0.0]);
            let (s, _) = Fixed::boxed(&[0.0]);
            assert!(HybridDetector::new(p, s, w).unwrap_err().is_configuration());
        }
    }

    #[test]
    fn weight_one_returns_primary_only() {
        let (p, p_calls) = Fixed::boxed(&[0.2, 1.0, 0.0]);
        let (s, s_calls) = Fixed::boxed(&[1.0, 1.0, 1.0]);
        let edges = HybridDetector::new(p, s, 1.0)
            .unwrap()
            .with_output(HybridOutput::Continuous)
            .detect(&image(3))
            .unwrap();
        assert_eq!(edges.values(), &[0.2, 1.0, 0.0]);
        assert_eq!(p_calls.load(Ordering::SeqCst), 1);
        assert_eq!(s_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn weight_zero_returns_secondary_only() {
        let (p, p_calls) = Fixed::boxed(&[1.0, 1.0]);
        let (s, _) = Fixed::boxed(&[0.3, 0.0]);
        let edges = HybridDetector::new(p, s, 0.0)
            .unwrap()
            .detect(&image(2))
            .unwrap();
        assert_eq!(edges.values(), &[0.3, 0.0]);
        assert_eq!(p_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn binary_blend_uses_inclusive_cutoff() {
        // Blends: 0.5, 0.5, 1.0, 0.0 at w = 0.5.
        let (p, _) = Fixed::boxed(&[1.0, 0.0, 1.0, 0.0]);
        let (s, _) = Fixed::boxed(&[0.0, 1.0, 1.0, 0.0]);
        let edges = HybridDetector::new(p, s, 0.5)
            .unwrap()
            .detect(&image(4))
            .unwrap();
        assert_eq!(edges.values(), &[1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn binary_blend_favors_heavier_detector() {
        let (p, _) = Fixed::boxed(&[1.0, 0.0]);
        let (s, _) = Fixed::boxed(&[0.0, 1.0]);
        let edges = HybridDetector::new(p, s, HybridDetector::DEFAULT_COMBINE_WEIGHT)
            .unwrap()
            .detect(&image(2))
            .unwrap();
        assert_eq!(edges.values(), &[1.0, 0.0]);
    }

    #[test]
    fn continuous_blend_is_stretched() {
        let (p, _) = Fixed::boxed(&[1.0, 0.0, 0.0]);
        let (s, _) = Fixed::boxed(&[1.0, 1.0, 0.0]);
        let edges = HybridDetector::new(p, s, 0.5)
            .unwrap()
            .with_output(HybridOutput::Continuous)
            .detect(&image(3))
            .unwrap();
        let expected = [1.0, 0.5, 0.0];
        for (v, e) in edges.values().iter().zip(expected) {
            assert!((v - e).abs() < 1e-5, "{:?}", edges.values());
        }
    }

    #[test]
    fn continuous_blend_softens_isolated_response() {
        let spike = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let (p, _) = Fixed::boxed(&spike);
        let (s, _) = Fixed::boxed(&spike);
        let edges = HybridDetector::new(p, s, 0.5)
            .unwrap()
            .with_output(HybridOutput::Continuous)
            .detect(&image(7))
            .unwrap();
        let values = edges.values();
        assert_eq!(values[0], 0.0);
        assert!((values[3] - 1.0).abs() < 1e-6);
        // Neighbors pick up part of the peak; the far end stays dark.
        assert!(values[2] > 0.2 && values[2] < 0.5, "{values:?}");
        assert!(values[1] > 0.0 && values[1] < values[2], "{values:?}");
    }

    #[test]
    fn continuous_flat_blend_stays_zero() {
        let (p, _) = Fixed::boxed(&[0.0, 0.0]);
        let (s, _) = Fixed::boxed(&[0.0, 0.0]);
        let edges = HybridDetector::new(p, s, 0.5)
            .unwrap()
            .with_output(HybridOutput::Continuous)
            .detect(&image(2))
            .unwrap();
        assert!(!edges.has_edges());
    }

    #[test]
    fn mismatched_inner_dimensions_are_reported() {
        let (p, _) = Fixed::boxed(&[0.0, 0.0]);
        let (s, _) = Fixed::boxed(&[0.0, 0.0]);
        let err = HybridDetector::new(p, s, 0.5)
            .unwrap()
            .detect(&image(5))
            .unwrap_err();
        assert_eq!(
            err,
            EdgeError::DimensionMismatch {
                expected: Dimensions::new(5, 1),
                actual: Dimensions::new(2, 1),
            }
        );
    }
}
