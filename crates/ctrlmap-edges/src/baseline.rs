//! Backend-free contrast threshold detector.
//!
//! The detector of last resort: it needs nothing beyond this crate, so
//! capability fallback always ends here.

use image::Luma;
use serde::{Deserialize, Serialize};

use crate::detector::{DetectorKind, EdgeDetector};
use crate::grayscale;
use crate::types::{EdgeError, EdgeMap, GrayBuffer, Image};

/// Configuration for [`BaselineDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Contrast cutoff on the 0-255 scale. A pixel is an edge when its
    /// contrast, scaled to 0-255, is strictly greater than this.
    pub threshold: u8,
    /// Stretch the contrast map to the full range before thresholding.
    pub autocontrast: bool,
}

impl BaselineConfig {
    /// Default contrast cutoff.
    pub const DEFAULT_THRESHOLD: u8 = 128;

    /// Configuration with the given cutoff and auto-contrast enabled.
    #[must_use]
    pub const fn new(threshold: u8) -> Self {
        Self {
            threshold,
            autocontrast: true,
        }
    }

    /// Enable or disable auto-contrast.
    #[must_use]
    pub const fn with_autocontrast(mut self, autocontrast: bool) -> Self {
        self.autocontrast = autocontrast;
        self
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

/// Thresholds local contrast from forward differences.
///
/// Contrast at `(x, y)` is the larger of `|I(x+1, y) - I(x, y)|` and
/// `|I(x, y+1) - I(x, y)|` on normalized intensities. The last column
/// and row have no forward neighbor; the border is replicated, so their
/// difference is zero. Output is binary.
#[derive(Debug, Clone, Default)]
pub struct BaselineDetector {
    config: BaselineConfig,
}

impl BaselineDetector {
    /// Create a detector. Every `u8` cutoff is valid, so this cannot fail.
    #[must_use]
    pub const fn new(config: BaselineConfig) -> Self {
        Self { config }
    }

    /// The detector's configuration.
    #[must_use]
    pub const fn config(&self) -> &BaselineConfig {
        &self.config
    }
}

impl EdgeDetector for BaselineDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Baseline
    }

    fn detect(&self, image: &Image) -> Result<EdgeMap, EdgeError> {
        image.validate()?;
        let gray = grayscale::normalized(image);

        let mut contrast = forward_contrast(&gray);
        if self.config.autocontrast {
            contrast = grayscale::stretch_contrast(contrast);
        }

        let cutoff = f32::from(self.config.threshold);
        let edges = GrayBuffer::from_fn(contrast.width(), contrast.height(), |x, y| {
            let c = contrast.get_pixel(x, y).0[0] * 255.0;
            Luma([if c > cutoff { 1.0 } else { 0.0 }])
        });
        Ok(EdgeMap::from_buffer(edges))
    }
}

fn forward_contrast(gray: &GrayBuffer) -> GrayBuffer {
    let (w, h) = gray.dimensions();
    GrayBuffer::from_fn(w, h, |x, y| {
        let here = gray.get_pixel(x, y).0[0];
        let right = gray.get_pixel((x + 1).min(w - 1), y).0[0];
        let below = gray.get_pixel(x, (y + 1).min(h - 1)).0[0];
        Luma([(right - here).abs().max((below - here).abs())])
    })
}
