//! The edge detector capability shared by every strategy.
//!
//! # Strategy pattern
//!
//! Leaf detectors ([`BaselineDetector`](crate::BaselineDetector),
//! [`GradientDetector`](crate::GradientDetector),
//! [`CannyDetector`](crate::CannyDetector)) and composites
//! ([`MultiScaleDetector`](crate::MultiScaleDetector),
//! [`HybridDetector`](crate::HybridDetector)) all implement
//! [`EdgeDetector`]. Composites hold boxed trait objects, so any detector
//! can be nested inside any composite.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capability::Backend;
use crate::types::{EdgeError, EdgeMap, Image};

/// Identifies a detector strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Forward-difference contrast threshold; no numeric backend.
    Baseline,
    /// Sobel gradient magnitude threshold.
    Gradient,
    /// Smoothing, Sobel, non-maximum suppression and hysteresis.
    Canny,
    /// A base detector run at several resolutions.
    MultiScale,
    /// Weighted blend of two detectors.
    Hybrid,
}

impl DetectorKind {
    /// Every detector kind, leaves first.
    pub const ALL: [Self; 5] = [
        Self::Baseline,
        Self::Gradient,
        Self::Canny,
        Self::MultiScale,
        Self::Hybrid,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Gradient => "gradient",
            Self::Canny => "canny",
            Self::MultiScale => "multi_scale",
            Self::Hybrid => "hybrid",
        }
    }

    /// Numeric backend the detector's own computation depends on.
    ///
    /// Composites only orchestrate other detectors and resample with the
    /// `image` crate, so they report [`Backend::Builtin`].
    #[must_use]
    pub const fn backend(self) -> Backend {
        match self {
            Self::Gradient | Self::Canny => Backend::Imageproc,
            Self::Baseline | Self::MultiScale | Self::Hybrid => Backend::Builtin,
        }
    }

    /// Next-best leaf detector when this one is unavailable.
    ///
    /// The chain is `Canny -> Gradient -> Baseline`.
    #[must_use]
    pub const fn fallback(self) -> Option<Self> {
        match self {
            Self::Canny => Some(Self::Gradient),
            Self::Gradient => Some(Self::Baseline),
            Self::Baseline | Self::MultiScale | Self::Hybrid => None,
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Produces an edge map from an image.
///
/// Implementations must be pure: the same image and configuration give a
/// bit-identical [`EdgeMap`] with the image's dimensions, and `detect`
/// touches no shared mutable state. Detectors can therefore be shared
/// across threads and called concurrently.
pub trait EdgeDetector: fmt::Debug + Send + Sync {
    /// Which strategy this detector implements.
    fn kind(&self) -> DetectorKind;

    /// Detect edges in `image`.
    ///
    /// # Errors
    ///
    /// Returns an input error ([`EdgeError::is_input`]) for malformed
    /// images, or [`EdgeError::UnavailableBackend`] if the detector's
    /// numeric backend is missing from this build.
    fn detect(&self, image: &Image) -> Result<EdgeMap, EdgeError>;
}

impl<D: EdgeDetector + ?Sized> EdgeDetector for Box<D> {
    fn kind(&self) -> DetectorKind {
        (**self).kind()
    }

    fn detect(&self, image: &Image) -> Result<EdgeMap, EdgeError> {
        (**self).detect(image)
    }
}
