//! ctrlmap-edges: edge maps for conditioning image generators (sans-IO).
//!
//! Turns an in-memory 8-bit gray or RGB image into an [`EdgeMap`]: a
//! single-channel `f32` grid the size of the input, either binary or
//! continuous in `[0, 1]`. [`EdgeMap::to_rgb_image`] produces the
//! three-channel control map format.
//!
//! Detectors:
//!
//! - [`BaselineDetector`]: forward-difference contrast threshold. No
//!   numeric backend, so it always works.
//! - [`GradientDetector`]: Sobel magnitude threshold.
//! - [`CannyDetector`]: smoothing, Sobel, non-maximum suppression and
//!   hysteresis.
//! - [`MultiScaleDetector`]: any detector at several resolutions.
//! - [`HybridDetector`]: weighted blend of two detectors.
//!
//! Most callers pick a named [`Preset`] through [`resolve`], which swaps
//! detectors whose backend is missing for the next-best one instead of
//! failing. See [`capability`] for how backend availability is decided.
//!
//! This crate has **no I/O dependencies**. Decoding files and writing
//! control maps lives in `ctrlmap-bench`.

pub mod baseline;
pub mod blur;
pub mod canny;
pub mod capability;
pub mod detector;
pub mod diagnostics;
pub mod gradient;
pub mod grayscale;
pub mod hybrid;
pub mod multiscale;
pub mod registry;
pub mod resample;
pub mod sobel;
pub mod types;

pub use baseline::{BaselineConfig, BaselineDetector};
pub use canny::{CannyConfig, CannyDetector};
pub use capability::{Backend, BackendStatus, Capabilities, capabilities, self_check};
pub use detector::{DetectorKind, EdgeDetector};
pub use diagnostics::{Clock, DetectionDiagnostics, detect_with_diagnostics};
pub use gradient::{GradientConfig, GradientDetector};
pub use hybrid::{HybridDetector, HybridOutput};
pub use multiscale::MultiScaleDetector;
pub use registry::{DetectorSpec, Preset, Registry, Resolved, Substitution};
pub use types::{Dimensions, EdgeError, EdgeMap, GrayBuffer, GrayImage, Image, RgbImage};

/// Build the detector for a preset name (`fast`, `balanced`, `high`,
/// `ultra`; case-insensitive).
///
/// Uses the process-wide capability table. Detectors whose backend is
/// unavailable are replaced along `Canny -> Gradient -> Baseline`, with a
/// warning logged for each replacement.
///
/// # Errors
///
/// Returns [`EdgeError::UnknownPreset`] for an unrecognized name.
pub fn resolve(preset: &str) -> Result<Box<dyn EdgeDetector>, EdgeError> {
    Registry::new().resolve(preset)
}
