//! Canny edge detection.
//!
//! Four strictly ordered stages:
//!
//! 1. Gaussian smoothing ([`crate::blur`]).
//! 2. Sobel gradient magnitude and direction ([`crate::sobel`]).
//! 3. Non-maximum suppression along the quantized gradient direction.
//! 4. Double-threshold hysteresis with 8-connected propagation.
//!
//! Thresholds apply to the raw Sobel magnitude of `[0, 1]` intensities,
//! where a sharp black/white step responds with about 4 (the kernel gain).
//! The defaults of 0.1 and 0.3 therefore pick up mid-contrast boundaries.
//!
//! Suppression compares each pixel with its two neighbors across the
//! edge. It must be `>=` the neighbor behind it and strictly `>` the one
//! ahead of it, so a ridge two pixels wide with equal magnitudes keeps
//! exactly one pixel. The outermost image border is always suppressed.
//!
//! Hysteresis uses an explicit stack with bounds-checked neighbor
//! offsets, so propagation that reaches the border cannot underflow.

use image::Luma;
use serde::{Deserialize, Serialize};

use crate::blur;
use crate::detector::{DetectorKind, EdgeDetector};
use crate::grayscale;
use crate::sobel::{self, Gradients};
use crate::types::{EdgeError, EdgeMap, GrayBuffer, Image};

const DETECTOR: &str = "canny";

/// Configuration for [`CannyDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CannyConfig {
    sigma: f32,
    low_threshold: f32,
    high_threshold: f32,
}

impl CannyConfig {
    /// Default Gaussian standard deviation.
    pub const DEFAULT_SIGMA: f32 = 1.0;
    /// Default hysteresis low threshold.
    pub const DEFAULT_LOW_THRESHOLD: f32 = 0.1;
    /// Default hysteresis high threshold.
    pub const DEFAULT_HIGH_THRESHOLD: f32 = 0.3;

    /// Create a validated configuration.
    ///
    /// A `sigma` of 0 disables smoothing.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidConfig`] if any value is not finite,
    /// `sigma` is negative, a threshold lies outside `[0, 1]`, or
    /// `low_threshold > high_threshold`.
    pub fn new(sigma: f32, low_threshold: f32, high_threshold: f32) -> Result<Self, EdgeError> {
        let config = Self {
            sigma,
            low_threshold,
            high_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    /// Gaussian standard deviation.
    #[must_use]
    pub const fn sigma(&self) -> f32 {
        self.sigma
    }

    /// Magnitude needed to extend an existing edge.
    #[must_use]
    pub const fn low_threshold(&self) -> f32 {
        self.low_threshold
    }

    /// Magnitude needed to start an edge.
    #[must_use]
    pub const fn high_threshold(&self) -> f32 {
        self.high_threshold
    }

    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// See [`CannyConfig::new`].
    pub fn validate(&self) -> Result<(), EdgeError> {
        let Self {
            sigma,
            low_threshold: low,
            high_threshold: high,
        } = *self;

        if !sigma.is_finite() || sigma < 0.0 {
            return Err(EdgeError::config(
                DETECTOR,
                format!("sigma must be a finite non-negative number, got {sigma}"),
            ));
        }
        for (name, value) in [("low_threshold", low), ("high_threshold", high)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EdgeError::config(
                    DETECTOR,
                    format!("{name} must be within [0, 1], got {value}"),
                ));
            }
        }
        if low > high {
            return Err(EdgeError::config(
                DETECTOR,
                format!("low_threshold ({low}) exceeds high_threshold ({high})"),
            ));
        }
        Ok(())
    }
}

impl Default for CannyConfig {
    fn default() -> Self {
        Self {
            sigma: Self::DEFAULT_SIGMA,
            low_threshold: Self::DEFAULT_LOW_THRESHOLD,
            high_threshold: Self::DEFAULT_HIGH_THRESHOLD,
        }
    }
}

/// Canny edge detector. Output is binary.
#[derive(Debug, Clone, Default)]
pub struct CannyDetector {
    config: CannyConfig,
}

impl CannyDetector {
    /// Create a detector.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidConfig`] if `config` is invalid.
    pub fn new(config: CannyConfig) -> Result<Self, EdgeError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The detector's configuration.
    #[must_use]
    pub const fn config(&self) -> &CannyConfig {
        &self.config
    }
}

impl EdgeDetector for CannyDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Canny
    }

    fn detect(&self, image: &Image) -> Result<EdgeMap, EdgeError> {
        image.validate()?;
        let gray = grayscale::luma(image);
        let smoothed = blur::gaussian_blur(&gray, self.config.sigma)?;
        let gradients = sobel::sobel(&smoothed)?;
        let thinned = non_maximum_suppression(&gradients);
        // Magnitudes are in step-height units.
        let edges = hysteresis(
            &thinned,
            self.config.low_threshold / sobel::SOBEL_GAIN,
            self.config.high_threshold / sobel::SOBEL_GAIN,
        );
        Ok(EdgeMap::from_buffer(edges))
    }
}

/// Gradient direction quantized to four orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Horizontal gradient: compare left and right.
    Deg0,
    /// Compare up-left and down-right.
    Deg45,
    /// Vertical gradient: compare up and down.
    Deg90,
    /// Compare up-right and down-left.
    Deg135,
}

impl Direction {
    fn from_gradient(gx: f32, gy: f32) -> Self {
        let mut angle = gy.atan2(gx).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if angle >= 180.0 {
            angle -= 180.0;
        }

        if !(22.5..157.5).contains(&angle) {
            Self::Deg0
        } else if angle < 67.5 {
            Self::Deg45
        } else if angle < 112.5 {
            Self::Deg90
        } else {
            Self::Deg135
        }
    }

    /// Offsets of the neighbor behind and the neighbor ahead.
    const fn neighbors(self) -> [(i32, i32); 2] {
        match self {
            Self::Deg0 => [(-1, 0), (1, 0)],
            Self::Deg45 => [(-1, -1), (1, 1)],
            Self::Deg90 => [(0, -1), (0, 1)],
            Self::Deg135 => [(1, -1), (-1, 1)],
        }
    }
}

/// Thin gradient ridges to single-pixel width.
///
/// Interior pixels only; border pixels and images narrower than three
/// pixels produce zeros.
fn non_maximum_suppression(gradients: &Gradients) -> GrayBuffer {
    let magnitude = &gradients.magnitude;
    let (w, h) = magnitude.dimensions();
    let mut out = GrayBuffer::new(w, h);
    if w < 3 || h < 3 {
        return out;
    }

    // Interior pixels plus a unit offset always stay in bounds.
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let m = magnitude.get_pixel(x, y).0[0];
            if m <= 0.0 {
                continue;
            }
            let gx = gradients.gx.get_pixel(x, y).0[0];
            let gy = gradients.gy.get_pixel(x, y).0[0];
            let [behind, ahead] = Direction::from_gradient(gx, gy).neighbors().map(|(dx, dy)| {
                let nx = x.saturating_add_signed(dx);
                let ny = y.saturating_add_signed(dy);
                magnitude.get_pixel(nx, ny).0[0]
            });
            if m >= behind && m > ahead {
                out.put_pixel(x, y, Luma([m]));
            }
        }
    }
    out
}

/// Keep strong pixels and the weak pixels 8-connected to them.
///
/// A pixel seeds an edge when its magnitude is positive and at least
/// `high`; propagation continues through positive pixels at least `low`.
fn hysteresis(thinned: &GrayBuffer, low: f32, high: f32) -> GrayBuffer {
    const NEIGHBORS: [(i32, i32); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    let (w, h) = thinned.dimensions();
    let mut out = GrayBuffer::new(w, h);
    let strength = |x: u32, y: u32| thinned.get_pixel(x, y).0[0];
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let m = strength(x, y);
            if m <= 0.0 || m < high || out.get_pixel(x, y).0[0] > 0.0 {
                continue;
            }
            out.put_pixel(x, y, Luma([1.0]));
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in NEIGHBORS {
                    let (Some(nx), Some(ny)) = (cx.checked_add_signed(dx), cy.checked_add_signed(dy))
                    else {
                        continue;
                    };
                    if nx >= w || ny >= h || out.get_pixel(nx, ny).0[0] > 0.0 {
                        continue;
                    }
                    let n = strength(nx, ny);
                    if n > 0.0 && n >= low {
                        out.put_pixel(nx, ny, Luma([1.0]));
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}
