//! Shared types for the ctrlmap edge-detection pipeline.

use image::{DynamicImage, ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

use crate::capability::Backend;

/// Re-export `GrayImage` so callers can build single-channel inputs
/// without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so callers can build three-channel inputs and
/// consume RGB control maps without depending on `image` directly.
pub use image::RgbImage;

/// Normalized grayscale intensities in `[0, 1]`.
///
/// Produced from an [`Image`] by luminance conversion and scoped to a
/// single detection call.
pub type GrayBuffer = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create a new dimensions value.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An 8-bit input image with one (gray) or three (RGB) channels.
///
/// Owned by the caller; detectors only ever read it.
#[derive(Debug, Clone, PartialEq)]
pub enum Image {
    /// Single-channel luminance image.
    Gray(GrayImage),
    /// Three-channel RGB image.
    Rgb(RgbImage),
}

impl Image {
    /// Build an image from a raw, row-major, interleaved byte buffer.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::UnsupportedColor`] unless `channels` is 1 or 3,
    /// [`EdgeError::EmptyImage`] if either dimension is zero, and
    /// [`EdgeError::BufferSize`] if `data` does not hold exactly
    /// `width * height * channels` bytes.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, EdgeError> {
        if channels != 1 && channels != 3 {
            return Err(EdgeError::UnsupportedColor(format!("{channels} channels")));
        }
        if width == 0 || height == 0 {
            return Err(EdgeError::EmptyImage { width, height });
        }

        let expected = Dimensions::new(width, height).pixel_count() * u64::from(channels);
        let actual = data.len() as u64;
        let buffer_size = EdgeError::BufferSize { expected, actual };

        if channels == 1 {
            GrayImage::from_raw(width, height, data)
                .map(Self::Gray)
                .ok_or(buffer_size)
        } else {
            RgbImage::from_raw(width, height, data)
                .map(Self::Rgb)
                .ok_or(buffer_size)
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Gray(img) => img.width(),
            Self::Rgb(img) => img.width(),
        }
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Gray(img) => img.height(),
            Self::Rgb(img) => img.height(),
        }
    }

    /// Width and height in pixels.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    /// Number of 8-bit channels per pixel (1 or 3).
    #[must_use]
    pub const fn channels(&self) -> u8 {
        match self {
            Self::Gray(_) => 1,
            Self::Rgb(_) => 3,
        }
    }

    /// Check that the image can be processed and return its dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::EmptyImage`] if either dimension is zero.
    pub fn validate(&self) -> Result<Dimensions, EdgeError> {
        let dimensions = self.dimensions();
        if dimensions.is_empty() {
            return Err(EdgeError::EmptyImage {
                width: dimensions.width,
                height: dimensions.height,
            });
        }
        Ok(dimensions)
    }
}

impl From<GrayImage> for Image {
    fn from(image: GrayImage) -> Self {
        Self::Gray(image)
    }
}

impl From<RgbImage> for Image {
    fn from(image: RgbImage) -> Self {
        Self::Rgb(image)
    }
}

impl TryFrom<DynamicImage> for Image {
    type Error = EdgeError;

    /// Accepts `Luma8` and `Rgb8` images. Other layouts (alpha, 16-bit,
    /// float) must be converted by the caller, e.g. with
    /// [`DynamicImage::to_rgb8`].
    fn try_from(image: DynamicImage) -> Result<Self, Self::Error> {
        match image {
            DynamicImage::ImageLuma8(gray) => Ok(Self::Gray(gray)),
            DynamicImage::ImageRgb8(rgb) => Ok(Self::Rgb(rgb)),
            other => Err(EdgeError::UnsupportedColor(format!("{:?}", other.color()))),
        }
    }
}

/// Single-channel edge map with the same dimensions as its source image.
///
/// Values are either binary (`0.0` / `1.0`) or continuous in `[0, 1]`,
/// depending on the detector that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMap(GrayBuffer);

impl EdgeMap {
    /// An all-zero edge map.
    #[must_use]
    pub fn new(dimensions: Dimensions) -> Self {
        Self(GrayBuffer::new(dimensions.width, dimensions.height))
    }

    /// Wrap an existing buffer. Values are expected to lie in `[0, 1]`.
    #[must_use]
    pub const fn from_buffer(buffer: GrayBuffer) -> Self {
        Self(buffer)
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Width and height in pixels.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    /// Edge strength at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn value(&self, x: u32, y: u32) -> Option<f32> {
        self.0.get_pixel_checked(x, y).map(|p| p.0[0])
    }

    /// Row-major edge strengths.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        self.0.as_raw()
    }

    /// Borrow the underlying buffer.
    #[must_use]
    pub const fn as_buffer(&self) -> &GrayBuffer {
        &self.0
    }

    /// Consume the map and return the underlying buffer.
    #[must_use]
    pub fn into_buffer(self) -> GrayBuffer {
        self.0
    }

    /// Number of pixels with a non-zero edge value.
    #[must_use]
    pub fn edge_pixel_count(&self) -> u64 {
        self.values().iter().map(|&v| u64::from(v > 0.0)).sum()
    }

    /// Returns `true` if any pixel carries an edge.
    #[must_use]
    pub fn has_edges(&self) -> bool {
        self.values().iter().any(|&v| v > 0.0)
    }

    /// Returns `true` if every value is exactly `0.0` or `1.0`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_binary(&self) -> bool {
        self.values().iter().all(|&v| v == 0.0 || v == 1.0)
    }

    /// Convert to an 8-bit grayscale image (`1.0` maps to 255).
    #[must_use]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            image::Luma([to_u8(self.0.get_pixel(x, y).0[0])])
        })
    }

    /// Convert to the three-channel control-map format expected by
    /// conditioning models: every channel carries the edge value.
    #[must_use]
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width(), self.height(), |x, y| {
            let v = to_u8(self.0.get_pixel(x, y).0[0]);
            image::Rgb([v, v, v])
        })
    }

    /// Per-pixel maximum with `other`, in place.
    pub(crate) fn max_assign(&mut self, other: &Self) -> Result<(), EdgeError> {
        check_dimensions(self.dimensions(), other.dimensions())?;
        for (acc, &v) in self.0.iter_mut().zip(other.values()) {
            *acc = acc.max(v);
        }
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Fail unless an intermediate edge map matches the expected dimensions.
pub(crate) fn check_dimensions(expected: Dimensions, actual: Dimensions) -> Result<(), EdgeError> {
    if expected == actual {
        Ok(())
    } else {
        Err(EdgeError::DimensionMismatch { expected, actual })
    }
}

/// Errors that can occur while configuring or running a detector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EdgeError {
    /// A detector parameter is out of range.
    #[error("invalid {detector} configuration: {reason}")]
    InvalidConfig {
        /// Detector whose configuration was rejected.
        detector: &'static str,
        /// Human-readable description of the violated constraint.
        reason: String,
    },

    /// The requested preset name is not registered.
    #[error("unknown preset `{0}` (expected one of: fast, balanced, high, ultra)")]
    UnknownPreset(String),

    /// A numeric backend required by a detector is not available.
    #[error("the `{backend}` backend is not available in this build")]
    UnavailableBackend {
        /// The missing backend.
        backend: Backend,
    },

    /// The input image has a zero dimension.
    #[error("input image is empty ({width}x{height})")]
    EmptyImage {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },

    /// The input image layout is not 8-bit gray or 8-bit RGB.
    #[error("unsupported image format: {0}")]
    UnsupportedColor(String),

    /// A raw pixel buffer has the wrong length.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize {
        /// Bytes implied by the dimensions and channel count.
        expected: u64,
        /// Bytes actually supplied.
        actual: u64,
    },

    /// A resized working image would exceed the pixel limit.
    #[error(
        "scaled image {}x{} exceeds the limit of {limit} pixels",
        .dimensions.width,
        .dimensions.height
    )]
    ImageTooLarge {
        /// Requested working size.
        dimensions: Dimensions,
        /// Maximum pixel count.
        limit: u64,
    },

    /// A nested detector returned an edge map of the wrong size.
    #[error(
        "edge map is {}x{}, expected {}x{}",
        .actual.width,
        .actual.height,
        .expected.width,
        .expected.height
    )]
    DimensionMismatch {
        /// Dimensions of the input image.
        expected: Dimensions,
        /// Dimensions of the returned edge map.
        actual: Dimensions,
    },
}

impl EdgeError {
    /// Build an [`EdgeError::InvalidConfig`].
    pub(crate) fn config(detector: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            detector,
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors raised while constructing a detector or
    /// resolving a preset.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. } | Self::UnknownPreset(_))
    }

    /// Returns `true` for errors caused by a malformed input image.
    #[must_use]
    pub const fn is_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyImage { .. }
                | Self::UnsupportedColor(_)
                | Self::BufferSize { .. }
                | Self::ImageTooLarge { .. }
        )
    }
}
