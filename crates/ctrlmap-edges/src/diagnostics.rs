//! Detection diagnostics: timing and edge statistics for a single run.
//!
//! The library never reads the system clock itself. Callers pass a
//! [`Clock`], so the same code works natively, in tests with a fake
//! clock, and on targets without `std::time::Instant`.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detector::{DetectorKind, EdgeDetector};
use crate::types::{EdgeError, EdgeMap, Image};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of monotonic timestamps.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from one `detect` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionDiagnostics {
    /// Root detector kind.
    pub detector: DetectorKind,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Wall-clock duration of the call (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Pixels with a non-zero edge value.
    pub edge_pixel_count: u64,
    /// Total pixel count (`width * height`).
    pub pixel_count: u64,
    /// Whether every value was exactly 0 or 1.
    pub binary: bool,
}

impl DetectionDiagnostics {
    /// Fraction of pixels carrying an edge, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn edge_density(&self) -> f64 {
        if self.pixel_count == 0 {
            0.0
        } else {
            self.edge_pixel_count as f64 / self.pixel_count as f64
        }
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let output = if self.binary { "binary" } else { "continuous" };
        [
            format!("Edge Detection Report\n{}", "=".repeat(60)),
            format!("Detector: {}", self.detector),
            format!(
                "Image: {}x{} ({} pixels)",
                self.width, self.height, self.pixel_count
            ),
            format!("Duration: {:.3}ms", duration_ms(self.duration)),
            format!(
                "Edges: {} ({:.1}%, {output})",
                self.edge_pixel_count,
                self.edge_density() * 100.0
            ),
        ]
        .join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Run `detector` on `image`, timing the call with `clock`.
///
/// # Errors
///
/// Propagates any error from the detector.
pub fn detect_with_diagnostics<D, C>(
    detector: &D,
    image: &Image,
    clock: &C,
) -> Result<(EdgeMap, DetectionDiagnostics), EdgeError>
where
    D: EdgeDetector + ?Sized,
    C: Clock,
{
    let start = clock.now();
    let edges = detector.detect(image)?;
    let duration = clock.elapsed(&start);

    let dimensions = edges.dimensions();
    let diagnostics = DetectionDiagnostics {
        detector: detector.kind(),
        width: dimensions.width,
        height: dimensions.height,
        duration,
        edge_pixel_count: edges.edge_pixel_count(),
        pixel_count: dimensions.pixel_count(),
        binary: edges.is_binary(),
    };
    log::debug!(
        "{} detection on {}x{} took {:.3}ms",
        diagnostics.detector,
        diagnostics.width,
        diagnostics.height,
        duration_ms(duration)
    );
    Ok((edges, diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::baseline::BaselineDetector;
    use crate::types::GrayImage;

    /// Advances by a fixed step every time it is read.
    struct StepClock {
        ticks: Cell<u64>,
        step: Duration,
    }

    impl Clock for StepClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.ticks.get();
            self.ticks.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            let now = self.now();
            self.step * u32::try_from(now - since).unwrap()
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_micros(1500);
        assert!((duration_ms(d) - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn diagnostics_describe_the_run() {
        let image = Image::Gray(GrayImage::from_fn(8, 4, |x, _| {
            image::Luma([if x < 4 { 0 } else { 255 }])
        }));
        let clock = StepClock {
            ticks: Cell::new(0),
            step: Duration::from_millis(3),
        };
        let (edges, diag) =
            detect_with_diagnostics(&BaselineDetector::default(), &image, &clock).unwrap();

        assert_eq!(diag.detector, DetectorKind::Baseline);
        assert_eq!((diag.width, diag.height), (8, 4));
        assert_eq!(diag.pixel_count, 32);
        assert_eq!(diag.edge_pixel_count, edges.edge_pixel_count());
        assert_eq!(diag.edge_pixel_count, 4);
        assert!(diag.binary);
        assert_eq!(diag.duration, Duration::from_millis(3));
        assert!((diag.edge_density() - 0.125).abs() < f64::EPSILON);
    }

    #[test]
    fn errors_propagate() {
        let clock = StepClock {
            ticks: Cell::new(0),
            step: Duration::ZERO,
        };
        let empty = Image::Gray(GrayImage::new(0, 0));
        let result = detect_with_diagnostics(&BaselineDetector::default(), &empty, &clock);
        assert!(result.is_err());
    }

    #[test]
    fn report_produces_nonempty_string() {
        let diag = DetectionDiagnostics {
            detector: DetectorKind::Hybrid,
            width: 100,
            height: 50,
            duration: Duration::from_millis(12),
            edge_pixel_count: 500,
            pixel_count: 5000,
            binary: false,
        };
        let report = diag.report();
        assert!(report.contains("Edge Detection Report"));
        assert!(report.contains("hybrid"));
        assert!(report.contains("100x50"));
        assert!(report.contains("10.0%"));
        assert!(report.contains("continuous"));
    }

    #[test]
    fn json_duration_is_seconds() {
        let diag = DetectionDiagnostics {
            detector: DetectorKind::Canny,
            width: 1,
            height: 1,
            duration: Duration::from_millis(250),
            edge_pixel_count: 0,
            pixel_count: 1,
            binary: true,
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["duration"], serde_json::json!(0.25));
        assert_eq!(json["detector"], serde_json::json!("canny"));

        let back: DetectionDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back, diag);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let json = serde_json::json!({
            "detector": "baseline",
            "width": 1,
            "height": 1,
            "duration": -1.0,
            "edge_pixel_count": 0,
            "pixel_count": 1,
            "binary": true,
        });
        assert!(serde_json::from_value::<DetectionDiagnostics>(json).is_err());
    }
}
