//! Named quality presets and detector construction with capability
//! fallback.
//!
//! A preset is a declarative [`DetectorSpec`] tree. Resolving it first
//! rewrites every leaf whose backend is unavailable along the fallback
//! chain `Canny -> Gradient -> Baseline` (using the replacement's default
//! configuration), then builds the detector. Custom specs, for example
//! deserialized from JSON, go through the same path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::baseline::{BaselineConfig, BaselineDetector};
use crate::canny::{CannyConfig, CannyDetector};
use crate::capability::{self, Capabilities};
use crate::detector::{DetectorKind, EdgeDetector};
use crate::gradient::{GradientConfig, GradientDetector};
use crate::hybrid::{HybridDetector, HybridOutput};
use crate::multiscale::MultiScaleDetector;
use crate::types::EdgeError;

/// Named quality/speed trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Backend-free contrast threshold.
    Fast,
    /// Canny blended with Sobel gradients.
    Balanced,
    /// Canny blended with two-scale Sobel gradients.
    High,
    /// Three-scale Canny blended with full-resolution Canny.
    Ultra,
}

impl Preset {
    /// Every preset, fastest first.
    pub const ALL: [Self; 4] = [Self::Fast, Self::Balanced, Self::High, Self::Ultra];

    /// Preset used when none is specified.
    pub const DEFAULT: Self = Self::Balanced;

    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }

    /// The detector pipeline this preset stands for, before any
    /// capability fallback.
    #[must_use]
    pub fn spec(self) -> DetectorSpec {
        match self {
            Self::Fast => DetectorSpec::Baseline(BaselineConfig::new(128)),
            Self::Balanced => DetectorSpec::hybrid(
                DetectorSpec::canny(),
                DetectorSpec::gradient(),
                0.7,
                HybridOutput::Continuous,
            ),
            Self::High => DetectorSpec::hybrid(
                DetectorSpec::canny(),
                DetectorSpec::multi_scale(DetectorSpec::gradient(), vec![1.0, 0.5]),
                0.6,
                HybridOutput::Continuous,
            ),
            Self::Ultra => DetectorSpec::hybrid(
                DetectorSpec::multi_scale(DetectorSpec::canny(), vec![1.0, 0.5, 0.25]),
                DetectorSpec::canny(),
                0.5,
                HybridOutput::Continuous,
            ),
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = EdgeError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| EdgeError::UnknownPreset(name.to_owned()))
    }
}

/// Declarative description of a detector pipeline.
///
/// Serialized with a `kind` tag, e.g.
/// `{"kind": "canny", "sigma": 1.4}` or
/// `{"kind": "multi_scale", "base": {"kind": "gradient"}, "scales": [1.0, 0.5]}`.
/// Leaf configuration fields that are omitted take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectorSpec {
    /// [`BaselineDetector`].
    Baseline(BaselineConfig),
    /// [`GradientDetector`].
    Gradient(GradientConfig),
    /// [`CannyDetector`].
    Canny(CannyConfig),
    /// [`MultiScaleDetector`].
    MultiScale {
        /// Detector run at each scale.
        base: Box<DetectorSpec>,
        /// Scale factors.
        scales: Vec<f32>,
    },
    /// [`HybridDetector`].
    Hybrid {
        /// Detector weighted by `combine_weight`.
        primary: Box<DetectorSpec>,
        /// Detector weighted by `1 - combine_weight`.
        secondary: Box<DetectorSpec>,
        /// Weight of the primary detector.
        #[serde(default = "default_combine_weight")]
        combine_weight: f32,
        /// Output mode.
        #[serde(default)]
        output: HybridOutput,
    },
}

const fn default_combine_weight() -> f32 {
    HybridDetector::DEFAULT_COMBINE_WEIGHT
}

impl DetectorSpec {
    /// Canny with default configuration.
    #[must_use]
    pub fn canny() -> Self {
        Self::Canny(CannyConfig::default())
    }

    /// Gradient with default configuration.
    #[must_use]
    pub fn gradient() -> Self {
        Self::Gradient(GradientConfig::default())
    }

    /// Multi-scale wrapper around `base`.
    #[must_use]
    pub fn multi_scale(base: Self, scales: Vec<f32>) -> Self {
        Self::MultiScale {
            base: Box::new(base),
            scales,
        }
    }

    /// Hybrid of two specs.
    #[must_use]
    pub fn hybrid(primary: Self, secondary: Self, combine_weight: f32, output: HybridOutput) -> Self {
        Self::Hybrid {
            primary: Box::new(primary),
            secondary: Box::new(secondary),
            combine_weight,
            output,
        }
    }

    /// Default spec for a leaf kind; `None` for composites, which need
    /// children.
    #[must_use]
    pub fn default_for(kind: DetectorKind) -> Option<Self> {
        match kind {
            DetectorKind::Baseline => Some(Self::Baseline(BaselineConfig::default())),
            DetectorKind::Gradient => Some(Self::gradient()),
            DetectorKind::Canny => Some(Self::canny()),
            DetectorKind::MultiScale | DetectorKind::Hybrid => None,
        }
    }

    /// The detector kind at the root of this spec.
    #[must_use]
    pub const fn kind(&self) -> DetectorKind {
        match self {
            Self::Baseline(_) => DetectorKind::Baseline,
            Self::Gradient(_) => DetectorKind::Gradient,
            Self::Canny(_) => DetectorKind::Canny,
            Self::MultiScale { .. } => DetectorKind::MultiScale,
            Self::Hybrid { .. } => DetectorKind::Hybrid,
        }
    }

    /// Build the detector exactly as described, without capability checks.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidConfig`] if any node's configuration is
    /// invalid.
    pub fn build(&self) -> Result<Box<dyn EdgeDetector>, EdgeError> {
        let detector: Box<dyn EdgeDetector> = match self {
            Self::Baseline(config) => Box::new(BaselineDetector::new(*config)),
            Self::Gradient(config) => Box::new(GradientDetector::new(*config)?),
            Self::Canny(config) => Box::new(CannyDetector::new(*config)?),
            Self::MultiScale { base, scales } => {
                Box::new(MultiScaleDetector::new(base.build()?, scales.clone())?)
            }
            Self::Hybrid {
                primary,
                secondary,
                combine_weight,
                output,
            } => Box::new(
                HybridDetector::new(primary.build()?, secondary.build()?, *combine_weight)?
                    .with_output(*output),
            ),
        };
        Ok(detector)
    }

    /// Replace leaves whose backend is unavailable, recording each step
    /// of the fallback chain in `substitutions`.
    #[must_use]
    pub fn degrade(&self, capabilities: Capabilities, substitutions: &mut Vec<Substitution>) -> Self {
        match self {
            Self::Baseline(_) | Self::Gradient(_) | Self::Canny(_) => {
                let mut kind = self.kind();
                while !capabilities.is_available(kind) {
                    let Some(next) = kind.fallback() else { break };
                    log::warn!(
                        "{kind} detector unavailable ({} backend missing), falling back to {next}",
                        kind.backend()
                    );
                    substitutions.push(Substitution {
                        requested: kind,
                        substituted: next,
                    });
                    kind = next;
                }
                if kind == self.kind() {
                    self.clone()
                } else {
                    Self::default_for(kind).unwrap_or_else(|| self.clone())
                }
            }
            Self::MultiScale { base, scales } => Self::MultiScale {
                base: Box::new(base.degrade(capabilities, substitutions)),
                scales: scales.clone(),
            },
            Self::Hybrid {
                primary,
                secondary,
                combine_weight,
                output,
            } => Self::Hybrid {
                primary: Box::new(primary.degrade(capabilities, substitutions)),
                secondary: Box::new(secondary.degrade(capabilities, substitutions)),
                combine_weight: *combine_weight,
                output: *output,
            },
        }
    }
}

impl From<Preset> for DetectorSpec {
    fn from(preset: Preset) -> Self {
        preset.spec()
    }
}

/// One fallback step taken while resolving a spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    /// The kind that was asked for.
    pub requested: DetectorKind,
    /// The kind used in its place.
    pub substituted: DetectorKind,
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.requested, self.substituted)
    }
}

/// A built detector plus the fallbacks it took.
#[derive(Debug)]
pub struct Resolved {
    /// The ready-to-use detector.
    pub detector: Box<dyn EdgeDetector>,
    /// Fallback steps, in the order they were applied.
    pub substitutions: Vec<Substitution>,
}

impl Resolved {
    /// Returns `true` if any leaf was replaced by a fallback.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.substitutions.is_empty()
    }
}

/// Builds detectors from presets or specs against a capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registry {
    capabilities: Capabilities,
    default_preset: Option<Preset>,
}

impl Registry {
    /// A registry using the process-wide capability table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capabilities(capability::capabilities())
    }

    /// A registry using an explicit capability table.
    #[must_use]
    pub const fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            default_preset: None,
        }
    }

    /// Use `preset`, with a warning, when a name does not parse instead
    /// of failing with [`EdgeError::UnknownPreset`].
    #[must_use]
    pub const fn with_default_preset(mut self, preset: Preset) -> Self {
        self.default_preset = Some(preset);
        self
    }

    /// The capability table consulted during resolution.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Build the detector for a preset name.
    ///
    /// # Errors
    ///
    /// See [`Registry::resolve_report`].
    pub fn resolve(&self, name: &str) -> Result<Box<dyn EdgeDetector>, EdgeError> {
        self.resolve_report(name).map(|resolved| resolved.detector)
    }

    /// Build the detector for a preset name and report any fallbacks.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::UnknownPreset`] if `name` is not a preset and
    /// no default preset is configured.
    pub fn resolve_report(&self, name: &str) -> Result<Resolved, EdgeError> {
        let preset = match name.parse::<Preset>() {
            Ok(preset) => preset,
            Err(err) => match self.default_preset {
                Some(default) => {
                    log::warn!("{err}; using default preset `{default}`");
                    default
                }
                None => return Err(err),
            },
        };
        self.resolve_preset(preset)
    }

    /// Build the detector for a preset.
    ///
    /// # Errors
    ///
    /// Fails only if a preset table entry is itself invalid.
    pub fn resolve_preset(&self, preset: Preset) -> Result<Resolved, EdgeError> {
        log::debug!("resolving preset `{preset}`");
        self.resolve_spec(&preset.spec())
    }

    /// Build a detector from a spec, applying capability fallback.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidConfig`] if the spec holds an invalid
    /// configuration.
    pub fn resolve_spec(&self, spec: &DetectorSpec) -> Result<Resolved, EdgeError> {
        let mut substitutions = Vec::new();
        let effective = spec.degrade(self.capabilities, &mut substitutions);
        let detector = effective.build()?;
        log::debug!(
            "built {} detector with {} substitution(s)",
            detector.kind(),
            substitutions.len()
        );
        Ok(Resolved {
            detector,
            substitutions,
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
