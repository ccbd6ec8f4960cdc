//! Numeric backend availability.
//!
//! Detectors declare the backend they depend on
//! ([`DetectorKind::backend`]). Which backends exist is decided once per
//! process: compiled-in Cargo features, minus any backend named in the
//! [`DISABLE_BACKENDS_ENV`] environment variable. The result is stored in
//! a [`OnceLock`] and never changes afterwards, so readers need no locking.
//!
//! The [`Registry`](crate::Registry) copies a [`Capabilities`] value
//! instead of probing per call; tests can hand it any table they like.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::detector::DetectorKind;

/// Environment variable listing backends to treat as missing
/// (comma-separated, e.g. `CTRLMAP_DISABLE_BACKENDS=imageproc`).
pub const DISABLE_BACKENDS_ENV: &str = "CTRLMAP_DISABLE_BACKENDS";

/// A numeric backend a detector can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Plain Rust in this crate; always available.
    Builtin,
    /// Filters from the `imageproc` crate (Cargo feature `imageproc`).
    Imageproc,
}

impl Backend {
    /// Every backend.
    pub const ALL: [Self; 2] = [Self::Builtin, Self::Imageproc];

    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Imageproc => "imageproc",
        }
    }

    /// Whether this build contains the backend at all.
    #[must_use]
    pub const fn is_compiled(self) -> bool {
        match self {
            Self::Builtin => true,
            Self::Imageproc => cfg!(feature = "imageproc"),
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Availability table for numeric backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    imageproc: bool,
}

impl Capabilities {
    /// Everything compiled into this build.
    #[must_use]
    pub const fn compiled() -> Self {
        Self {
            imageproc: Backend::Imageproc.is_compiled(),
        }
    }

    /// Only the builtin backend: every preset degrades to the baseline
    /// detector.
    #[must_use]
    pub const fn builtin_only() -> Self {
        Self { imageproc: false }
    }

    /// Compiled backends minus those listed in [`DISABLE_BACKENDS_ENV`].
    #[must_use]
    pub fn probe() -> Self {
        let compiled = Self::compiled();
        match std::env::var(DISABLE_BACKENDS_ENV) {
            Ok(list) => compiled.with_disabled(&list),
            Err(_) => compiled,
        }
    }

    /// Mark the backends named in a comma-separated list as missing.
    ///
    /// Unknown names are logged and ignored. The builtin backend cannot
    /// be disabled.
    #[must_use]
    pub fn with_disabled(self, list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .fold(self, |caps, name| match Backend::from_name(name) {
                Some(backend) => caps.without(backend),
                None => {
                    log::warn!("ignoring unknown backend `{name}` in {DISABLE_BACKENDS_ENV}");
                    caps
                }
            })
    }

    /// Mark one backend as missing.
    #[must_use]
    pub fn without(self, backend: Backend) -> Self {
        match backend {
            Backend::Builtin => {
                log::warn!("the builtin backend cannot be disabled");
                self
            }
            Backend::Imageproc => Self { imageproc: false },
        }
    }

    /// Whether `backend` can be used.
    #[must_use]
    pub const fn has_backend(self, backend: Backend) -> bool {
        match backend {
            Backend::Builtin => true,
            Backend::Imageproc => self.imageproc,
        }
    }

    /// Whether a detector of `kind` can run.
    #[must_use]
    pub const fn is_available(self, kind: DetectorKind) -> bool {
        self.has_backend(kind.backend())
    }

    /// Availability of every detector kind.
    #[must_use]
    pub fn status(self) -> Vec<BackendStatus> {
        DetectorKind::ALL
            .into_iter()
            .map(|kind| BackendStatus {
                kind,
                backend: kind.backend(),
                available: self.is_available(kind),
            })
            .collect()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::compiled()
    }
}

/// Self-check result for one detector kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    /// The detector kind.
    pub kind: DetectorKind,
    /// The backend its computation needs.
    pub backend: Backend,
    /// Whether that backend is available in this process.
    pub available: bool,
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.available { "ok" } else { "unavailable" };
        write!(f, "{:<12} {:<10} {state}", self.kind.name(), self.backend.name())
    }
}

static CAPABILITIES: OnceLock<Capabilities> = OnceLock::new();

/// The process-wide capability table, probed on first access.
#[must_use]
pub fn capabilities() -> Capabilities {
    *CAPABILITIES.get_or_init(|| {
        let caps = Capabilities::probe();
        log::debug!("probed backend capabilities: {caps:?}");
        caps
    })
}

/// Report, for each detector kind, whether its backend is available in
/// this process.
#[must_use]
pub fn self_check() -> Vec<BackendStatus> {
    capabilities().status()
}
