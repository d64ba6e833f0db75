//! # Validator configuration
//!
//! Every validator instance picks exactly one [`FailurePolicy`], one
//! [`OriginFilter`] and one [`LateEventPolicy`]. Configuration can be built
//! in code with the `with_*` methods, loaded from TOML, and overridden from
//! the environment.
//!
//! ```toml
//! origin = "watchme"
//! late_events = "record"
//!
//! [failure_policy]
//! mode = "delayed"
//! window_ms = 500
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const ENV_FAILURE_POLICY: &str = "TRACEWALK_FAILURE_POLICY";
pub const ENV_ORIGIN: &str = "TRACEWALK_ORIGIN";
pub const ENV_LATE_EVENTS: &str = "TRACEWALK_LATE_EVENTS";

/// When a divergence is reported to the completion observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Signal failure as soon as divergence is detected.
    #[default]
    Immediate,
    /// Wait `window_ms` before signalling failure.
    Delayed { window_ms: u64 },
}

impl FailurePolicy {
    pub const DEFAULT_WINDOW_MS: u64 = 500;

    pub fn delayed(window_ms: u64) -> Self {
        FailurePolicy::Delayed { window_ms }
    }

    /// The grace window, if any.
    pub fn window(&self) -> Option<Duration> {
        match self {
            FailurePolicy::Immediate => None,
            FailurePolicy::Delayed { window_ms } => Some(Duration::from_millis(*window_ms)),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    /// Accepts `immediate`, `delayed` (default window) or `delayed:<ms>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue {
            key: "failure_policy".to_string(),
            value: s.to_string(),
        };
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(FailurePolicy::Immediate),
            "delayed" => Ok(FailurePolicy::delayed(Self::DEFAULT_WINDOW_MS)),
            other => {
                let ms = other.strip_prefix("delayed:").ok_or_else(invalid)?;
                ms.trim()
                    .parse()
                    .map(FailurePolicy::delayed)
                    .map_err(|_| invalid())
            }
        }
    }
}

/// What happens to events observed after the walk has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LateEventPolicy {
    /// Drop the event; history is left untouched.
    #[default]
    Ignore,
    /// Append the event to the walker history without producing a new outcome.
    Record,
    /// Treat the event as a harness bug and return an error.
    Reject,
}

impl FromStr for LateEventPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(LateEventPolicy::Ignore),
            "record" => Ok(LateEventPolicy::Record),
            "reject" => Ok(LateEventPolicy::Reject),
            _ => Err(ConfigError::InvalidValue {
                key: "late_events".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

type OriginPredicate = Arc<dyn Fn(Option<&str>) -> bool + Send + Sync>;

/// Decides which events are considered at all, by origin.
///
/// Rejected events are discarded before they reach the trace.
#[derive(Clone, Default)]
pub enum OriginFilter {
    #[default]
    Any,
    Exact(String),
    Predicate(OriginPredicate),
}

impl OriginFilter {
    pub fn exact(origin: impl Into<String>) -> Self {
        OriginFilter::Exact(origin.into())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(Option<&str>) -> bool + Send + Sync + 'static,
    {
        OriginFilter::Predicate(Arc::new(f))
    }

    pub fn accepts(&self, origin: Option<&str>) -> bool {
        match self {
            OriginFilter::Any => true,
            OriginFilter::Exact(expected) => origin == Some(expected.as_str()),
            OriginFilter::Predicate(f) => f(origin),
        }
    }
}

impl fmt::Debug for OriginFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginFilter::Any => f.write_str("Any"),
            OriginFilter::Exact(origin) => f.debug_tuple("Exact").field(origin).finish(),
            OriginFilter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Per-instance validator configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidatorConfig {
    pub failure_policy: FailurePolicy,
    pub origin: OriginFilter,
    pub late_events: LateEventPolicy,
}

/// On-disk shape; predicates cannot come from a file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    failure_policy: FailurePolicy,
    origin: Option<String>,
    late_events: LateEventPolicy,
}

impl From<ConfigFile> for ValidatorConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            failure_policy: file.failure_policy,
            origin: file.origin.map(OriginFilter::Exact).unwrap_or_default(),
            late_events: file.late_events,
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_origin(mut self, origin: OriginFilter) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_late_events(mut self, policy: LateEventPolicy) -> Self {
        self.late_events = policy;
        self
    }

    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(src)?;
        Ok(file.into())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&src)
    }

    /// Apply `TRACEWALK_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_FAILURE_POLICY) {
            self.failure_policy = value.parse()?;
        }
        if let Some(value) = lookup(ENV_ORIGIN) {
            self.origin = match value.trim() {
                "" | "*" => OriginFilter::Any,
                origin => OriginFilter::exact(origin),
            };
        }
        if let Some(value) = lookup(ENV_LATE_EVENTS) {
            self.late_events = value.parse()?;
        }
        Ok(self)
    }
}
