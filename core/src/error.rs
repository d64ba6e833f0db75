use crate::trace::Trace;
use std::path::PathBuf;
use thiserror::Error;

/// An event arrived for which the current cursor has no known child.
///
/// Carries the complete ordered history up to and including the diverging
/// event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unmatched trace: {trace}")]
pub struct UnmatchedTrace {
    pub trace: Trace,
}

impl UnmatchedTrace {
    pub fn new(trace: Trace) -> Self {
        Self { trace }
    }

    /// The event that had no matching transition.
    pub fn diverged_at(&self) -> Option<&str> {
        self.trace.last()
    }

    pub fn into_trace(self) -> Trace {
        self.trace
    }
}

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("event `{event}` observed after the walk already {state}")]
    AlreadySettled { event: String, state: String },
}

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("transition tree root must be a branch, found leaf `{0}`")]
    RootIsLeaf(String),
    #[error("transition tree has an empty branch at {path}")]
    EmptyBranch { path: String },
    #[error("failed to read tree file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON transition tree: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML transition tree: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid validator config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value `{value}` for {key}")]
    InvalidValue { key: String, value: String },
}
