//! Tracewalk facade crate.
//!
//! This crate re-exports the core and runtime crates with a single entry point.

pub use tracewalk_core as core;
pub use tracewalk_runtime as runtime;

pub use tracewalk_core::{Event, TransitionTree, UnmatchedTrace, ValidatorConfig, scriptloader};
pub use tracewalk_runtime::{Completion, CompletionError, TraceValidator, validate};

pub mod prelude {
    pub use tracewalk_core::prelude::*;
    pub use tracewalk_runtime::prelude::*;
}
