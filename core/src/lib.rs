//! Tracewalk Core - Transition Trees and the Trace Walker
//!
//! This crate defines the **structural** side of trace validation:
//! - `TransitionTree`: the declared tree of known-good event orderings
//! - `TraceWalker`: the cursor + history state machine
//! - `ValidatorConfig`: per-instance policies
//!
//! This layer is synchronous; delivery of outcomes lives in `tracewalk-runtime`.

pub mod config;
pub mod error;
pub mod event;
pub mod scriptloader;
pub mod trace;
pub mod tree;
pub mod walker;

pub use config::{FailurePolicy, LateEventPolicy, OriginFilter, ValidatorConfig};
pub use error::{ConfigError, TreeError, UnmatchedTrace, WalkError};
pub use event::Event;
pub use trace::Trace;
pub use tree::{Branch, KnownPath, Label, Lookup, Node, TransitionTree};
pub use walker::{Step, TraceWalker, WalkState};

pub mod prelude {
    pub use crate::config::{FailurePolicy, LateEventPolicy, OriginFilter, ValidatorConfig};
    pub use crate::error::{UnmatchedTrace, WalkError};
    pub use crate::event::Event;
    pub use crate::trace::Trace;
    pub use crate::tree::{Node, TransitionTree};
    pub use crate::walker::{Step, TraceWalker, WalkState};
}
