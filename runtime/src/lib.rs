//! Tracewalk Runtime - delivering outcomes
//!
//! The runtime layer turns a synchronous `TraceWalker` into a validator with
//! a one-shot completion signal, an optional grace window before failures
//! are reported, and an ingestion loop over any `EventSource`.

pub mod signal;
pub mod source;
pub mod timer;
pub mod validator;

pub mod prelude {
    pub use crate::signal::{Completion, CompletionError};
    pub use crate::source::{EventSource, IterSource};
    pub use crate::validator::{TraceValidator, validate};
}

pub use signal::{Completion, CompletionError, Resolver, completion};
pub use source::{EventSource, IterSource};
pub use timer::DeferredFailure;
pub use validator::{TraceValidator, validate};
