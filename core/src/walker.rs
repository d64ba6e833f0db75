//! # Trace Walker
//!
//! A stateful cursor over a [`TransitionTree`] plus the append-only log of
//! observed event names. The walker is synchronous and owns no timers; how
//! and when a divergence is delivered is decided by the runtime layer.
//!
//! ```text
//! Pending(root) --event--> Pending(child)
//!               --event--> Succeeded(label)   (terminal)
//!               --event--> Failed(trace)      (terminal)
//! ```

use crate::config::{LateEventPolicy, OriginFilter, ValidatorConfig};
use crate::error::{UnmatchedTrace, WalkError};
use crate::event::Event;
use crate::trace::Trace;
use crate::tree::{Branch, Label, Lookup, TransitionTree};
use std::fmt;
use std::sync::Arc;

/// The walker state. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkState {
    Pending(Arc<Branch>),
    Succeeded(Label),
    Failed(UnmatchedTrace),
}

impl WalkState {
    pub fn is_pending(&self) -> bool {
        matches!(self, WalkState::Pending(_))
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, WalkState::Succeeded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, WalkState::Failed(_))
    }
}

impl fmt::Display for WalkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkState::Pending(_) => f.write_str("is pending"),
            WalkState::Succeeded(label) => write!(f, "succeeded with `{label}`"),
            WalkState::Failed(unmatched) => {
                write!(f, "failed after {} events", unmatched.trace.len())
            }
        }
    }
}

/// What a single observed event did to the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Rejected by the origin filter; not recorded.
    Filtered,
    /// Cursor moved one level down; `depth` branches entered so far.
    Advanced { depth: usize },
    /// A leaf was reached.
    Matched(Label),
    /// No transition for the event; the walk has failed.
    Diverged(UnmatchedTrace),
    /// The walk had already settled; no new outcome.
    Ignored,
}

/// Walks one trace through a Transition Tree.
#[derive(Debug, Clone)]
pub struct TraceWalker {
    state: WalkState,
    trace: Trace,
    depth: usize,
    origin: OriginFilter,
    late_events: LateEventPolicy,
}

impl TraceWalker {
    /// Start a walk at the root of `tree`, accepting every origin.
    pub fn new(tree: &TransitionTree) -> Self {
        Self {
            state: WalkState::Pending(Arc::clone(tree.root())),
            trace: Trace::new(),
            depth: 0,
            origin: OriginFilter::Any,
            late_events: LateEventPolicy::Ignore,
        }
    }

    pub fn from_config(tree: &TransitionTree, config: &ValidatorConfig) -> Self {
        Self::new(tree)
            .with_origin(config.origin.clone())
            .with_late_events(config.late_events)
    }

    pub fn with_origin(mut self, origin: OriginFilter) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_late_events(mut self, policy: LateEventPolicy) -> Self {
        self.late_events = policy;
        self
    }

    /// Feed one event to the walker.
    pub fn observe(&mut self, event: &Event) -> Result<Step, WalkError> {
        if !self.origin.accepts(event.origin()) {
            tracing::trace!(
                event = %event.name(),
                origin = ?event.origin(),
                "Event filtered by origin"
            );
            return Ok(Step::Filtered);
        }

        let cursor = match &self.state {
            WalkState::Pending(cursor) => Arc::clone(cursor),
            _ => return self.observe_late(event),
        };

        self.trace.push(event.name());

        let step = match cursor.lookup(event.name()) {
            Lookup::Branch(child) => {
                self.depth += 1;
                tracing::debug!(event = %event.name(), depth = self.depth, "Walker advanced");
                self.state = WalkState::Pending(Arc::clone(child));
                Step::Advanced { depth: self.depth }
            }
            Lookup::Leaf(label) => {
                tracing::info!(
                    event = %event.name(),
                    %label,
                    trace = %self.trace,
                    "Trace matched"
                );
                self.state = WalkState::Succeeded(label.to_string());
                Step::Matched(label.to_string())
            }
            Lookup::NotFound => {
                let unmatched = UnmatchedTrace::new(self.trace.clone());
                tracing::warn!(
                    event = %event.name(),
                    expected = ?cursor.events().collect::<Vec<_>>(),
                    trace = %self.trace,
                    "Unknown transition"
                );
                self.state = WalkState::Failed(unmatched.clone());
                Step::Diverged(unmatched)
            }
        };
        Ok(step)
    }

    /// Convenience for feeding a bare event name with no origin.
    pub fn observe_name(&mut self, name: &str) -> Result<Step, WalkError> {
        self.observe(&Event::new(name))
    }

    fn observe_late(&mut self, event: &Event) -> Result<Step, WalkError> {
        match self.late_events {
            LateEventPolicy::Ignore => {
                tracing::debug!(event = %event.name(), state = %self.state, "Ignoring late event");
                Ok(Step::Ignored)
            }
            LateEventPolicy::Record => {
                tracing::debug!(event = %event.name(), state = %self.state, "Recording late event");
                self.trace.push(event.name());
                Ok(Step::Ignored)
            }
            LateEventPolicy::Reject => {
                tracing::warn!(event = %event.name(), state = %self.state, "Late event rejected");
                Err(WalkError::AlreadySettled {
                    event: event.name().to_string(),
                    state: self.state.to_string(),
                })
            }
        }
    }

    pub fn state(&self) -> &WalkState {
        &self.state
    }

    /// Number of branches the cursor has descended below the root.
    ///
    /// Stops counting once the walk settles, so late events recorded into
    /// the trace do not move it.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn late_events(&self) -> LateEventPolicy {
        self.late_events
    }

    /// Every accepted event so far, including late ones under `Record`.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn is_settled(&self) -> bool {
        !self.state.is_pending()
    }
}
