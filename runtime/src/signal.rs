//! Completion Signal - one-shot outcome delivery
//!
//! A validator resolves exactly once: with the matched label, or with the
//! unmatched trace. `Resolver` is consumed by resolving, so a second outcome
//! cannot be produced.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracewalk_core::{Label, Trace, UnmatchedTrace, WalkError};

type Verdict = Result<Label, UnmatchedTrace>;

/// Create a connected resolver/completion pair.
pub fn completion() -> (Resolver, Completion) {
    let (tx, rx) = oneshot::channel();
    (Resolver { tx }, Completion { rx })
}

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error(transparent)]
    Unmatched(#[from] UnmatchedTrace),
    #[error("validator dropped before the trace settled")]
    Abandoned,
    #[error("event source ended before the trace settled: {trace}")]
    Incomplete { trace: Trace },
    #[error(transparent)]
    Harness(#[from] WalkError),
}

impl CompletionError {
    /// The unmatched trace, if this is a divergence.
    pub fn unmatched(&self) -> Option<&UnmatchedTrace> {
        match self {
            CompletionError::Unmatched(unmatched) => Some(unmatched),
            _ => None,
        }
    }
}

/// The producing half of the signal.
#[derive(Debug)]
pub struct Resolver {
    tx: oneshot::Sender<Verdict>,
}

impl Resolver {
    /// Resolve with a matched label. Returns `false` if nobody is listening.
    pub fn succeed(self, label: Label) -> bool {
        self.resolve(Ok(label))
    }

    /// Resolve with an unmatched trace. Returns `false` if nobody is listening.
    pub fn fail(self, unmatched: UnmatchedTrace) -> bool {
        self.resolve(Err(unmatched))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn resolve(self, verdict: Verdict) -> bool {
        let delivered = self.tx.send(verdict).is_ok();
        if !delivered {
            tracing::debug!("Completion observer already gone");
        }
        delivered
    }
}

/// The consuming half of the signal; resolves to the matched label.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Verdict>,
}

impl Future for Completion {
    type Output = Result<Label, CompletionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(Ok(label)) => Ok(label),
            Ok(Err(unmatched)) => Err(CompletionError::Unmatched(unmatched)),
            Err(_) => Err(CompletionError::Abandoned),
        })
    }
}

impl Completion {
    /// Register a success/failure callback pair.
    ///
    /// Exactly one of the two runs once the signal resolves. If the resolver
    /// is dropped without an outcome, neither runs.
    pub fn register<S, F>(self, on_success: S, on_failure: F) -> JoinHandle<()>
    where
        S: FnOnce(Label) + Send + 'static,
        F: FnOnce(UnmatchedTrace) + Send + 'static,
    {
        tokio::spawn(async move {
            match self.await {
                Ok(label) => on_success(label),
                Err(CompletionError::Unmatched(unmatched)) => on_failure(unmatched),
                Err(err) => tracing::warn!(error = %err, "Completion resolved without an outcome"),
            }
        })
    }
}
