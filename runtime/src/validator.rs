//! # TraceValidator: walker + completion delivery
//!
//! Wires a [`TraceWalker`] to a one-shot [`Completion`] and applies the
//! configured [`FailurePolicy`]:
//!
//! * **Immediate**: the unmatched trace is delivered as soon as the walk diverges.
//! * **Delayed**: delivery is held back for the grace window by a
//!   [`DeferredFailure`] timer. The walk is already terminal, so the delay only
//!   changes *when* the observer hears about it. The timer runs on the ambient
//!   tokio runtime; a divergence observed outside one is delivered immediately.
//!
//! ## Example
//!
//! ```rust,ignore
//! let tree = scriptloader::tree();
//! let (mut validator, completion) = TraceValidator::new(&tree, ValidatorConfig::default());
//!
//! validator.observe(&Event::new("scriptloader_load_source"))?;
//! validator.observe(&Event::new("scriptloader_execute"))?;
//!
//! assert_eq!(completion.await?, "source_exec");
//! ```

use crate::signal::{self, Completion, CompletionError, Resolver};
use crate::source::EventSource;
use crate::timer::DeferredFailure;
use tokio::runtime::Handle;
use tracewalk_core::{
    Event, FailurePolicy, Label, LateEventPolicy, Step, Trace, TraceWalker, TransitionTree,
    UnmatchedTrace, ValidatorConfig, WalkError, WalkState,
};
use tracing::Instrument;
use uuid::Uuid;

/// Validates one trace against a Transition Tree.
#[derive(Debug)]
pub struct TraceValidator {
    session: Uuid,
    walker: TraceWalker,
    failure_policy: FailurePolicy,
    resolver: Option<Resolver>,
    deferred: Option<DeferredFailure>,
    span: tracing::Span,
}

impl TraceValidator {
    /// Create a validator and the completion its outcome is delivered to.
    pub fn new(tree: &TransitionTree, config: ValidatorConfig) -> (Self, Completion) {
        let session = Uuid::new_v4();
        let (resolver, completion) = signal::completion();
        let span = tracing::info_span!("Validator", tracewalk.session = %session);

        span.in_scope(|| {
            tracing::debug!(
                failure_policy = ?config.failure_policy,
                origin = ?config.origin,
                late_events = ?config.late_events,
                "Validator session started"
            );
        });

        let validator = Self {
            session,
            walker: TraceWalker::from_config(tree, &config),
            failure_policy: config.failure_policy,
            resolver: Some(resolver),
            deferred: None,
            span,
        };
        (validator, completion)
    }

    /// Feed one event. Resolves the completion when the walk settles.
    pub fn observe(&mut self, event: &Event) -> Result<Step, WalkError> {
        let span = self.span.clone();
        let _entered = span.enter();

        let step = self.walker.observe(event)?;
        match &step {
            Step::Matched(label) => self.deliver_success(label.clone()),
            Step::Diverged(unmatched) => self.deliver_failure(unmatched.clone()),
            Step::Filtered | Step::Advanced { .. } | Step::Ignored => {}
        }
        Ok(step)
    }

    fn deliver_success(&mut self, label: Label) {
        if let Some(resolver) = self.resolver.take() {
            resolver.succeed(label);
        }
    }

    fn deliver_failure(&mut self, unmatched: UnmatchedTrace) {
        let Some(resolver) = self.resolver.take() else {
            return;
        };
        match self.failure_policy.window() {
            None => {
                resolver.fail(unmatched);
            }
            Some(window) => match Handle::try_current() {
                Ok(runtime) => {
                    tracing::debug!(window_ms = window.as_millis() as u64, "Deferring failure");
                    let timer = DeferredFailure::arm(&runtime, window, resolver, unmatched);
                    self.deferred = Some(timer);
                }
                Err(_) => {
                    tracing::warn!(
                        window_ms = window.as_millis() as u64,
                        "No tokio runtime to hold the grace window; reporting failure now"
                    );
                    resolver.fail(unmatched);
                }
            },
        }
    }

    /// Stop a pending deferred failure from being delivered.
    ///
    /// Returns `false` if no timer is armed or it already fired.
    pub fn cancel_deferred_failure(&mut self) -> bool {
        self.deferred
            .as_mut()
            .is_some_and(DeferredFailure::cancel)
    }

    /// Pull events from `source` until the walk settles or the source ends,
    /// then wait for the outcome.
    ///
    /// Events left in the source after the walk settles are not consumed,
    /// except under [`LateEventPolicy::Reject`]: then the source is drained
    /// to its end and the first late event fails the drive with
    /// [`CompletionError::Harness`]. A rejecting drive over a channel
    /// therefore waits for every sender to be dropped.
    pub async fn drive<S>(
        mut self,
        source: &mut S,
        completion: Completion,
    ) -> Result<Label, CompletionError>
    where
        S: EventSource<Event> + ?Sized,
    {
        let span = self.span.clone();
        async move {
            while !self.walker.is_settled() {
                let Some(event) = source.next_event().await else {
                    let trace = self.walker.trace().clone();
                    tracing::warn!(%trace, "Event source ended before the trace settled");
                    return Err(CompletionError::Incomplete { trace });
                };
                self.observe(&event)?;
            }
            if self.walker.late_events() == LateEventPolicy::Reject {
                while let Some(event) = source.next_event().await {
                    self.observe(&event)?;
                }
            }
            completion.await
        }
        .instrument(span)
        .await
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn walker(&self) -> &TraceWalker {
        &self.walker
    }

    pub fn state(&self) -> &WalkState {
        self.walker.state()
    }

    pub fn trace(&self) -> &Trace {
        self.walker.trace()
    }

    pub fn is_settled(&self) -> bool {
        self.walker.is_settled()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }
}

/// Validate everything `source` produces against `tree`.
pub async fn validate<S>(
    tree: &TransitionTree,
    config: ValidatorConfig,
    source: &mut S,
) -> Result<Label, CompletionError>
where
    S: EventSource<Event> + ?Sized,
{
    let (validator, completion) = TraceValidator::new(tree, config);
    validator.drive(source, completion).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::IterSource;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tracewalk_core::scriptloader::{self, *};
    use tracewalk_core::{LateEventPolicy, OriginFilter};

    async fn run(names: &[&str]) -> Result<Label, CompletionError> {
        let tree = scriptloader::tree();
        let mut source = IterSource::new(names.iter().map(|name| Event::new(*name)));
        validate(&tree, ValidatorConfig::default(), &mut source).await
    }

    #[tokio::test]
    async fn test_scenario_source_exec() {
        assert_eq!(run(&[LOAD_SOURCE, EXECUTE]).await.unwrap(), "source_exec");
    }

    #[tokio::test]
    async fn test_scenario_bytecode_saved() {
        let label = run(&[LOAD_SOURCE, ENCODE_AND_EXECUTE, BYTECODE_SAVED])
            .await
            .unwrap();
        assert_eq!(label, "bytecode_saved");
    }

    #[tokio::test]
    async fn test_scenario_bytecode_exec() {
        assert_eq!(run(&[LOAD_BYTECODE, EXECUTE]).await.unwrap(), "bytecode_exec");
    }

    #[tokio::test]
    async fn test_scenario_fallback_source_exec() {
        let label = run(&[LOAD_BYTECODE, FALLBACK, LOAD_SOURCE, EXECUTE])
            .await
            .unwrap();
        assert_eq!(label, "fallback_source_exec");
    }

    #[tokio::test]
    async fn test_scenario_unknown_root_event() {
        let err = run(&[GENERATE_BYTECODE]).await.unwrap_err();
        let unmatched = err.unmatched().expect("expected an unmatched trace");
        assert_eq!(unmatched.trace.as_slice(), [GENERATE_BYTECODE]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_delayed_failure() {
        let tree = scriptloader::tree();
        let config = ValidatorConfig::new()
            .with_failure_policy(FailurePolicy::delayed(500))
            .with_late_events(LateEventPolicy::Record);
        let (mut validator, mut completion) = TraceValidator::new(&tree, config);
        let started = tokio::time::Instant::now();

        validator.observe(&Event::new(LOAD_SOURCE)).unwrap();
        let step = validator.observe(&Event::new(FALLBACK)).unwrap();
        assert!(matches!(step, Step::Diverged(_)));

        // A late event inside the window is recorded but cannot rescue the walk.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(validator.observe(&Event::new(EXECUTE)).unwrap(), Step::Ignored);
        assert_eq!(validator.trace().len(), 3);

        let early = tokio::time::timeout(Duration::from_millis(300), &mut completion).await;
        assert!(early.is_err(), "failure delivered inside the grace window");

        let err = completion.await.unwrap_err();
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(
            err.unmatched().map(|u| u.trace.as_slice()),
            Some([LOAD_SOURCE.to_string(), FALLBACK.to_string()].as_slice())
        );
    }

    #[tokio::test]
    async fn test_immediate_failure_is_ready_without_waiting() {
        let tree = scriptloader::tree();
        let (mut validator, completion) = TraceValidator::new(&tree, ValidatorConfig::default());

        validator.observe(&Event::new(EXECUTE)).unwrap();
        let outcome = tokio::time::timeout(Duration::from_millis(1), completion).await;
        assert!(matches!(outcome, Ok(Err(CompletionError::Unmatched(_)))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_deferred_failure_abandons() {
        let tree = scriptloader::tree();
        let config = ValidatorConfig::new().with_failure_policy(FailurePolicy::delayed(500));
        let (mut validator, completion) = TraceValidator::new(&tree, config);

        assert!(!validator.cancel_deferred_failure());
        validator.observe(&Event::new(GENERATE_BYTECODE)).unwrap();
        assert!(validator.cancel_deferred_failure());

        assert!(matches!(completion.await, Err(CompletionError::Abandoned)));
    }

    #[tokio::test]
    async fn test_drive_from_channel_with_origin_filter() {
        let tree = scriptloader::tree();
        let config = ValidatorConfig::new().with_origin(OriginFilter::exact("watchme"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let producer = tokio::spawn(async move {
            let events = [
                Event::new(LOAD_BYTECODE).with_origin("watchme"),
                Event::new(GENERATE_BYTECODE).with_origin("other-script"),
                Event::new(EXECUTE).with_origin("watchme"),
            ];
            for event in events {
                tx.send(event).unwrap();
            }
            // Keep the sender alive; drive must not wait for the channel to close.
            tx
        });

        let label = validate(&tree, config, &mut rx).await.unwrap();
        assert_eq!(label, "bytecode_exec");
        drop(producer.await.unwrap());
    }

    #[tokio::test]
    async fn test_drive_reports_incomplete_trace() {
        let err = run(&[LOAD_BYTECODE, FALLBACK]).await.unwrap_err();
        match err {
            CompletionError::Incomplete { trace } => {
                assert_eq!(trace.as_slice(), [LOAD_BYTECODE, FALLBACK]);
            }
            other => panic!("expected incomplete trace, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_observe_rejects_late_event_and_keeps_first_outcome() {
        let tree = scriptloader::tree();
        let config = ValidatorConfig::new().with_late_events(LateEventPolicy::Reject);
        let (mut validator, completion) = TraceValidator::new(&tree, config);

        validator.observe(&Event::new(LOAD_BYTECODE)).unwrap();
        validator.observe(&Event::new(EXECUTE)).unwrap();
        let err = validator.observe(&Event::new(EXECUTE)).unwrap_err();
        assert!(matches!(err, WalkError::AlreadySettled { .. }));

        // The first outcome stands.
        assert_eq!(completion.await.unwrap(), "bytecode_exec");
    }

    #[tokio::test]
    async fn test_drive_rejecting_late_events_fails_with_harness_error() {
        let tree = scriptloader::tree();
        let config = ValidatorConfig::new().with_late_events(LateEventPolicy::Reject);
        let mut source = IterSource::new([LOAD_BYTECODE, EXECUTE, EXECUTE].map(Event::new));

        let err = validate(&tree, config, &mut source).await.unwrap_err();
        match err {
            CompletionError::Harness(WalkError::AlreadySettled { event, state }) => {
                assert_eq!(event, EXECUTE);
                assert_eq!(state, "succeeded with `bytecode_exec`");
            }
            other => panic!("expected a harness error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_drive_rejecting_late_events_succeeds_on_clean_source() {
        let tree = scriptloader::tree();
        let config = ValidatorConfig::new().with_late_events(LateEventPolicy::Reject);
        let mut source = IterSource::new([LOAD_BYTECODE, EXECUTE].map(Event::new));

        let label = validate(&tree, config, &mut source).await.unwrap();
        assert_eq!(label, "bytecode_exec");
    }

    #[test]
    fn test_delayed_failure_without_runtime_is_delivered_immediately() {
        let tree = scriptloader::tree();
        let config = ValidatorConfig::new().with_failure_policy(FailurePolicy::delayed(500));
        let (mut validator, completion) = TraceValidator::new(&tree, config);

        let step = validator.observe(&Event::new(GENERATE_BYTECODE)).unwrap();
        assert!(matches!(step, Step::Diverged(_)));
        assert!(!validator.cancel_deferred_failure());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = runtime.block_on(completion).unwrap_err();
        assert_eq!(
            err.unmatched().map(|u| u.trace.as_slice()),
            Some([GENERATE_BYTECODE.to_string()].as_slice())
        );
    }

    #[tokio::test]
    async fn test_register_callbacks() {
        let tree = scriptloader::tree();
        let (mut validator, completion) = TraceValidator::new(&tree, ValidatorConfig::default());
        let (tx, rx) = tokio::sync::oneshot::channel();

        let handle = completion.register(
            move |label| {
                let _ = tx.send(label);
            },
            |unmatched| panic!("unexpected failure: {unmatched}"),
        );
        for name in [LOAD_SOURCE, ENCODE_AND_EXECUTE, BYTECODE_FAILED] {
            validator.observe(&Event::new(name)).unwrap();
        }

        handle.await.unwrap();
        assert_eq!(rx.await.unwrap(), "bytecode_failed");
    }

    #[tokio::test]
    async fn test_every_known_path_resolves_to_its_label() {
        let tree = scriptloader::tree();
        for path in tree.paths() {
            let mut source = IterSource::new(path.events.iter().cloned().map(Event::new));
            let label = validate(&tree, ValidatorConfig::default(), &mut source)
                .await
                .unwrap();
            assert_eq!(label, path.label, "{path}");
        }
    }

    #[tokio::test]
    async fn test_dropping_validator_while_pending_abandons() {
        let tree = scriptloader::tree();
        let (mut validator, completion) = TraceValidator::new(&tree, ValidatorConfig::default());
        validator.observe(&Event::new(LOAD_SOURCE)).unwrap();
        assert!(!validator.is_settled());
        drop(validator);

        assert!(matches!(completion.await, Err(CompletionError::Abandoned)));
    }
}
