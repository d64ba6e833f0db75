use async_trait::async_trait;
use tokio::sync::mpsc;

/// Represents a source of events (e.g., a channel fed by the harness, a recorded file).
#[async_trait]
pub trait EventSource<E>: Send {
    /// Returns the next event, or None if the source is exhausted/closed.
    async fn next_event(&mut self) -> Option<E>;
}

#[async_trait]
impl<E: Send> EventSource<E> for mpsc::Receiver<E> {
    async fn next_event(&mut self) -> Option<E> {
        self.recv().await
    }
}

#[async_trait]
impl<E: Send> EventSource<E> for mpsc::UnboundedReceiver<E> {
    async fn next_event(&mut self) -> Option<E> {
        self.recv().await
    }
}

/// Adapts an iterator (e.g. a recorded trace) into an [`EventSource`].
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    inner: I,
}

impl<I> IterSource<I> {
    pub fn new<T>(events: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            inner: events.into_iter(),
        }
    }
}

#[async_trait]
impl<I, E> EventSource<E> for IterSource<I>
where
    I: Iterator<Item = E> + Send,
    E: Send,
{
    async fn next_event(&mut self) -> Option<E> {
        self.inner.next()
    }
}
