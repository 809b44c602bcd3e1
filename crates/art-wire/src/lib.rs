//! The Wire: a fan-out event channel shared across a root execution and all
//! of its nested children. Readers observe events in the order writes
//! complete; once closed, further writes are silently discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use art_types::Event;
use futures_core::Stream;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

const DEFAULT_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
enum WireMessage {
    Event(Event),
    Closed,
}

struct WireInner {
    sender: broadcast::Sender<WireMessage>,
    closed: AtomicBool,
}

/// Multi-producer, multi-consumer event channel with a close state.
///
/// Cloning a `Wire` shares the same underlying channel; this is how nested
/// `ExecutionContext`s obtain "the same Wire" as their parent without
/// threading a reference through every call site.
#[derive(Clone)]
pub struct Wire {
    inner: Arc<Mutex<WireInner>>,
}

impl Default for Wire {
    fn default() -> Self {
        Self::new()
    }
}

impl Wire {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(Mutex::new(WireInner { sender, closed: AtomicBool::new(false) })),
        }
    }

    /// Write an event. Serialized across concurrent producers by the guard
    /// on the inner sender; a no-op once the wire has been closed.
    pub fn write(&self, event: Event) {
        let inner = self.inner.lock();
        if inner.closed.load(Ordering::Acquire) {
            return;
        }
        // A broadcast send fails only when there are zero receivers; that is
        // a normal, ignorable condition for a fan-out bus with no observers.
        let _ = inner.sender.send(WireMessage::Event(event));
    }

    /// Signal end-of-stream to all current and future subscribers. Already
    /// buffered events are still delivered before the stream ends. Idempotent.
    pub fn close(&self) {
        let inner = self.inner.lock();
        if inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(subscribers = inner.sender.receiver_count(), "wire closed");
        let _ = inner.sender.send(WireMessage::Closed);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed.load(Ordering::Acquire)
    }

    /// Subscribe to this wire. A subscriber joining after the wire has
    /// already closed observes an immediately-ended stream rather than
    /// stale events it could never have causally seen.
    pub fn subscribe(&self) -> impl Stream<Item = Event> + Send + 'static {
        let inner = self.inner.lock();
        if inner.closed.load(Ordering::Acquire) {
            return WireStream { inner: None };
        }
        let rx = inner.sender.subscribe();
        WireStream { inner: Some(BroadcastStream::new(rx)) }
    }
}

struct WireStream {
    inner: Option<BroadcastStream<WireMessage>>,
}

impl Stream for WireStream {
    type Item = Event;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        loop {
            let Some(stream) = self.inner.as_mut() else {
                return Poll::Ready(None);
            };
            match std::pin::Pin::new(stream).poll_next(cx) {
                Poll::Ready(Some(Ok(WireMessage::Event(event)))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Ok(WireMessage::Closed))) => {
                    self.inner = None;
                    return Poll::Ready(None);
                }
                // A lagged subscriber drops the oldest undelivered messages
                // and continues; the wire makes no stronger ordering promise
                // than best-effort completeness across slow consumers.
                Poll::Ready(Some(Err(lagged))) => {
                    tracing::warn!(%lagged, "wire subscriber lagged, events dropped");
                    continue;
                }
                Poll::Ready(None) => {
                    self.inner = None;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
