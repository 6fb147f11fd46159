//! Serialized delivery of native callbacks to the remote client.
//!
//! Native SDKs invoke observers on arbitrary threads. Each event ordering
//! domain owns an [`EventDispatcher`] whose single delivery task runs queued
//! producers in FIFO order, so every event of that domain reaches the sink in
//! the order its producer was enqueued. Producers run on the delivery task, not on the
//! native thread that queued them; returning `None` drops the event (e.g.
//! when the resource was disposed in between).

use log::{debug, info, warn};
use tokio::sync::{broadcast, mpsc};

type Producer<E> = Box<dyn FnOnce() -> Option<E> + Send + 'static>;

/// Final destination of dispatched events.
pub trait EventSink<E>: Send + 'static {
    /// Deliver one event. Returning `false` stops the dispatcher.
    fn deliver(&mut self, event: E) -> bool;
}

impl<E: Send + 'static> EventSink<E> for mpsc::UnboundedSender<E> {
    fn deliver(&mut self, event: E) -> bool {
        self.send(event).is_ok()
    }
}

/// Fan-out to every connected client. Having no subscriber is not an error:
/// events raised while nobody listens are dropped.
impl<E: Clone + Send + 'static> EventSink<E> for broadcast::Sender<E> {
    fn deliver(&mut self, event: E) -> bool {
        let _ = self.send(event);
        true
    }
}

/// Cloneable, thread-safe entry point of one delivery queue.
pub struct EventDispatcher<E> {
    name: &'static str,
    tx: mpsc::UnboundedSender<Producer<E>>,
}

impl<E> Clone for EventDispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<E: Send + 'static> EventDispatcher<E> {
    /// Spawn the delivery task on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn spawn<S: EventSink<E>>(name: &'static str, sink: S) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(delivery_loop(name, rx, sink));
        info!("Event dispatcher '{}' started", name);
        Self { name, tx }
    }

    /// Queue `produce` for the delivery task. Never blocks; callable from any
    /// thread.
    pub fn send<F>(&self, produce: F)
    where
        F: FnOnce() -> Option<E> + Send + 'static,
    {
        if self.tx.send(Box::new(produce)).is_err() {
            warn!("Event dispatcher '{}' has stopped; event dropped", self.name);
        }
    }

    /// Queue an already-built event.
    pub fn emit(&self, event: E) {
        self.send(move || Some(event));
    }
}

async fn delivery_loop<E, S: EventSink<E>>(
    name: &'static str,
    mut rx: mpsc::UnboundedReceiver<Producer<E>>,
    mut sink: S,
) {
    while let Some(produce) = rx.recv().await {
        let Some(event) = produce() else {
            continue;
        };
        if !sink.deliver(event) {
            warn!("Event sink of dispatcher '{}' closed", name);
            break;
        }
    }
    debug!("Event dispatcher '{}' stopped", name);
}
