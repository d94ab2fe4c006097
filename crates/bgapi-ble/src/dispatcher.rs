//! Event fan-out.
//!
//! Events decoded by the IO task are handed to [`EventDispatcher::publish`],
//! which never blocks: every subscriber owns an unbounded queue drained by
//! its own Tokio task. A slow listener only delays itself, and a panicking
//! listener is logged and keeps receiving later events. Each subscriber sees
//! events in publish order; no ordering holds across subscribers.
//!
//! The dispatcher also feeds a [`broadcast`] channel for consumers that
//! prefer pulling events as a stream.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::packets::Response;

/// Receives unsolicited events.
///
/// Called from a dedicated task per subscriber, never from the IO task.
pub trait EventListener: Send + Sync + 'static {
    fn on_event(&self, event: &Response);
}

impl<F> EventListener for F
where
    F: Fn(&Response) + Send + Sync + 'static,
{
    fn on_event(&self, event: &Response) {
        self(event)
    }
}

/// Handle returned by [`EventDispatcher::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    queue: mpsc::UnboundedSender<Arc<Response>>,
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<Subscriber>,
}

/// Delivers events to registered listeners and to broadcast receivers.
pub struct EventDispatcher {
    subscribers: Mutex<Subscribers>,
    /// `None` once closed; receivers then observe `RecvError::Closed`.
    stream: Mutex<Option<broadcast::Sender<Arc<Response>>>>,
    runtime: Option<Handle>,
}

impl EventDispatcher {
    /// Create a dispatcher whose broadcast stream buffers `capacity` events.
    ///
    /// When created inside a Tokio runtime, listener workers run on that
    /// runtime no matter which thread later subscribes.
    pub fn new(capacity: usize) -> Self {
        let (stream, _) = broadcast::channel(capacity.max(1));
        EventDispatcher {
            subscribers: Mutex::new(Subscribers::default()),
            stream: Mutex::new(Some(stream)),
            runtime: Handle::try_current().ok(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn sender(&self) -> Option<broadcast::Sender<Arc<Response>>> {
        self.stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register a listener. May be called from any thread.
    pub fn subscribe(&self, listener: impl EventListener) -> SubscriptionId {
        self.subscribe_arc(Arc::new(listener))
    }

    pub fn subscribe_arc(&self, listener: Arc<dyn EventListener>) -> SubscriptionId {
        let (queue, rx) = mpsc::unbounded_channel::<Arc<Response>>();
        let mut subs = self.lock();
        subs.next_id += 1;
        let id = SubscriptionId(subs.next_id);

        self.spawn_worker(id, listener, rx);
        subs.entries.push(Subscriber { id, queue });
        debug!(subscription = id.0, "event listener added");
        id
    }

    /// Run the delivery loop for one subscriber on the dispatcher's runtime,
    /// the caller's runtime, or a plain thread when there is neither.
    fn spawn_worker(
        &self,
        id: SubscriptionId,
        listener: Arc<dyn EventListener>,
        mut rx: mpsc::UnboundedReceiver<Arc<Response>>,
    ) {
        match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => {
                runtime.spawn(async move {
                    while let Some(event) = rx.recv().await {
                        deliver(id, listener.as_ref(), &event);
                    }
                });
            }
            None => {
                std::thread::spawn(move || {
                    while let Some(event) = rx.blocking_recv() {
                        deliver(id, listener.as_ref(), &event);
                    }
                });
            }
        }
    }

    /// Remove a listener. Events already queued for it are still delivered.
    ///
    /// Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.lock();
        let before = subs.entries.len();
        subs.entries.retain(|s| s.id != id);
        let removed = subs.entries.len() != before;
        if removed {
            debug!(subscription = id.0, "event listener removed");
        }
        removed
    }

    /// A new receiver on the broadcast stream.
    ///
    /// After [`close`](Self::close) the receiver is already closed.
    pub fn stream(&self) -> broadcast::Receiver<Arc<Response>> {
        match self.sender() {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Queue `event` for every current subscriber. Never blocks.
    pub fn publish(&self, event: Response) {
        let event = Arc::new(event);
        let queues: Vec<(SubscriptionId, mpsc::UnboundedSender<Arc<Response>>)> = self
            .lock()
            .entries
            .iter()
            .map(|s| (s.id, s.queue.clone()))
            .collect();

        for (id, queue) in queues {
            if queue.send(Arc::clone(&event)).is_err() {
                debug!(subscription = id.0, "event listener worker gone");
            }
        }
        if let Some(sender) = self.sender() {
            // No receivers is not an error.
            let _ = sender.send(event);
        }
    }

    /// Drop every subscriber and end the broadcast stream. Workers finish
    /// the events already queued; stream receivers see the buffered events
    /// and then `RecvError::Closed`.
    pub fn close(&self) {
        let drained: Vec<Subscriber> = self.lock().entries.drain(..).collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "event listeners released");
        }
        self.stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

fn deliver(id: SubscriptionId, listener: &dyn EventListener, event: &Response) {
    let result = catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));
    if result.is_err() {
        warn!(
            subscription = id.0,
            packet = event.name(),
            "event listener panicked"
        );
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscribers", &self.subscriber_count())
            .field(
                "stream_receivers",
                &self.sender().map_or(0, |s| s.receiver_count()),
            )
            .finish()
    }
}
