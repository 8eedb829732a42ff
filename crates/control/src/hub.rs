//! Event broadcast hub
//!
//! Fans state-change events out to an arbitrary number of live
//! observers. Each subscriber owns a bounded mailbox; publish attempts
//! a non-blocking enqueue per subscriber and ejects any subscriber
//! whose mailbox is full ("too slow") while everyone else still
//! receives the message in the same call. Ejection is immediate: the
//! subscriber's next receive returns `None` without draining whatever
//! its mailbox still holds. Publish never blocks and never silently
//! drops for subscribers that are keeping up.
//!
//! The subscriber set has its own lock, deliberately independent of
//! the registry lock; only set membership is covered by it, individual
//! delivery is a non-blocking channel send.

use skyfleet_domain::UiEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Bounded mailbox depth per subscriber.
pub const MAILBOX_CAPACITY: usize = 32;

struct SubscriberSlot {
    tx: mpsc::Sender<Arc<str>>,
    ejected: Arc<AtomicBool>,
}

struct HubInner {
    subscribers: Mutex<HashMap<u64, SubscriberSlot>>,
    next_id: AtomicU64,
}

/// Fan-out hub for serialized UI events.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    /// Hub with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new observer. Dropping the returned subscription
    /// unsubscribes.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let ejected = Arc::new(AtomicBool::new(false));
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        subscribers.insert(
            id,
            SubscriberSlot {
                tx,
                ejected: Arc::clone(&ejected),
            },
        );
        Subscription {
            id,
            rx,
            ejected,
            hub: Arc::clone(&self.inner),
        }
    }

    /// Serialize an event once and enqueue it for every subscriber.
    ///
    /// A subscriber with a full mailbox is ejected: its flag is raised
    /// and its sender dropped, so the receiving loop observes `None`
    /// on the next receive and tears the connection down without
    /// working through the backlog first.
    pub fn publish(&self, event: &UiEvent) {
        let message: Arc<str> = match serde_json::to_string(event) {
            Ok(json) => json.into(),
            Err(e) => {
                error!("Could not serialize UI event: {}", e);
                return;
            }
        };

        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let mut evicted = Vec::new();
        for (id, slot) in subscribers.iter() {
            match slot.tx.try_send(Arc::clone(&message)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Subscriber {} too slow to keep up, disconnecting", id);
                    slot.ejected.store(true, Ordering::Release);
                    evicted.push(*id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    evicted.push(*id);
                }
            }
        }
        for id in evicted {
            subscribers.remove(&id);
        }
    }

    /// Current number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One observer's mailbox.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Arc<str>>,
    ejected: Arc<AtomicBool>,
    hub: Arc<HubInner>,
}

impl Subscription {
    /// Next serialized event, or `None` once ejected/unsubscribed.
    /// After ejection any still-buffered messages are discarded.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        if self.ejected.load(Ordering::Acquire) {
            return None;
        }
        self.rx.recv().await
    }

    /// Non-blocking receive, for tests and draining.
    pub fn try_recv(&mut self) -> Option<Arc<str>> {
        if self.ejected.load(Ordering::Acquire) {
            return None;
        }
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subscribers = self.hub.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.remove(&self.id);
    }
}
