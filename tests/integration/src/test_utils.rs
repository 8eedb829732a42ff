//! Shared fixtures for the end-to-end scenarios

use serde_json::Value;
use std::sync::Arc;

use skyfleet_control::testing::{RecordingBus, RecordingStore};
use skyfleet_control::{ControlPlane, Subscription};

/// A control plane wired to recording doubles for both adapters.
pub struct Station {
    pub plane: Arc<ControlPlane>,
    pub bus: Arc<RecordingBus>,
    pub store: Arc<RecordingStore>,
}

impl Station {
    /// Fresh station with empty state and adapters that accept
    /// everything.
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt::try_init();
        let bus = Arc::new(RecordingBus::new());
        let store = Arc::new(RecordingStore::new());
        let plane = Arc::new(ControlPlane::new(bus.clone(), store.clone()));
        Station { plane, bus, store }
    }

    /// Deliver a raw device report the way the message transport
    /// would: `devices/{device_id}/{topic}` with a JSON body.
    pub async fn device_report(&self, device_id: &str, topic: &str, body: Value) {
        self.plane
            .handle_device_event(device_id, topic, body.to_string().as_bytes())
            .await;
    }

    /// Mark a device recently heard from so it passes the assignment
    /// activity check.
    pub fn activate(&self, device_id: &str) {
        self.plane.liveness().mark_seen(device_id);
    }
}

impl Default for Station {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain everything currently queued on a subscription, parsed.
pub fn drain_events(subscription: &mut Subscription) -> Vec<Value> {
    let mut events = Vec::new();
    while let Some(message) = subscription.try_recv() {
        events.push(serde_json::from_str(&message).unwrap());
    }
    events
}

/// Just the `event` tags, in delivery order.
pub fn event_names(events: &[Value]) -> Vec<String> {
    events
        .iter()
        .map(|e| e["event"].as_str().unwrap().to_string())
        .collect()
}
