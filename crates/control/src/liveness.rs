//! Device liveness tracking
//!
//! Records the last time any message was received from each device,
//! regardless of topic. Recency is used only as a precondition for new
//! assignment: a device must have spoken within the activity window to
//! be assignable.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How recently a device must have been heard from to count as active.
pub const ACTIVITY_WINDOW: Duration = Duration::from_secs(60);

/// Last-seen bookkeeping per device ID.
pub struct LivenessTracker {
    seen: Mutex<HashMap<String, Instant>>,
    window: Duration,
}

impl LivenessTracker {
    /// Tracker with the standard 60 second activity window.
    pub fn new() -> Self {
        Self::with_window(ACTIVITY_WINDOW)
    }

    /// Tracker with a custom window, for tests.
    pub fn with_window(window: Duration) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Record that a message from this device arrived just now.
    pub fn mark_seen(&self, device_id: &str) {
        self.mark_seen_at(device_id, Instant::now());
    }

    /// Record an arrival at an explicit instant, for tests.
    pub fn mark_seen_at(&self, device_id: &str, at: Instant) {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(device_id.to_string(), at);
    }

    /// Whether this device has been heard from within the window.
    pub fn is_active(&self, device_id: &str) -> bool {
        let seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        match seen.get(device_id) {
            Some(at) => at.elapsed() <= self.window,
            None => false,
        }
    }
}

impl Default for LivenessTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseen_device_is_inactive() {
        let tracker = LivenessTracker::new();
        assert!(!tracker.is_active("d1"));
    }

    #[test]
    fn test_recent_device_is_active() {
        let tracker = LivenessTracker::new();
        tracker.mark_seen("d1");
        assert!(tracker.is_active("d1"));
        assert!(!tracker.is_active("d2"));
    }

    #[test]
    fn test_stale_device_is_inactive() {
        let tracker = LivenessTracker::with_window(Duration::from_millis(10));
        tracker.mark_seen_at("d1", Instant::now() - Duration::from_millis(50));
        assert!(!tracker.is_active("d1"));
    }
}
