//! [`MissionBus`] – broadcast channel for [`MissionEvent`]s.
//!
//! Built on [`tokio::sync::broadcast`] so any number of observers (the CLI
//! progress printer, tests) see every event without slowing the behavior
//! lane.  Publishing never blocks and never fails: an event with no
//! subscribers is simply dropped.

use porter_types::{MissionEvent, MissionEventPayload};
use tokio::sync::broadcast;
use tracing::trace;

/// Default channel capacity (events buffered before slow subscribers lag).
const DEFAULT_CAPACITY: usize = 256;

/// Shared event bus.  Clones share the same channel.
#[derive(Clone, Debug)]
pub struct MissionBus {
    sender: broadcast::Sender<MissionEvent>,
}

impl Default for MissionBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MissionBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Stamp `payload` and broadcast it.  Returns the number of subscribers
    /// that received it.
    pub fn emit(&self, source: &str, payload: MissionEventPayload) -> usize {
        let event = MissionEvent::new(source, payload);
        trace!(source, payload = ?event.payload, "mission event");
        // Best-effort publish – no subscribers is not an error.
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MissionEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscribers_is_silent() {
        let bus = MissionBus::default();
        assert_eq!(bus.emit("test", MissionEventPayload::Delivered { total: 1 }), 0);
    }

    #[test]
    fn subscribers_receive_events_in_order() {
        let bus = MissionBus::default();
        let mut rx = bus.subscribe();
        bus.emit("test", MissionEventPayload::Delivered { total: 1 });
        bus.emit("test", MissionEventPayload::Delivered { total: 2 });

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.payload, MissionEventPayload::Delivered { total: 1 });
        assert_eq!(second.payload, MissionEventPayload::Delivered { total: 2 });
        assert_eq!(first.source, "test");
    }

    #[test]
    fn clones_share_the_channel() {
        let bus = MissionBus::default();
        let mut rx = bus.subscribe();
        bus.clone()
            .emit("clone", MissionEventPayload::StallTimeout { after_ms: 10 });
        assert!(rx.try_recv().is_ok());
    }
}
