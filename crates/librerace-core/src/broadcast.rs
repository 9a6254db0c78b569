//! Snapshot Broadcast Fan-Out
//!
//! One bounded mailbox per subscriber, decoupling the tick loop from
//! subscriber delivery speed. Publishing is try-send only: a full
//! mailbox means that subscriber misses this tick's update (drop-newest
//! policy); nothing ever blocks or retries, and a subscriber that
//! disconnects between publish and drain is cleaned up lazily.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::race::RaceSnapshot;

/// Default pending-snapshot capacity per subscriber
pub const DEFAULT_MAILBOX_CAPACITY: usize = 10;

/// Opaque handle identifying one subscriber's mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Fan-out of per-tick snapshots to every registered subscriber.
///
/// The subscriber map sits behind a plain mutex: every critical section
/// is a handful of map operations with no await inside, so the tick
/// task and connection tasks contend only briefly.
pub struct Broadcaster {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Arc<RaceSnapshot>>>>,
    capacity: usize,
}

impl Broadcaster {
    /// Broadcaster with the given per-subscriber mailbox capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a new mailbox; the receiver is the subscriber's end
    pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<Arc<RaceSnapshot>>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = SubscriberId(Uuid::new_v4());
        self.subscribers
            .lock()
            .expect("subscriber map poisoned")
            .insert(id, tx);
        debug!(subscriber = %id, "subscriber registered");
        (id, rx)
    }

    /// Deregister a mailbox, closing it.
    ///
    /// Safe to call for an id that was already removed.
    pub fn unsubscribe(&self, id: SubscriberId) {
        if self
            .subscribers
            .lock()
            .expect("subscriber map poisoned")
            .remove(&id)
            .is_some()
        {
            debug!(subscriber = %id, "subscriber deregistered");
        }
    }

    /// Offer one snapshot to every mailbox.
    ///
    /// Full mailboxes skip this update for that subscriber only; closed
    /// mailboxes (subscriber went away mid-publish) are removed here.
    pub fn publish(&self, snapshot: Arc<RaceSnapshot>) {
        let mut gone = Vec::new();
        {
            let subscribers = self.subscribers.lock().expect("subscriber map poisoned");
            for (id, tx) in subscribers.iter() {
                match tx.try_send(Arc::clone(&snapshot)) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!(subscriber = %id, tick = snapshot.tick, "mailbox full, update dropped");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        gone.push(*id);
                    }
                }
            }
        }
        for id in gone {
            self.unsubscribe(id);
        }
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber map poisoned")
            .len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_MAILBOX_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::{RacePhase, RaceSnapshot};

    fn snapshot(tick: u64) -> Arc<RaceSnapshot> {
        Arc::new(RaceSnapshot {
            tick,
            status: RacePhase::Racing,
            total_laps: 3,
            race_time_ms: tick * 16,
            time_left_s: 0,
            cars: Vec::new(),
            penalties: Vec::new(),
            intervals_to_leader: Vec::new(),
            intervals_ahead: Vec::new(),
        })
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_snapshot() {
        let broadcaster = Broadcaster::default();
        let (_id, mut rx) = broadcaster.subscribe();

        broadcaster.publish(snapshot(1));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.tick, 1);
    }

    #[tokio::test]
    async fn test_full_mailbox_drops_newest() {
        let broadcaster = Broadcaster::new(2);
        let (_id, mut rx) = broadcaster.subscribe();

        for tick in 1..=5 {
            broadcaster.publish(snapshot(tick));
        }

        // Only the first two fit; later updates were dropped
        assert_eq!(rx.recv().await.unwrap().tick, 1);
        assert_eq!(rx.recv().await.unwrap().tick, 2);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stalled_subscriber_does_not_affect_others() {
        let broadcaster = Broadcaster::new(2);
        let (_stalled, _stalled_rx) = broadcaster.subscribe();
        let (_live, mut live_rx) = broadcaster.subscribe();

        for tick in 1..=20 {
            broadcaster.publish(snapshot(tick));
            // The live subscriber drains every tick
            assert_eq!(live_rx.recv().await.unwrap().tick, tick);
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_mailbox() {
        let broadcaster = Broadcaster::default();
        let (id, mut rx) = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.unsubscribe(id);
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_cleaned_up_on_publish() {
        let broadcaster = Broadcaster::default();
        let (_id, rx) = broadcaster.subscribe();
        drop(rx);

        // Publish races the disconnect: no panic, subscriber removed
        broadcaster.publish(snapshot(1));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
