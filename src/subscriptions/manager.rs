//! Subscription manager: backlog plus fan-out of new lines.

use crate::backlog::Backlog;
use crate::types::LogLine;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{debug, warn};

use super::types::{DropReason, SubscriptionConfig, SubscriptionHandle, SubscriptionId, TailEvent};

/// Internal subscription state.
struct Subscription {
    sender: Sender<TailEvent>,
    /// Consecutive deliveries lost to a full queue.
    missed: AtomicU32,
    max_missed: u32,
}

/// Result of a single delivery attempt.
enum Delivery {
    Sent,
    Lagged,
    Failed(DropReason),
}

impl Subscription {
    fn deliver(&self, event: TailEvent) -> Delivery {
        match self.sender.try_send(event) {
            Ok(()) => {
                self.missed.store(0, Ordering::Relaxed);
                Delivery::Sent
            }
            Err(TrySendError::Full(_)) => {
                let missed = self.missed.fetch_add(1, Ordering::Relaxed) + 1;
                if missed >= self.max_missed {
                    Delivery::Failed(DropReason::BufferOverflow)
                } else {
                    Delivery::Lagged
                }
            }
            Err(TrySendError::Disconnected(_)) => Delivery::Failed(DropReason::Disconnected),
        }
    }
}

/// Manages the backlog and the set of live subscriptions.
///
/// Lock order is backlog, then subscriptions. Publishing holds the backlog
/// lock only long enough to append the line and pin the subscriber set,
/// which is what makes subscribe's snapshot-and-register atomic.
pub struct SubscriptionManager {
    /// Most recent lines, replayed on subscribe.
    backlog: Mutex<Backlog>,
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a manager whose backlog holds `backlog_size` lines.
    pub fn new(backlog_size: usize) -> Self {
        Self::with_backlog(Backlog::new(backlog_size))
    }

    /// Create a manager around an already seeded backlog.
    pub fn with_backlog(backlog: Backlog) -> Self {
        Self {
            backlog: Mutex::new(backlog),
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new subscription.
    ///
    /// The returned handle carries the backlog as it was at registration;
    /// every line published afterwards arrives on its queue.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        let subscription = Subscription {
            sender,
            missed: AtomicU32::new(0),
            max_missed: config.max_missed.max(1),
        };

        let backlog = {
            let backlog = self.backlog.lock();
            self.subscriptions.write().insert(id, subscription);
            backlog.snapshot()
        };

        debug!(subscription = %id, backlog = backlog.len(), "subscribed");

        SubscriptionHandle {
            id,
            backlog,
            receiver,
        }
    }

    /// Unsubscribe and clean up. Returns false if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.subscriptions.write().remove(&id);
        match removed {
            Some(sub) => {
                // Best effort: the receiver may already be gone.
                let _ = sub.sender.try_send(TailEvent::Dropped {
                    reason: DropReason::Unsubscribed,
                });
                debug!(subscription = %id, "unsubscribed");
                true
            }
            None => false,
        }
    }

    /// Drop every subscription, telling each one why.
    pub fn close_all(&self, reason: DropReason) {
        let drained: Vec<_> = self.subscriptions.write().drain().collect();
        for (_, sub) in drained {
            let _ = sub.sender.try_send(TailEvent::Dropped { reason });
        }
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Copy of the current backlog, oldest first.
    pub fn backlog(&self) -> Vec<LogLine> {
        self.backlog.lock().snapshot()
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.lock().len()
    }

    // --- Publishing ---

    /// Append `line` to the backlog and offer it to every subscriber.
    ///
    /// Never blocks on a subscriber. Returns how many subscribers accepted
    /// the line.
    pub fn publish(&self, line: LogLine) -> usize {
        let subs = {
            let mut backlog = self.backlog.lock();
            backlog.push(line.clone());
            self.subscriptions.read()
        };

        let mut delivered = 0;
        let mut to_remove = Vec::new();

        for (id, sub) in subs.iter() {
            match sub.deliver(TailEvent::Line { line: line.clone() }) {
                Delivery::Sent => delivered += 1,
                Delivery::Lagged => debug!(subscription = %id, "queue full, line skipped"),
                Delivery::Failed(reason) => to_remove.push((*id, reason)),
            }
        }
        drop(subs);

        self.remove_failed(to_remove);
        delivered
    }

    /// Replace the backlog after the file shrank and notify subscribers.
    pub fn resync(&self, lines: Vec<LogLine>) {
        let subs = {
            let mut backlog = self.backlog.lock();
            backlog.replace(lines);
            self.subscriptions.read()
        };

        let mut to_remove = Vec::new();
        for (id, sub) in subs.iter() {
            if let Delivery::Failed(reason) = sub.deliver(TailEvent::Truncated) {
                to_remove.push((*id, reason));
            }
        }
        drop(subs);

        self.remove_failed(to_remove);
    }

    /// Remove subscriptions that failed delivery.
    fn remove_failed(&self, failed: Vec<(SubscriptionId, DropReason)>) {
        if failed.is_empty() {
            return;
        }

        let mut subs = self.subscriptions.write();
        for (id, reason) in failed {
            if let Some(sub) = subs.remove(&id) {
                warn!(subscription = %id, %reason, "dropping subscriber");
                // Try to notify about the drop (might fail, that's ok)
                let _ = sub.sender.try_send(TailEvent::Dropped { reason });
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::with_backlog(Backlog::default())
    }
}
