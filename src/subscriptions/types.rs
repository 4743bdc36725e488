//! Subscription types for live line delivery.

use crate::types::LogLine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max queued events per subscriber.
    /// Default: 1000
    pub buffer_size: usize,

    /// Consecutive deliveries that may hit a full queue before the
    /// subscriber is dropped. Lines that hit a full queue are lost for
    /// that subscriber only.
    /// Default: 3
    pub max_missed: u32,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            max_missed: 3,
        }
    }
}

/// Events delivered on a subscription's live queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TailEvent {
    /// A new line was appended to the file.
    Line { line: LogLine },

    /// The file shrank and the backlog was rebuilt. Lines already sent are
    /// not repeated.
    Truncated,

    /// Subscription was dropped. Always the last event, when it arrives.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Queue stayed full (slow consumer).
    BufferOverflow,
    /// Receiver went away.
    Disconnected,
    /// Explicitly unsubscribed.
    Unsubscribed,
    /// The tailer closed.
    Shutdown,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropReason::BufferOverflow => "buffer overflow",
            DropReason::Disconnected => "disconnected",
            DropReason::Unsubscribed => "unsubscribed",
            DropReason::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Backlog contents at the moment of subscribing, oldest first.
    pub backlog: Vec<LogLine>,
    /// Channel to receive live events.
    pub receiver: crossbeam_channel::Receiver<TailEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<TailEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<TailEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<TailEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Blocking iterator over the backlog snapshot followed by live lines.
    /// Ends when the subscription is dropped or its sender goes away.
    pub fn lines(&self) -> Lines<'_> {
        Lines {
            backlog: self.backlog.iter(),
            receiver: &self.receiver,
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("backlog", &self.backlog.len())
            .finish()
    }
}

/// Iterator returned by [`SubscriptionHandle::lines`].
pub struct Lines<'a> {
    backlog: std::slice::Iter<'a, LogLine>,
    receiver: &'a crossbeam_channel::Receiver<TailEvent>,
}

impl Iterator for Lines<'_> {
    type Item = LogLine;

    fn next(&mut self) -> Option<LogLine> {
        if let Some(line) = self.backlog.next() {
            return Some(line.clone());
        }

        loop {
            match self.receiver.recv() {
                Ok(TailEvent::Line { line }) => return Some(line),
                Ok(TailEvent::Truncated) => continue,
                Ok(TailEvent::Dropped { .. }) | Err(_) => return None,
            }
        }
    }
}
