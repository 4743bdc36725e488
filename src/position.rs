//! Read-offset bookkeeping and truncation detection.
//!
//! Pure state machine over size observations: no I/O happens here, the
//! poller stats the file and reports what it saw.

use crate::types::{LogPosition, Transition};

/// Tracks how far into the file the tailer has read.
#[derive(Debug, Default)]
pub struct PositionTracker {
    position: LogPosition,
}

impl PositionTracker {
    /// Start tracking at `size`, treating everything before it as consumed.
    pub fn starting_at(size: u64) -> Self {
        Self {
            position: LogPosition::at(size),
        }
    }

    pub fn current_offset(&self) -> u64 {
        self.position.offset
    }

    pub fn position(&self) -> LogPosition {
        self.position
    }

    /// Record a newly observed file size and classify it.
    ///
    /// A size below the last observation means truncation or replacement;
    /// the caller must rebuild its backlog and then call
    /// [`reset_offset`](Self::reset_offset). Until that happens the tracker
    /// keeps its old numbers, so repeated observations keep reporting
    /// `Shrunk`.
    pub fn observe(&mut self, new_size: u64) -> Transition {
        let last = self.position.last_known_size;

        if new_size < last {
            return Transition::Shrunk {
                from: last,
                to: new_size,
            };
        }

        self.position.last_known_size = new_size;

        if new_size > self.position.offset {
            Transition::Grew {
                delta: new_size - self.position.offset,
            }
        } else {
            Transition::Unchanged
        }
    }

    /// Move the offset forward after bytes up to `offset` were consumed.
    /// Never moves backward and never past the last observed size.
    pub fn advance_offset(&mut self, offset: u64) {
        let clamped = offset.min(self.position.last_known_size);
        if clamped > self.position.offset {
            self.position.offset = clamped;
        }
    }

    /// Resynchronize after a shrink: everything up to `size` is treated as
    /// already seen.
    pub fn reset_offset(&mut self, size: u64) {
        self.position = LogPosition::at(size);
    }
}
