//! # Log Tailer
//!
//! Follows a growing text file and republishes each newly appended line to
//! any number of live subscribers. Every new subscriber first receives a
//! short backlog of the most recent lines.
//!
//! ## Core Concepts
//!
//! - **Position**: Byte offset into the file; a shrinking file means
//!   truncation or rotation and triggers a resync
//! - **Lines**: Complete, non-empty lines; a trailing fragment waits for
//!   its newline
//! - **Backlog**: Bounded ring of the newest lines, replayed on subscribe
//! - **Subscriptions**: Per-subscriber bounded queues; slow consumers are
//!   dropped, never waited on
//! - **Ticks**: One stat-read-publish cycle, driven by a timer, a file
//!   watcher or the caller
//!
//! ## Example
//!
//! ```ignore
//! use logtail::{Tailer, TailerConfig};
//!
//! let tailer = Tailer::open(TailerConfig::for_path("./app.log"))?;
//! let poller = tailer.start()?;
//!
//! let subscription = tailer.subscribe();
//! for line in subscription.lines() {
//!     println!("{}", line);
//! }
//!
//! poller.shutdown();
//! ```

pub mod backlog;
pub mod error;
pub mod lines;
pub mod poller;
pub mod position;
pub mod sse;
pub mod subscriptions;
pub mod tailer;
pub mod types;

// Re-exports
pub use backlog::{Backlog, DEFAULT_BACKLOG_SIZE};
pub use error::{Result, TailError};
pub use lines::{read_last_lines, read_last_lines_with_chunk, LineExtractor, DEFAULT_READ_CHUNK_SIZE};
pub use poller::{TailPoller, TickOutcome};
pub use position::PositionTracker;
pub use sse::SseFormat;
pub use subscriptions::{
    DropReason, Lines, SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
    TailEvent,
};
pub use tailer::{Notifier, PollerHandle, Tailer, TailerConfig, DEFAULT_POLL_INTERVAL};
pub use types::*;
