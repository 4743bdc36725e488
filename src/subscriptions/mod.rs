//! Live fan-out of tailed lines to subscribers.
//!
//! Every subscriber gets its own bounded queue:
//! - On subscribe, the current backlog is captured and the subscriber is
//!   registered in one step, so no line is missed or seen twice.
//! - Publishing never blocks. A full queue costs that subscriber the line;
//!   too many misses in a row and it is dropped.
//! - A subscriber whose receiver is gone is removed on the next publish.
//!
//! # Example
//!
//! ```ignore
//! let manager = SubscriptionManager::new(10);
//! let handle = manager.subscribe(SubscriptionConfig::default());
//!
//! for line in handle.lines() {
//!     println!("{}", line);
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, Lines, SubscriptionConfig, SubscriptionHandle, SubscriptionId, TailEvent,
};
