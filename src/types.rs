//! Core types for the tailer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A single complete line read from the log, separators stripped.
///
/// Never empty: zero-length lines are neither emitted nor buffered.
/// Cloning is cheap, so one line can be fanned out to many subscribers.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogLine(Arc<str>);

impl LogLine {
    /// Build a line from text. Returns `None` for an empty string.
    pub fn new(text: impl AsRef<str>) -> Option<Self> {
        let text = text.as_ref();
        if text.is_empty() {
            None
        } else {
            Some(LogLine(Arc::from(text)))
        }
    }

    /// Build a line from raw bytes, replacing invalid UTF-8.
    /// A single trailing carriage return is stripped.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        Self::new(String::from_utf8_lossy(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for LogLine {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for LogLine {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for LogLine {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for LogLine {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Debug for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogLine({:?})", &*self.0)
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read position within the watched file.
///
/// `offset <= last_known_size` holds between ticks.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogPosition {
    /// Bytes consumed so far.
    pub offset: u64,
    /// File size seen at the last observation.
    pub last_known_size: u64,
}

impl LogPosition {
    pub fn at(size: u64) -> Self {
        Self {
            offset: size,
            last_known_size: size,
        }
    }

    /// Bytes known to exist past the offset.
    pub fn pending(&self) -> u64 {
        self.last_known_size.saturating_sub(self.offset)
    }
}

impl fmt::Debug for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogPosition({}/{})", self.offset, self.last_known_size)
    }
}

/// What a size observation means for the tailer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Nothing new to read.
    Unchanged,
    /// `delta` unread bytes sit past the current offset.
    Grew { delta: u64 },
    /// The file got smaller: truncated or replaced.
    Shrunk { from: u64, to: u64 },
}
