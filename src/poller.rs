//! One poll-and-publish cycle over the watched file.

use crate::error::{Result, TailError};
use crate::lines::{read_last_lines_before, LineExtractor, TailScan};
use crate::position::PositionTracker;
use crate::subscriptions::SubscriptionManager;
use crate::types::{LogPosition, Transition};
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How the poller opens the log file for reading.
pub(crate) type OpenFile = fn(&Path) -> std::io::Result<File>;

pub(crate) fn open_file(path: &Path) -> std::io::Result<File> {
    File::open(path)
}

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// File size matched the offset.
    Unchanged,
    /// New bytes were read; `lines` complete lines were published.
    Appended { lines: usize },
    /// The file shrank; the backlog was rebuilt with `backlog_len` lines.
    Resynced { backlog_len: usize },
}

/// Sole owner of the read position and pending fragment.
///
/// Each tick stats the file, reads exactly the bytes past the offset and
/// publishes the lines they complete, in file order. The offset only moves
/// past bytes that were read and fed to the extractor, so a failed read is
/// retried from the same place on the next tick.
#[derive(Debug)]
pub struct TailPoller {
    path: PathBuf,
    tracker: PositionTracker,
    extractor: LineExtractor,
    backlog_size: usize,
    read_chunk_size: usize,
    open_file: OpenFile,
}

impl TailPoller {
    /// Poll `path`, treating the first `offset` bytes as already consumed.
    pub fn new(
        path: impl Into<PathBuf>,
        offset: u64,
        backlog_size: usize,
        read_chunk_size: usize,
    ) -> Self {
        Self {
            path: path.into(),
            tracker: PositionTracker::starting_at(offset),
            extractor: LineExtractor::new(),
            backlog_size,
            read_chunk_size: read_chunk_size.max(1),
            open_file,
        }
    }

    /// Replace how the file is opened for reads.
    pub(crate) fn with_opener(mut self, open_file: OpenFile) -> Self {
        self.open_file = open_file;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn position(&self) -> LogPosition {
        self.tracker.position()
    }

    /// Bytes read but still waiting for a newline.
    pub fn pending_fragment(&self) -> &[u8] {
        self.extractor.pending()
    }

    /// Run one cycle, publishing through `subscribers`.
    pub fn tick(&mut self, subscribers: &SubscriptionManager) -> Result<TickOutcome> {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot stat log file, skipping tick");
                return Err(TailError::storage(&self.path, e));
            }
        };

        match self.tracker.observe(size) {
            Transition::Unchanged => Ok(TickOutcome::Unchanged),
            Transition::Grew { delta } => {
                debug!(path = %self.path.display(), delta, "log file grew");
                let lines = self.read_appended(size, subscribers).map_err(|e| {
                    warn!(
                        path = %self.path.display(),
                        offset = self.tracker.current_offset(),
                        error = %e,
                        "read failed, will retry next tick"
                    );
                    e
                })?;
                Ok(TickOutcome::Appended { lines })
            }
            Transition::Shrunk { from, to } => {
                info!(path = %self.path.display(), from, to, "log file shrank, resyncing");
                Ok(self.resync(to, subscribers))
            }
        }
    }

    /// Read `[offset, end)` chunk by chunk, publishing each completed line.
    fn read_appended(&mut self, end: u64, subscribers: &SubscriptionManager) -> Result<usize> {
        let mut offset = self.tracker.current_offset();
        let storage = |e| TailError::storage(&self.path, e);

        let mut file = (self.open_file)(&self.path).map_err(storage)?;
        file.seek(SeekFrom::Start(offset)).map_err(storage)?;

        let mut buf = vec![0u8; self.read_chunk_size];
        let mut published = 0;

        while offset < end {
            let want = (end - offset).min(buf.len() as u64) as usize;
            let n = match file.read(&mut buf[..want]) {
                Ok(0) => {
                    // Shrunk under us; the next observation will catch it.
                    return Err(storage(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "log file ended before the observed size",
                    )));
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(storage(e)),
            };

            self.extractor.feed_with(&buf[..n], |line| {
                subscribers.publish(line);
                published += 1;
            });
            offset += n as u64;
            self.tracker.advance_offset(offset);
        }

        Ok(published)
    }

    /// Rebuild the backlog from the shrunken file.
    ///
    /// Reading restarts after the last complete line below `size`, so an
    /// unfinished last line is read whole once its newline arrives. A failed
    /// rebuild clears the backlog and restarts at `size`: stale lines from
    /// before the truncation must not be served as current.
    fn resync(&mut self, size: u64, subscribers: &SubscriptionManager) -> TickOutcome {
        self.extractor.reset();

        let scan = (self.open_file)(&self.path)
            .and_then(|mut file| {
                read_last_lines_before(&mut file, size, self.backlog_size, self.read_chunk_size)
            })
            .unwrap_or_else(|e| {
                let err = TailError::BacklogRebuild {
                    path: self.path.clone(),
                    source: Box::new(TailError::Io(e)),
                };
                warn!(error = %err, "clearing backlog");
                TailScan {
                    lines: Vec::new(),
                    complete_end: size,
                }
            });

        let backlog_len = scan.lines.len();
        subscribers.resync(scan.lines);
        self.tracker.reset_offset(scan.complete_end);

        TickOutcome::Resynced { backlog_len }
    }
}
