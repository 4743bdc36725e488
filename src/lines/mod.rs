//! Turning raw file bytes into [`LogLine`]s.
//!
//! Two readers share the same separator rules (`\n` or `\r\n`, empty
//! lines skipped):
//! - [`LineExtractor`] consumes appended bytes front to back, holding an
//!   unterminated fragment until its newline shows up.
//! - [`read_last_lines`] scans backward from end-of-file to recover the
//!   newest complete lines without reading the whole file.

mod bootstrap;
mod extractor;

pub use bootstrap::{read_last_lines, read_last_lines_with_chunk, DEFAULT_READ_CHUNK_SIZE};
pub use extractor::LineExtractor;

pub(crate) use bootstrap::{read_last_lines_before, TailScan};

use crate::types::LogLine;

/// Split a byte slice on `\n`, stripping `\r` and dropping empty lines.
/// A trailing unterminated piece is returned as a line too.
pub(crate) fn split_lines(bytes: &[u8]) -> impl Iterator<Item = LogLine> + '_ {
    bytes.split(|&b| b == b'\n').filter_map(LogLine::from_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_mixed_separators() {
        let lines: Vec<LogLine> = split_lines(b"a\r\nb\n\n\r\nc").collect();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }
}
