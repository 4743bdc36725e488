//! Incremental line extraction from appended bytes.

use crate::types::LogLine;

/// Splits a byte stream into lines across arbitrary chunk boundaries.
///
/// Bytes after the last newline stay buffered as the pending fragment and
/// are prepended to the next `feed`. A line is never emitted before its
/// terminator has been seen.
#[derive(Debug, Default)]
pub struct LineExtractor {
    pending: Vec<u8>,
}

impl LineExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return every line it completes, in file order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<LogLine> {
        let mut lines = Vec::new();
        self.feed_with(bytes, |line| lines.push(line));
        lines
    }

    /// Like [`feed`](Self::feed) but hands each line to `emit` as soon as
    /// it is found.
    pub fn feed_with<F>(&mut self, bytes: &[u8], mut emit: F)
    where
        F: FnMut(LogLine),
    {
        let mut rest = bytes;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos);

            let line = if self.pending.is_empty() {
                LogLine::from_bytes(head)
            } else {
                self.pending.extend_from_slice(head);
                let line = LogLine::from_bytes(&self.pending);
                self.pending.clear();
                line
            };

            if let Some(line) = line {
                emit(line);
            }

            // Skip the separator itself.
            rest = &tail[1..];
        }

        self.pending.extend_from_slice(rest);
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Forget the pending fragment (the file it came from is gone).
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_chunk() {
        let mut extractor = LineExtractor::new();
        let lines = extractor.feed(b"one\ntwo\n");

        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(extractor.pending_len(), 0);
    }

    #[test]
    fn test_fragment_carried_across_feeds() {
        let mut extractor = LineExtractor::new();

        assert!(extractor.feed(b"hel").is_empty());
        assert_eq!(extractor.pending(), b"hel");

        let lines = extractor.feed(b"lo\nwor");
        assert_eq!(lines, vec!["hello"]);
        assert_eq!(extractor.pending(), b"wor");

        let lines = extractor.feed(b"ld\n");
        assert_eq!(lines, vec!["world"]);
        assert!(extractor.pending().is_empty());
    }

    #[test]
    fn test_crlf_split_between_feeds() {
        let mut extractor = LineExtractor::new();

        assert!(extractor.feed(b"abc\r").is_empty());
        let lines = extractor.feed(b"\nxyz\r\n");

        assert_eq!(lines, vec!["abc", "xyz"]);
    }

    #[test]
    fn test_empty_lines_skipped() {
        let mut extractor = LineExtractor::new();
        let lines = extractor.feed(b"\n\r\na\n\n\nb\n");

        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_unterminated_never_emitted() {
        let mut extractor = LineExtractor::new();
        assert!(extractor.feed(b"no newline yet").is_empty());
        assert!(extractor.feed(b" still none").is_empty());
        assert_eq!(extractor.pending_len(), b"no newline yet still none".len());
    }

    #[test]
    fn test_reset_drops_fragment() {
        let mut extractor = LineExtractor::new();
        extractor.feed(b"stale");
        extractor.reset();

        assert_eq!(extractor.feed(b"fresh\n"), vec!["fresh"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut extractor = LineExtractor::new();
        let lines = extractor.feed(b"ok \xff\n");

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_str(), "ok \u{FFFD}");
    }

    /// Lines a whole-buffer split would produce, ignoring the unterminated tail.
    fn expected_lines(data: &[u8]) -> Vec<String> {
        let complete = match data.iter().rposition(|&b| b == b'\n') {
            Some(end) => &data[..end],
            None => return Vec::new(),
        };
        complete
            .split(|&b| b == b'\n')
            .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
            .filter(|l| !l.is_empty())
            .map(|l| String::from_utf8(l.to_vec()).unwrap())
            .collect()
    }

    proptest! {
        #[test]
        fn prop_chunking_does_not_change_lines(
            chunks in prop::collection::vec(
                prop::collection::vec(prop::sample::select(vec![b'a', b'b', b' ', b'\r', b'\n']), 0..24),
                0..16,
            )
        ) {
            let mut extractor = LineExtractor::new();
            let mut emitted = Vec::new();
            for chunk in &chunks {
                emitted.extend(extractor.feed(chunk).into_iter().map(|l| l.as_str().to_string()));
            }

            let data: Vec<u8> = chunks.concat();
            prop_assert_eq!(&emitted, &expected_lines(&data));

            // Whatever was not emitted is exactly the unterminated tail.
            let tail_start = data.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
            prop_assert_eq!(extractor.pending(), &data[tail_start..]);
        }
    }
}
