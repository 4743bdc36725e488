//! Bounded buffer of the most recent lines, replayed to new subscribers.

use crate::types::LogLine;
use std::collections::VecDeque;

/// Default number of lines kept.
pub const DEFAULT_BACKLOG_SIZE: usize = 10;

/// Ring buffer holding at most `capacity` lines, oldest first.
#[derive(Clone, Debug)]
pub struct Backlog {
    lines: VecDeque<LogLine>,
    capacity: usize,
}

impl Backlog {
    /// Create an empty backlog. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line, evicting the oldest once full.
    pub fn push(&mut self, line: LogLine) {
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Replace the contents wholesale, keeping only the newest `capacity`.
    pub fn replace<I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = LogLine>,
    {
        self.lines.clear();
        for line in lines {
            self.push(line);
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<LogLine> {
        self.lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Backlog {
    fn default() -> Self {
        Self::new(DEFAULT_BACKLOG_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(s: &str) -> LogLine {
        LogLine::new(s).unwrap()
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let mut backlog = Backlog::new(3);
        for i in 1..=5 {
            backlog.push(line(&format!("line{}", i)));
        }

        assert_eq!(backlog.len(), 3);
        assert_eq!(backlog.snapshot(), vec![line("line3"), line("line4"), line("line5")]);
    }

    #[test]
    fn test_replace_keeps_newest() {
        let mut backlog = Backlog::new(2);
        backlog.push(line("stale"));

        backlog.replace(vec![line("a"), line("b"), line("c")]);

        assert_eq!(backlog.snapshot(), vec![line("b"), line("c")]);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut backlog = Backlog::new(0);
        backlog.push(line("x"));
        backlog.push(line("y"));

        assert_eq!(backlog.capacity(), 1);
        assert_eq!(backlog.snapshot(), vec![line("y")]);
    }

    #[test]
    fn test_clear() {
        let mut backlog = Backlog::default();
        backlog.push(line("x"));
        backlog.clear();

        assert!(backlog.is_empty());
        assert_eq!(backlog.capacity(), DEFAULT_BACKLOG_SIZE);
    }
}
