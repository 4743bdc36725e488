//! Integration tests for the tailer.

use logtail::sse::{self, SseFormat};
use logtail::{LogLine, TailEvent, Tailer, TailerConfig, TickOutcome};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn test_tailer(dir: &TempDir) -> (Tailer, PathBuf) {
    let path = dir.path().join("test.txt");
    let tailer = Tailer::open(TailerConfig {
        poll_interval: Duration::from_millis(10),
        ..TailerConfig::for_path(&path)
    })
    .unwrap();
    (tailer, path)
}

fn append(path: &Path, data: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(data.as_bytes()).unwrap();
}

/// Appends numbered lines the way the demo writer does.
struct DemoWriter {
    path: PathBuf,
    next: usize,
}

impl DemoWriter {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            next: 1,
        }
    }

    fn write_line(&mut self) -> String {
        let line = format!("new data: {}", self.next);
        append(&self.path, &format!("{}\n", line));
        self.next += 1;
        line
    }
}

fn drain_lines(handle: &logtail::SubscriptionHandle) -> Vec<String> {
    handle
        .receiver
        .try_iter()
        .filter_map(|event| match event {
            TailEvent::Line { line } => Some(line.as_str().to_string()),
            _ => None,
        })
        .collect()
}

// --- Realistic Workflow Tests ---

#[test]
fn test_snapshot_plus_pushes_is_whole_history() {
    let dir = TempDir::new().unwrap();
    let (tailer, path) = test_tailer(&dir);
    let mut writer = DemoWriter::new(&path);

    let mut written = Vec::new();
    for _ in 0..4 {
        written.push(writer.write_line());
    }
    tailer.tick().unwrap();

    let handle = tailer.subscribe();

    for round in 0..5 {
        for _ in 0..round {
            written.push(writer.write_line());
        }
        tailer.tick().unwrap();
    }

    let mut seen: Vec<String> = handle.backlog.iter().map(|l| l.as_str().to_string()).collect();
    seen.extend(drain_lines(&handle));

    assert_eq!(seen, written);
}

#[test]
fn test_backlog_holds_most_recent_n() {
    let dir = TempDir::new().unwrap();
    let (tailer, path) = test_tailer(&dir);
    let mut writer = DemoWriter::new(&path);

    let written: Vec<String> = (0..25).map(|_| writer.write_line()).collect();
    assert_eq!(tailer.tick().unwrap(), TickOutcome::Appended { lines: 25 });

    let backlog = tailer.backlog();
    assert_eq!(backlog.len(), 10);
    let expected: Vec<&str> = written[15..].iter().map(String::as_str).collect();
    assert_eq!(backlog, expected);
}

#[test]
fn test_truncation_resyncs_without_replay() {
    let dir = TempDir::new().unwrap();
    let (tailer, path) = test_tailer(&dir);

    append(&path, "L1\nL2\nL3\nL4\nL5\n");
    tailer.tick().unwrap();
    let handle = tailer.subscribe();
    assert_eq!(handle.backlog.len(), 5);

    fs::write(&path, "").unwrap();
    append(&path, "L6\n");

    assert_eq!(
        tailer.tick().unwrap(),
        TickOutcome::Resynced { backlog_len: 1 }
    );
    assert_eq!(tailer.backlog(), vec!["L6"]);
    assert_eq!(tailer.tick().unwrap(), TickOutcome::Unchanged);

    // Existing subscriber hears about the truncation, not the old lines.
    let events: Vec<TailEvent> = handle.receiver.try_iter().collect();
    assert_eq!(events, vec![TailEvent::Truncated]);

    // A new subscriber sees only post-truncation history.
    let late = tailer.subscribe();
    assert_eq!(late.backlog, vec!["L6"]);

    append(&path, "L7\n");
    tailer.tick().unwrap();
    assert_eq!(drain_lines(&late), vec!["L7"]);
}

#[test]
fn test_early_and_late_subscribers() {
    let dir = TempDir::new().unwrap();
    let (tailer, path) = test_tailer(&dir);

    append(&path, "before\n");
    tailer.tick().unwrap();

    let a = tailer.subscribe();
    append(&path, "L_k\n");
    tailer.tick().unwrap();
    let b = tailer.subscribe();

    assert_eq!(drain_lines(&a), vec!["L_k"]);
    assert!(drain_lines(&b).is_empty());
    assert_eq!(b.backlog, vec!["before", "L_k"]);
}

#[test]
fn test_reopen_seeds_from_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.txt");
    fs::write(&path, "one\r\ntwo\r\nthree\r\n").unwrap();

    let tailer = Tailer::open(TailerConfig::for_path(&path)).unwrap();
    let handle = tailer.subscribe();
    assert_eq!(handle.backlog, vec!["one", "two", "three"]);

    // Existing content is history, not news.
    assert_eq!(tailer.tick().unwrap(), TickOutcome::Unchanged);
}

#[test]
fn test_background_poller_delivers() {
    let dir = TempDir::new().unwrap();
    let (tailer, path) = test_tailer(&dir);
    let handle = tailer.subscribe();
    let poller = tailer.start().unwrap();

    let mut writer = DemoWriter::new(&path);
    let written: Vec<String> = (0..3).map(|_| writer.write_line()).collect();

    let mut received = Vec::new();
    while received.len() < written.len() {
        match handle.recv_timeout(Duration::from_secs(5)).unwrap() {
            TailEvent::Line { line } => received.push(line.as_str().to_string()),
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert_eq!(received, written);

    poller.shutdown();
}

#[test]
fn test_sse_forward_streams_frames() {
    let dir = TempDir::new().unwrap();
    let (tailer, path) = test_tailer(&dir);
    append(&path, "history\n");
    tailer.tick().unwrap();

    let handle = tailer.subscribe();
    let id = handle.id;

    let client = {
        let tailer = tailer.clone();
        std::thread::spawn(move || {
            let mut out = Vec::new();
            sse::forward(&tailer, handle, &mut out, SseFormat::Text).unwrap();
            out
        })
    };

    append(&path, "live\n");
    tailer.tick().unwrap();
    tailer.unsubscribe(id);

    let out = client.join().unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "data: history\n\ndata: live\n\n"
    );
}

#[test]
fn test_lines_iterator_reads_backlog_then_live() {
    let dir = TempDir::new().unwrap();
    let (tailer, path) = test_tailer(&dir);
    append(&path, "a\nb\n");
    tailer.tick().unwrap();

    let handle = tailer.subscribe();
    append(&path, "c\n");
    tailer.tick().unwrap();
    tailer.close();

    let lines: Vec<LogLine> = handle.lines().collect();
    assert_eq!(lines, vec!["a", "b", "c"]);
    assert_eq!(tailer.subscriber_count(), 0);
}
