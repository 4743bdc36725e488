//! Server-sent-events framing for subscription streams.
//!
//! The HTTP side lives elsewhere; this module only turns events into
//! `text/event-stream` frames and pumps a subscription into a writer.

use crate::error::{Result, TailError};
use crate::subscriptions::{DropReason, SubscriptionHandle, TailEvent};
use crate::tailer::Tailer;
use crate::types::LogLine;
use std::io::Write;
use tracing::debug;

/// Payload style for `data:` frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SseFormat {
    /// The raw line text.
    #[default]
    Text,
    /// The event serialized as JSON, e.g. `{"type":"line","line":"..."}`.
    Json,
}

/// Frame a single line: `data: <line>\n\n`.
pub fn format_line(line: &LogLine) -> String {
    format!("data: {}\n\n", line)
}

/// Frame an event, or `None` when the event has nothing to send in this
/// format.
pub fn format_event(event: &TailEvent, format: SseFormat) -> Result<Option<String>> {
    match format {
        SseFormat::Text => Ok(match event {
            TailEvent::Line { line } => Some(format_line(line)),
            // SSE comment line: keeps the stream alive, ignored by clients.
            TailEvent::Truncated => Some(": truncated\n\n".to_string()),
            TailEvent::Dropped { .. } => None,
        }),
        SseFormat::Json => Ok(Some(format!("data: {}\n\n", serde_json::to_string(event)?))),
    }
}

/// Write the backlog and then live events from `handle` into `writer`
/// until the subscription ends.
///
/// On a write failure the subscription is removed from `tailer` before the
/// error is returned, so nothing is published to a dead sink. Returns
/// `SubscriptionDropped` if the tailer dropped a slow subscriber, `Ok` on
/// unsubscribe or shutdown.
pub fn forward<W: Write>(
    tailer: &Tailer,
    handle: SubscriptionHandle,
    writer: &mut W,
    format: SseFormat,
) -> Result<()> {
    let id = handle.id;
    let send = |event: &TailEvent, writer: &mut W| -> Result<()> {
        let Some(frame) = format_event(event, format)? else {
            return Ok(());
        };
        writer
            .write_all(frame.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| {
                tailer.unsubscribe(id);
                debug!(subscription = %id, error = %e, "client write failed, unsubscribed");
                TailError::Delivery {
                    id,
                    reason: e.to_string(),
                }
            })
    };

    for line in &handle.backlog {
        send(&TailEvent::Line { line: line.clone() }, writer)?;
    }

    while let Ok(event) = handle.recv() {
        match event {
            TailEvent::Dropped { reason } => {
                if format == SseFormat::Json {
                    // Best effort: the client is going away regardless.
                    let _ = send(&TailEvent::Dropped { reason }, writer);
                }
                return match reason {
                    DropReason::BufferOverflow | DropReason::Disconnected => {
                        Err(TailError::SubscriptionDropped(id))
                    }
                    DropReason::Unsubscribed | DropReason::Shutdown => Ok(()),
                };
            }
            event => send(&event, writer)?,
        }
    }

    Ok(())
}
