//! Backward scan for the newest lines of a file.

use super::split_lines;
use crate::error::{Result, TailError};
use crate::types::LogLine;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Chunk size for the backward scan.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;

/// Return the last `count` non-empty lines of the file at `path`, oldest
/// first, reading backward in [`DEFAULT_READ_CHUNK_SIZE`] chunks.
pub fn read_last_lines(path: impl AsRef<Path>, count: usize) -> Result<Vec<LogLine>> {
    read_last_lines_with_chunk(path, count, DEFAULT_READ_CHUNK_SIZE)
}

/// [`read_last_lines`] with an explicit chunk size.
///
/// Stops as soon as `count` complete lines are buffered or the start of the
/// file is reached, so large files cost only a few chunks. An unterminated
/// last line is still being written and is left out.
pub fn read_last_lines_with_chunk(
    path: impl AsRef<Path>,
    count: usize,
    chunk_size: usize,
) -> Result<Vec<LogLine>> {
    let path = path.as_ref();
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut file = File::open(path).map_err(|e| TailError::storage(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| TailError::storage(path, e))?
        .len();

    read_last_lines_before(&mut file, size, count, chunk_size)
        .map(|scan| scan.lines)
        .map_err(|e| TailError::storage(path, e))
}

/// Result of a backward scan.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct TailScan {
    /// Newest complete lines, oldest first.
    pub lines: Vec<LogLine>,
    /// Byte position just past the last newline below the scan end.
    /// Anything between here and the end is an unfinished line.
    pub complete_end: u64,
}

/// Scan backward from byte `end` of an open file.
///
/// Callers that already observed a size pass it as `end`, so bytes
/// appended after the observation are left for the forward reader.
pub(crate) fn read_last_lines_before<R>(
    file: &mut R,
    end: u64,
    count: usize,
    chunk_size: usize,
) -> std::io::Result<TailScan>
where
    R: Read + Seek,
{
    if end == 0 {
        return Ok(TailScan::default());
    }

    let chunk_size = chunk_size.max(1) as u64;
    let mut position = end;
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        let read_size = chunk_size.min(position);
        position -= read_size;

        let mut chunk = vec![0u8; read_size as usize];
        file.seek(SeekFrom::Start(position))?;
        file.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&buffer);
        buffer = chunk;

        let Some(last) = buffer.iter().rposition(|&b| b == b'\n') else {
            if position == 0 {
                return Ok(TailScan::default());
            }
            continue;
        };
        let complete_end = position + last as u64 + 1;

        // Until the file start is reached, the bytes before the first
        // newline may be the tail end of a longer line.
        let start = if position == 0 {
            0
        } else {
            buffer.iter().position(|&b| b == b'\n').map_or(0, |first| first + 1)
        };
        let complete: &[u8] = if start <= last { &buffer[start..last] } else { &[] };

        if position == 0 || split_lines(complete).count() >= count {
            let lines: Vec<LogLine> = split_lines(complete).collect();
            let skip = lines.len().saturating_sub(count);
            return Ok(TailScan {
                lines: lines.into_iter().skip(skip).collect(),
                complete_end,
            });
        }
    }
}
