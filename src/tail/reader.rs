//! Incremental reader
//!
//! Reads the byte range `[offset, size)` of a tracked file and splits it into
//! complete lines. Blocking I/O; callers on the async runtime run it through
//! `spawn_blocking`.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use bytes::Bytes;

use super::line::LogLine;
use super::offset::TrackedFile;

/// Result of one read pass over a file
#[derive(Debug, Default)]
pub struct ReadOutcome {
    /// Complete, non-empty lines in file order
    pub lines: Vec<LogLine>,
    /// Bytes consumed, up to and including the last terminator
    pub consumed: u64,
    /// Offset that was discarded because the file shrank
    pub truncated_from: Option<u64>,
}

/// Read the lines appended to `tracked` since the last pass
///
/// A trailing fragment without a terminator is left unread and picked up by
/// a later pass once its `\n` arrives. If the file is smaller than the
/// tracked offset it was truncated or replaced, and the whole current
/// content is treated as new.
///
/// On error the offset is left untouched so the next trigger retries.
pub fn read_new_lines(tracked: &mut TrackedFile) -> io::Result<ReadOutcome> {
    let mut file = File::open(tracked.path())?;
    let size = file.metadata()?.len();

    let current = tracked.current_offset();
    let truncated = size < current;
    let start = if truncated { 0 } else { current };

    let mut outcome = ReadOutcome::default();

    if size > start {
        file.seek(SeekFrom::Start(start))?;
        let mut buf = Vec::new();
        file.take(size - start).read_to_end(&mut buf)?;

        let (lines, consumed) = split_lines(Bytes::from(buf));
        outcome.lines = lines;
        outcome.consumed = consumed as u64;
    }

    if truncated {
        outcome.truncated_from = Some(tracked.reset());
        tracing::warn!(
            file = %tracked.name(),
            previous_offset = current,
            size = size,
            "File shrank, re-reading from start"
        );
    }
    tracked.advance(start + outcome.consumed);

    Ok(outcome)
}

/// Split a buffer into complete lines
///
/// Returns the lines and the number of bytes they occupy including
/// terminators. Bytes after the last `\n` are not consumed. A `\r` before
/// the terminator is stripped and empty lines are dropped.
pub fn split_lines(data: Bytes) -> (Vec<LogLine>, usize) {
    let Some(last) = data.iter().rposition(|&b| b == b'\n') else {
        return (Vec::new(), 0);
    };

    let complete = data.slice(..last);
    let lines = complete
        .split(|&b| b == b'\n')
        .map(|segment| segment.strip_suffix(b"\r").unwrap_or(segment))
        .filter(|segment| !segment.is_empty())
        .map(|segment| LogLine::new(complete.slice_ref(segment)))
        .collect();

    (lines, last + 1)
}
