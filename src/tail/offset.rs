//! Per-file read cursor

use std::path::{Path, PathBuf};

/// A file being tailed and the number of bytes already consumed from it
///
/// Created lazily the first time the file is seen. Only one pass may hold a
/// `TrackedFile` at a time; the scheduler moves it into the pass and takes
/// it back when the pass finishes, so no lock is needed around the offset.
#[derive(Debug, Clone)]
pub struct TrackedFile {
    /// Base filename, the key subscribers register under
    name: String,
    /// Absolute path on disk
    path: PathBuf,
    /// Bytes consumed so far
    offset: u64,
}

impl TrackedFile {
    /// Start tracking a file from byte 0
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            offset: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes consumed so far
    pub fn current_offset(&self) -> u64 {
        self.offset
    }

    /// Move the cursor forward
    ///
    /// # Panics
    ///
    /// Panics if `new_offset` is behind the current offset. Going backwards
    /// is only allowed through [`reset`](Self::reset).
    pub fn advance(&mut self, new_offset: u64) {
        assert!(
            new_offset >= self.offset,
            "offset for {} moved backwards: {} -> {}",
            self.name,
            self.offset,
            new_offset
        );
        self.offset = new_offset;
    }

    /// Rewind to byte 0 after truncation or replacement
    ///
    /// Returns the offset that was discarded.
    pub fn reset(&mut self) -> u64 {
        std::mem::replace(&mut self.offset, 0)
    }
}
