//! Incremental tailing of append-only files
//!
//! A [`TrackedFile`] remembers how many bytes of a file have been consumed.
//! [`read_new_lines`] reads only the bytes appended since then and returns
//! the complete lines found in them, advancing the cursor past the last
//! terminator and never past a trailing fragment.
//!
//! ```text
//!   file:   | consumed ........ | hello\nwor |
//!           0                offset       size
//!                                  └─ emitted: "hello"
//!                                     offset += 6, "wor" waits for its '\n'
//! ```

pub mod line;
pub mod offset;
pub mod reader;

pub use line::LogLine;
pub use offset::TrackedFile;
pub use reader::{read_new_lines, split_lines, ReadOutcome};
