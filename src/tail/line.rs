//! Line payload shared between the tailer and every subscriber

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;

/// A single complete line, without its terminator
///
/// Cheap to clone: all subscribers of a file share one allocation through
/// `Bytes` reference counting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogLine {
    data: Bytes,
}

impl LogLine {
    /// Wrap raw line bytes
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Raw bytes of the line
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Line as text, replacing invalid UTF-8 sequences
    pub fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<&'static str> for LogLine {
    fn from(s: &'static str) -> Self {
        Self::new(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for LogLine {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_roundtrip() {
        let line = LogLine::from("hello");
        assert_eq!(line.to_text(), "hello");
        assert_eq!(line.len(), 5);
        assert!(!line.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let line = LogLine::new(Bytes::from_static(&[b'o', b'k', 0xFF]));
        assert_eq!(line.to_text(), "ok\u{FFFD}");
        assert_eq!(line.as_bytes(), &[b'o', b'k', 0xFF]);
    }

    #[test]
    fn test_clone_shares_storage() {
        let line = LogLine::from(String::from("shared"));
        let copy = line.clone();
        assert_eq!(line.as_bytes().as_ptr(), copy.as_bytes().as_ptr());
    }
}
