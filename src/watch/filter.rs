//! Log filename recognition

use std::path::Path;

use crate::error::SessionError;

/// Recognizes servable log files by suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    suffix: String,
}

impl LogFilter {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Whether `name` is a log filename (non-empty stem plus suffix)
    pub fn matches(&self, name: &str) -> bool {
        name.len() > self.suffix.len() && name.ends_with(&self.suffix)
    }

    /// Base filename of `path` if it is a log file
    pub fn match_path(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        self.matches(name).then(|| name.to_string())
    }

    /// Check a client-supplied filename
    ///
    /// Besides the suffix, rejects anything that could address a file
    /// outside the watched directory, and characters that cannot appear in
    /// a quoted header value.
    pub fn validate(&self, name: &str) -> Result<(), SessionError> {
        let escapes = name.contains('/') || name.contains('\\') || name.contains("..");
        let unquotable = name.chars().any(|c| c == '"' || c.is_control());
        if escapes || unquotable || !self.matches(name) {
            return Err(SessionError::InvalidFilename(name.to_string()));
        }
        Ok(())
    }
}

impl Default for LogFilter {
    fn default() -> Self {
        Self::new(".log")
    }
}
