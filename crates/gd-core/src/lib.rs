//! Shared primitives used across gemdust crates.

use core::fmt;

mod geometry;

pub use geometry::Int2;
pub use geometry::RangeI;
pub use geometry::Rect;

/// Result alias used across the workspace.
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Top-level error type carrying a stable dotted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserError {
    pub code: &'static str,
    pub message: String,
}

impl BrowserError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Wraps an I/O failure, keeping the operating system's error text.
    pub fn io(code: &'static str, context: impl fmt::Display, error: &std::io::Error) -> Self {
        Self::new(code, format!("{context}: {error}"))
    }
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for BrowserError {}

#[cfg(test)]
mod tests {
    use super::BrowserError;

    #[test]
    fn display_prefixes_code() {
        let error = BrowserError::new("net.url.invalid", "missing scheme");
        assert_eq!(error.to_string(), "net.url.invalid: missing scheme");
    }

    #[test]
    fn io_errors_keep_system_text() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error = BrowserError::io("storage.download_write_failed", "/tmp/x", &io);
        assert_eq!(error.code, "storage.download_write_failed");
        assert!(error.message.ends_with("Permission denied"));
    }
}
