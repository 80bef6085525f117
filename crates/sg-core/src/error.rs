//! Unified error type for the shortgen workspace.
//!
//! All crates funnel their failures into [`Error`]. The batch controller uses
//! [`Error::is_fatal`] to tell a dead engine apart from a single failed batch.

use std::fmt;

use crate::media::SegmentWindow;

/// Unified error type covering all failure modes in shortgen.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transcoding engine could not be brought up. Fatal for the session.
    #[error("Engine initialization failed: {0}")]
    Initialization(String),

    /// One transcode job failed; the batch it belonged to is aborted.
    #[error("Transcode failed for {window}: {cause}")]
    Transcode {
        /// The window whose job failed.
        window: SegmentWindow,
        /// Engine-level description of what went wrong.
        cause: String,
    },

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Input data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "artifact", "engine file").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Work stopped because its cancellation token fired.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the session cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Initialization(_))
    }

    /// Short message suitable for showing to the person driving the session.
    pub fn user_message(&self) -> String {
        match self {
            Error::Initialization(_) => {
                "Failed to initialize video engine. Please restart and try again.".into()
            }
            Error::Transcode { window, .. } => {
                format!("Failed to generate clip {}.", window.index)
            }
            Error::Cancelled(_) => "Generation was cancelled.".into(),
            other => other.to_string(),
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Transcode`].
    pub fn transcode(window: SegmentWindow, cause: impl fmt::Display) -> Self {
        Error::Transcode {
            window,
            cause: cause.to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> SegmentWindow {
        SegmentWindow {
            index: 2,
            start_secs: 15.0,
            duration_secs: 15.0,
        }
    }

    #[test]
    fn initialization_is_fatal() {
        let err = Error::Initialization("ffmpeg missing".into());
        assert_eq!(err.to_string(), "Engine initialization failed: ffmpeg missing");
        assert!(err.is_fatal());
        assert!(err.user_message().contains("initialize"));
    }

    #[test]
    fn transcode_display_carries_window() {
        let err = Error::transcode(window(), "crop out of bounds");
        assert_eq!(
            err.to_string(),
            "Transcode failed for window #2 (15s +15s): crop out of bounds"
        );
        assert!(!err.is_fatal());
        assert_eq!(err.user_message(), "Failed to generate clip 2.");
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exit code 1");
        assert!(!err.is_fatal());
    }

    #[test]
    fn not_found_display() {
        let err = Error::not_found("artifact", "abc-123");
        assert_eq!(err.to_string(), "artifact not found: abc-123");
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn cancelled_display() {
        let err = Error::Cancelled("session reset".into());
        assert_eq!(err.to_string(), "Cancelled: session reset");
        assert_eq!(err.user_message(), "Generation was cancelled.");
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(ok_fn().unwrap(), 42);

        fn err_fn() -> Result<i32> {
            Err(Error::Internal("boom".into()))
        }
        assert!(err_fn().is_err());
    }
}
