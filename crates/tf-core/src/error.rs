//! Unified error type for transforged.
//!
//! Planning failures, external tool failures, and cancellation all funnel
//! into [`Error`]. The variants map onto the failure classes a caller has to
//! tell apart: validation problems surface before anything is spawned,
//! process failures carry the engine's diagnostic text, and cancellation is
//! never reported as a process failure.

use std::fmt;

/// Unified error type covering all failure modes in transforged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "media file", "preset").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Input or configuration failed validation. Always raised before any
    /// external process starts.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool could not be launched or misbehaved.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The transcoding process reported failure.
    #[error("Process error [{tool}]: {message}")]
    Process {
        /// Name of the process that failed.
        tool: String,
        /// Diagnostic text captured from the process.
        message: String,
    },

    /// The job was killed on request.
    #[error("Job cancelled")]
    Cancelled,

    /// A finalization step failed. Callers log these and keep going.
    #[error("Finalization error [{step}]: {message}")]
    Finalization {
        /// The finalization step that failed.
        step: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media probing failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Process`].
    pub fn process(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Process {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Finalization`].
    pub fn finalization(step: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Finalization {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from an explicit kill.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Convenience alias used throughout the transforged crates.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("media file", "/movies/a.mkv");
        assert_eq!(err.to_string(), "media file not found: /movies/a.mkv");
    }

    #[test]
    fn validation_display() {
        let err = Error::validation("no audio tracks");
        assert_eq!(err.to_string(), "Validation error: no audio tracks");
    }

    #[test]
    fn process_display() {
        let err = Error::process("ffmpeg", "Invalid argument");
        assert_eq!(err.to_string(), "Process error [ffmpeg]: Invalid argument");
    }

    #[test]
    fn finalization_display() {
        let err = Error::finalization("compose", "montage exited 1");
        assert_eq!(err.to_string(), "Finalization error [compose]: montage exited 1");
    }

    #[test]
    fn cancelled_is_distinct_from_process() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::process("ffmpeg", "killed").is_cancelled());
    }

    #[test]
    fn io_from_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.to_string(), "IO error: gone");
    }
}
