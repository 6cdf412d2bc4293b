//! Error types for remuxer-av.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a remux operation.
///
/// Per-packet anomalies (timestamp collisions, inversions, drops) are never
/// surfaced here; they are repaired in place and counted in the
/// [`RemuxReport`](crate::RemuxReport).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source could not be opened or probed.
    #[error("could not open input {}: {message}", path.display())]
    SourceOpenFailed { path: PathBuf, message: String },

    /// The source opened but its streams could not be described.
    #[error("stream information unavailable for {}: {message}", path.display())]
    StreamInfoUnavailable { path: PathBuf, message: String },

    /// The output container could not be allocated.
    #[error("could not create output context for {}: {message}", path.display())]
    OutputContextFailed { path: PathBuf, message: String },

    /// An output stream could not be created from its source stream.
    #[error("failed to copy codec parameters for stream #{stream}: {message}")]
    ParameterCopyFailed { stream: usize, message: String },

    /// The output file could not be opened for writing.
    #[error("could not open output file {}: {message}", path.display())]
    OutputOpenFailed { path: PathBuf, message: String },

    /// The output header could not be written.
    #[error("failed to write output header: {0}")]
    HeaderWriteFailed(String),

    /// The source produced no packets at all.
    #[error("source contains no packets")]
    EmptySource,

    /// No selected stream carried a usable timestamp in the lookahead window.
    #[error("no valid presentation timestamp in the lookahead window")]
    NoValidTimestamp,

    /// The output backend rejected a packet.
    #[error("error muxing packet #{packet}: {message}")]
    MuxWriteFailed { packet: u64, message: String },

    /// The output trailer could not be written; the body is left in place.
    #[error("failed to write output trailer: {0}")]
    TrailerWriteFailed(String),

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a source open error.
    pub fn source_open(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SourceOpenFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a parameter copy error.
    pub fn parameter_copy(stream: usize, message: impl Into<String>) -> Self {
        Self::ParameterCopyFailed {
            stream,
            message: message.into(),
        }
    }

    /// Whether packet data may already have reached the output.
    ///
    /// Errors raised before the first body write leave nothing worth keeping,
    /// so callers may discard the partial file.
    pub fn wrote_body(&self) -> bool {
        matches!(
            self,
            Self::MuxWriteFailed { .. } | Self::TrailerWriteFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::source_open("/in/clip.mkv", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "could not open input /in/clip.mkv: No such file or directory"
        );

        let err = Error::parameter_copy(3, "Invalid argument");
        assert_eq!(
            err.to_string(),
            "failed to copy codec parameters for stream #3: Invalid argument"
        );
    }

    #[test]
    fn test_wrote_body() {
        assert!(!Error::EmptySource.wrote_body());
        assert!(!Error::NoValidTimestamp.wrote_body());
        assert!(!Error::HeaderWriteFailed("x".into()).wrote_body());
        assert!(Error::TrailerWriteFailed("x".into()).wrote_body());
        assert!(Error::MuxWriteFailed {
            packet: 7,
            message: "x".into()
        }
        .wrote_body());
    }
}
