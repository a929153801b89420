//! Error types for this crate.
//!
//! All fallible operations return [`Result<T>`] which uses [`ServeError`] as the error type.
//! Startup code propagates every variant; the request boundary converts them into
//! user-facing messages instead.

use thiserror::Error;

/// A [`Result`](std::result::Result) alias using [`ServeError`] as the error type.
pub type Result<T> = std::result::Result<T, ServeError>;

/// The unified error type for all crate errors.
///
/// # Example
///
/// ```rust
/// use sentiment_serve::error::ServeError;
///
/// fn is_fatal_at_startup(e: &ServeError) -> bool {
///     match e {
///         ServeError::Config(_) | ServeError::Download(_) | ServeError::Load(_) => true,
///         ServeError::Device(_) => true,
///         _ => false,
///     }
/// }
///
/// assert!(is_fatal_at_startup(&ServeError::Config("BUCKET_NAME is not set".into())));
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ServeError {
    /// Missing or invalid settings. Never recovered.
    #[error("{0}")]
    Config(String),

    /// Object storage or network failure while fetching an artifact file.
    #[error("{0}")]
    Download(String),

    /// Tokenizer or model weights could not be loaded from the local cache.
    #[error("{0}")]
    Load(String),

    /// Tokenization failure. Check input text.
    #[error("{0}")]
    Tokenization(String),

    /// Device initialization failure.
    #[error("{0}")]
    Device(String),

    /// Forward pass or post-processing failure for a single request.
    #[error("{0}")]
    Inference(String),

    /// The engine was published twice.
    #[error("inference engine is already loaded")]
    AlreadyLoaded,

    /// Internal error. Report if seen.
    #[error("{0}")]
    Unexpected(String),
}

impl From<candle_core::Error> for ServeError {
    fn from(value: candle_core::Error) -> Self {
        ServeError::Inference(value.to_string())
    }
}

impl From<std::io::Error> for ServeError {
    fn from(value: std::io::Error) -> Self {
        ServeError::Unexpected(value.to_string())
    }
}

impl From<serde_json::Error> for ServeError {
    fn from(value: serde_json::Error) -> Self {
        ServeError::Load(value.to_string())
    }
}

impl From<object_store::Error> for ServeError {
    fn from(value: object_store::Error) -> Self {
        ServeError::Download(format!("Object store error: {value}"))
    }
}

impl From<object_store::path::Error> for ServeError {
    fn from(value: object_store::path::Error) -> Self {
        ServeError::Config(format!("Invalid object key: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_passed_through_verbatim() {
        let err = ServeError::Download("Failed to download 'vocab.txt'".into());
        assert_eq!(err.to_string(), "Failed to download 'vocab.txt'");
    }

    #[test]
    fn io_errors_become_unexpected() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(ServeError::from(io), ServeError::Unexpected(m) if m == "denied"));
    }

    #[test]
    fn object_store_errors_become_downloads() {
        let err = object_store::Error::NotFound {
            path: "ml-models/x/config.json".into(),
            source: "missing".into(),
        };
        assert!(matches!(ServeError::from(err), ServeError::Download(_)));
    }
}
