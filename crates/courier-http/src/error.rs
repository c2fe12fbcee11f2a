//! Error kinds surfaced by the request pipeline.

use reqwest::StatusCode;

/// Errors produced while resolving, sending, or reading a request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The builder holds a value that cannot form a valid request
    /// (proxy, URL, method, header, or structured query shape).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Every attempt failed before a response arrived.
    #[error("request failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// A request body could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encoding(String),

    /// The response body could not be fully read.
    #[error("failed to read response body: {0}")]
    Read(#[source] reqwest::Error),

    /// The response body was read but is not valid JSON for the target type.
    #[error("failed to decode JSON (status {status}): {source}")]
    Decode {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub(crate) fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub(crate) fn decode(status: StatusCode, bytes: &[u8], source: serde_json::Error) -> Self {
        Self::Decode {
            status: status.as_u16(),
            body: String::from_utf8_lossy(bytes).into_owned(),
            source,
        }
    }

    /// Whether the executor would retry this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Whether the failure was a deadline being exceeded.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport { source, .. } | Self::Read(source) => source.is_timeout(),
            _ => false,
        }
    }

    /// Number of attempts made, for transport failures.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Transport { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = Error::config("bad proxy url");
        assert_eq!(err.to_string(), "invalid configuration: bad proxy url");
        assert!(!err.is_retryable());
        assert!(!err.is_timeout());
        assert_eq!(err.attempts(), None);
    }

    #[test]
    fn test_decode_error_keeps_status_and_body() {
        let source = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err = Error::decode(StatusCode::BAD_REQUEST, b"{nope", source);

        let message = err.to_string();
        assert!(message.contains("failed to decode JSON"));
        assert!(message.contains("status 400"));
        match err {
            Error::Decode { status, body, .. } => {
                assert_eq!(status, 400);
                assert_eq!(body, "{nope");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_encoding_error_not_retryable() {
        let err = Error::encoding("unreadable file");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("unreadable file"));
    }
}
