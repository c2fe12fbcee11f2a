//! CLI error handling.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::Exit;

/// CLI error type with context for the user
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{message}")]
    Config {
        message: String,
        hint: Option<String>,
    },

    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
        path: Option<PathBuf>,
    },

    /// A request body could not be produced, usually an unreadable upload.
    #[error("{message}")]
    Body { message: String },

    #[error("{message}")]
    Network {
        message: String,
        #[source]
        source: courier_http::Error,
        url: Option<String>,
    },
}

impl CliError {
    pub fn io(message: impl Into<String>, source: io::Error, path: Option<PathBuf>) -> Self {
        Self::Io {
            message: message.into(),
            source,
            path,
        }
    }

    /// Attach the URL a network error was talking to.
    pub fn with_url(self, target: &str) -> Self {
        match self {
            Self::Network {
                message, source, ..
            } => Self::Network {
                message,
                source,
                url: Some(target.to_string()),
            },
            other => other,
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "E001",
            Self::Io { .. } => "E002",
            Self::Body { .. } => "E002",
            Self::Network { .. } => "E003",
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> Exit {
        match self {
            Self::Config { .. } => Exit::ConfigError,
            Self::Io { .. } | Self::Body { .. } => Exit::IoError,
            Self::Network { .. } => Exit::NetworkError,
        }
    }

    /// Get hint for this error if available
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Config { hint, .. } => hint.as_deref(),
            Self::Network { source, .. } if source.is_timeout() => {
                Some("raise --timeout or add --retries")
            }
            _ => None,
        }
    }

    /// Render the error with its code, cause chain and hint.
    pub fn render(&self) -> String {
        let mut out = format!("error[{}]: {self}", self.code());

        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(&format!("\n  caused by: {cause}"));
            source = cause.source();
        }

        match self {
            Self::Io {
                path: Some(path), ..
            } => out.push_str(&format!("\n  path: {}", path.display())),
            Self::Network { url: Some(url), .. } => out.push_str(&format!("\n  url: {url}")),
            _ => {}
        }

        if let Some(hint) = self.hint() {
            out.push_str(&format!("\n  hint: {hint}"));
        }
        out
    }
}

impl From<courier_http::Error> for CliError {
    fn from(err: courier_http::Error) -> Self {
        match err {
            courier_http::Error::InvalidConfiguration(message) => Self::Config {
                message,
                hint: None,
            },
            courier_http::Error::Encoding(message) => Self::Body { message },
            other => Self::Network {
                message: match other {
                    courier_http::Error::Transport { .. } => "request failed".to_string(),
                    _ => "failed to read the response".to_string(),
                },
                source: other,
                url: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_errors_map_to_exit_codes() {
        let err = CliError::from(courier_http::Error::InvalidConfiguration(
            "no URL set".to_string(),
        ));
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.exit_code(), Exit::ConfigError);

        let err = CliError::from(courier_http::Error::Encoding("missing file".to_string()));
        assert!(matches!(err, CliError::Body { .. }));
        assert_eq!(err.exit_code(), Exit::IoError);
    }

    #[test]
    fn test_io_error_render_includes_path() {
        let err = CliError::io(
            "failed to read body",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
            Some(PathBuf::from("body.json")),
        );
        assert_eq!(err.exit_code(), Exit::IoError);

        let rendered = err.render();
        assert!(rendered.starts_with("error[E002]: failed to read body"));
        assert!(rendered.contains("caused by: no such file"));
        assert!(rendered.contains("path: body.json"));
    }

    #[test]
    fn test_config_hint_is_rendered() {
        let err = CliError::Config {
            message: "bad config".to_string(),
            hint: Some("check the YAML syntax".to_string()),
        };
        assert!(err.render().ends_with("hint: check the YAML syntax"));
    }
}
