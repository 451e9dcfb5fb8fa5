//! Error types of the REST client.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to read or persist the session token.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on token file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Token file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Token file {0} does not contain a JSON object")]
    NotAnObject(PathBuf),
}

/// Everything a request against the backend can end in.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response. `message` is the server's `detail` when it sent one.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// A request carrying a token was rejected with 401. The token has been cleared.
    #[error("Session expired")]
    SessionExpired,

    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ClientError {
    /// HTTP status behind the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::SessionExpired => Some(401),
            _ => None,
        }
    }

    /// The server's `detail` text, if the error came from a response that carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Http { status, message } if *message != fallback_message(*status) => {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_builder() {
            Self::Build(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for ClientError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => Self::from_transport(&e),
            reqwest_middleware::Error::Middleware(e) => e
                .chain()
                .find_map(|cause| cause.downcast_ref::<reqwest::Error>())
                .map(Self::from_transport)
                .unwrap_or_else(|| Self::Network(e.to_string())),
        }
    }
}

/// Message used for a failed status when the server sent no `detail`.
pub fn fallback_message(status: u16) -> String {
    format!("Request failed with status code {}", status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_displays_its_message() {
        let err = ClientError::Http {
            status: 404,
            message: fallback_message(404),
        };
        assert_eq!(err.to_string(), "Request failed with status code 404");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.detail(), None);

        let err = ClientError::Http {
            status: 400,
            message: "Email already registered".to_string(),
        };
        assert_eq!(err.detail(), Some("Email already registered"));
    }

    #[test]
    fn session_expiry_reports_401() {
        assert_eq!(ClientError::SessionExpired.status(), Some(401));
        assert_eq!(ClientError::Timeout.status(), None);
    }
}
