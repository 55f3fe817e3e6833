//! Error types for the client.
//!
//! [`WebHdfsError`] is a definitive answer from the server and is never
//! retried. [`TransportError`] means no HTTP response was obtained at all.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Typed failure derived from a non-success HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebHdfsError {
    #[error("bad request ({status}): {message}")]
    BadRequest { status: u16, message: String },

    #[error("unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("file not found ({status}): {message}")]
    FileNotFound { status: u16, message: String },

    #[error("request failed with status {status}: {message}")]
    Generic { status: u16, message: String },
}

impl WebHdfsError {
    /// Maps a status code to its failure kind, whatever the calling context.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let code = status.as_u16();
        match status {
            StatusCode::BAD_REQUEST => WebHdfsError::BadRequest { status: code, message },
            StatusCode::UNAUTHORIZED => WebHdfsError::Unauthorized { status: code, message },
            StatusCode::NOT_FOUND => WebHdfsError::FileNotFound { status: code, message },
            _ => WebHdfsError::Generic { status: code, message },
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            WebHdfsError::BadRequest { status, .. }
            | WebHdfsError::Unauthorized { status, .. }
            | WebHdfsError::FileNotFound { status, .. }
            | WebHdfsError::Generic { status, .. } => *status,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            WebHdfsError::BadRequest { message, .. }
            | WebHdfsError::Unauthorized { message, .. }
            | WebHdfsError::FileNotFound { message, .. }
            | WebHdfsError::Generic { message, .. } => message,
        }
    }
}

/// Returns `Ok(())` when `status` is the success code for this call,
/// otherwise the typed failure for `status`.
///
/// The body is only inspected on failure, to recover the server's message.
pub fn classify(status: StatusCode, expected: StatusCode, body: &[u8]) -> std::result::Result<(), WebHdfsError> {
    if status == expected {
        return Ok(());
    }
    Err(WebHdfsError::from_status(status, remote_message(body)))
}

#[derive(Deserialize)]
struct RemoteExceptionBody {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Deserialize)]
struct RemoteException {
    #[serde(default)]
    exception: String,
    #[serde(default)]
    message: String,
}

/// Extracts the human-readable message from an error response body.
///
/// WebHDFS reports failures as `{"RemoteException": {...}}`; anything else is
/// returned as (lossy) text.
pub fn remote_message(body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<RemoteExceptionBody>(body) {
        let RemoteException { exception, message } = parsed.remote_exception;
        return match (exception.is_empty(), message.is_empty()) {
            (false, false) => format!("{}: {}", exception, message),
            (true, _) => message,
            (false, true) => exception,
        };
    }
    String::from_utf8_lossy(body).trim().to_string()
}

/// Failure to obtain any HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Refused connection, DNS failure, connect timeout.
    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    /// The connection was made but no response arrived in time.
    #[error("request timed out: {0}")]
    Timeout(#[source] BoxError),

    #[error("request failed: {0}")]
    Request(#[source] BoxError),
}

impl TransportError {
    /// Connection-level failures are the only ones worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Connect(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Connect(Box::new(err))
        } else if err.is_timeout() {
            TransportError::Timeout(Box::new(err))
        } else {
            TransportError::Request(Box::new(err))
        }
    }
}

/// Top-level error returned by every client operation.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error(transparent)]
    Remote(#[from] WebHdfsError),

    /// The server could not be reached, after retries where applicable.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid redirect location: {0}")]
    InvalidLocation(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// The typed failure, if the server gave a definitive answer.
    pub fn as_remote(&self) -> Option<&WebHdfsError> {
        match self {
            ClientError::Remote(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_400_is_bad_request() {
        let err = WebHdfsError::from_status(StatusCode::BAD_REQUEST, "");
        assert!(matches!(err, WebHdfsError::BadRequest { status: 400, .. }));
    }

    #[test]
    fn status_401_is_unauthorized() {
        let err = WebHdfsError::from_status(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err, WebHdfsError::Unauthorized { status: 401, .. }));
    }

    #[test]
    fn status_404_is_file_not_found() {
        let err = WebHdfsError::from_status(StatusCode::NOT_FOUND, "");
        assert!(matches!(err, WebHdfsError::FileNotFound { status: 404, .. }));
    }

    #[test]
    fn other_statuses_are_generic_and_keep_the_code() {
        let err = WebHdfsError::from_status(StatusCode::GATEWAY_TIMEOUT, "upstream");
        assert_eq!(err, WebHdfsError::Generic { status: 504, message: "upstream".into() });
        assert_eq!(err.status(), 504);
        assert_eq!(err.message(), "upstream");
    }

    #[test]
    fn classify_accepts_only_the_expected_code() {
        assert!(classify(StatusCode::CREATED, StatusCode::CREATED, b"").is_ok());
        assert!(classify(StatusCode::TEMPORARY_REDIRECT, StatusCode::TEMPORARY_REDIRECT, b"").is_ok());

        let err = classify(StatusCode::OK, StatusCode::CREATED, b"").unwrap_err();
        assert!(matches!(err, WebHdfsError::Generic { status: 200, .. }));
    }

    #[test]
    fn classify_failure_converts_into_client_error() {
        let outcome: std::result::Result<(), WebHdfsError> =
            classify(StatusCode::UNAUTHORIZED, StatusCode::OK, b"denied");
        let err: ClientError = outcome.unwrap_err().into();
        assert!(matches!(
            err.as_remote(),
            Some(WebHdfsError::Unauthorized { status: 401, message }) if message == "denied"
        ));
    }

    #[test]
    fn remote_exception_message_is_extracted() {
        let body = br#"{"RemoteException":{"exception":"FileNotFoundException","javaClassName":"java.io.FileNotFoundException","message":"File does not exist: /nope"}}"#;
        let err = classify(StatusCode::NOT_FOUND, StatusCode::OK, body).unwrap_err();
        assert_eq!(err.message(), "FileNotFoundException: File does not exist: /nope");
    }

    #[test]
    fn plain_text_body_is_kept_verbatim() {
        assert_eq!(remote_message(b"  gateway exploded \n"), "gateway exploded");
    }

    #[test]
    fn only_connect_failures_are_transient() {
        assert!(TransportError::Connect("refused".into()).is_transient());
        assert!(!TransportError::Timeout("slow".into()).is_transient());
        assert!(!TransportError::Request("bad".into()).is_transient());
    }

    #[test]
    fn client_error_exposes_remote_failure() {
        let err: ClientError = WebHdfsError::from_status(StatusCode::BAD_REQUEST, "x").into();
        assert_eq!(err.as_remote().map(WebHdfsError::status), Some(400));

        let err: ClientError = TransportError::Connect("refused".into()).into();
        assert!(err.as_remote().is_none());
    }
}
