//! Status-carrying API errors.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::Serialize;

/// Boxed error returned by handlers and argument providers.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Reason exposed for errors that do not carry their own.
pub const UNKNOWN_REASON: &str = "unknown";

/// An error with an HTTP status, an internal message and a public reason.
///
/// The message is what ends up in logs; only the reason is sent to the
/// client, as `{"status":<code>,"reason":"<reason>"}`.
#[derive(Clone, Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    reason: String,
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

/// Wire format of an error response.
#[derive(Serialize)]
struct ErrorBody<'a> {
    status: u16,
    reason: &'a str,
}

impl ApiError {
    /// Create an error with distinct log message and public reason.
    pub fn new(status: StatusCode, message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Create an error whose public reason is the generic `"unknown"`.
    pub fn from_message(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, message, UNKNOWN_REASON)
    }

    /// Wrap an underlying error; its text becomes the log message.
    pub fn wrap<E>(status: StatusCode, err: E, reason: impl Into<String>) -> Self
    where
        E: Into<BoxError>,
    {
        let err: BoxError = err.into();
        Self {
            status,
            message: err.to_string(),
            reason: reason.into(),
            source: Some(Arc::from(err)),
        }
    }

    /// Shorthand for a 400 error where message and reason are the same.
    pub fn bad_request(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(StatusCode::BAD_REQUEST, reason.clone(), reason)
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Encoded JSON body, newline terminated.
    pub fn body(&self) -> Vec<u8> {
        error_body(self.status, &self.reason)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// Encode `{"status":..,"reason":..}\n`.
pub fn error_body(status: StatusCode, reason: &str) -> Vec<u8> {
    let body = ErrorBody {
        status: status.as_u16(),
        reason,
    };
    let mut buf = serde_json::to_vec(&body)
        .unwrap_or_else(|_| format!("{{\"status\":{}}}", status.as_u16()).into_bytes());
    buf.push(b'\n');
    buf
}

/// Find the first [`ApiError`] in an error's source chain.
pub fn find_api_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a ApiError> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(api) = e.downcast_ref::<ApiError>() {
            return Some(api);
        }
        current = e.source();
    }
    None
}

/// Build an [`ApiError`] with a formatted message and the `"unknown"` reason.
///
/// ```rust,ignore
/// return Err(api_error!(StatusCode::NOT_FOUND, "user {} not found", id).into());
/// ```
#[macro_export]
macro_rules! api_error {
    ($status:expr, $($arg:tt)+) => {
        $crate::core::ApiError::from_message($status, format!($($arg)+))
    };
}
