//! Failure values produced by the transport and the normalized error surfaced to callers.

use std::collections::HashMap;

use reqwest::Method;
use serde_json::Value;

/// A raw failure from the transport pipeline.
///
/// The three variants mirror the shapes a caller can tell apart: the server
/// answered with a non-success status, the request went out but nothing came
/// back, or the request never made it that far.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The server responded, but the status was not a success.
    Response {
        status: u16,
        headers: HashMap<String, String>,
        data: Value,
    },
    /// The request was sent but no response arrived (connection failure, timeout).
    NoResponse { message: String },
    /// Anything else, e.g. a request that could not be built.
    Other { message: String },
}

impl TransportError {
    /// Shorthand for an [`TransportError::Other`] failure.
    pub fn other(message: impl Into<String>) -> Self {
        TransportError::Other {
            message: message.into(),
        }
    }

    /// Shorthand for a [`TransportError::NoResponse`] failure.
    pub fn no_response(message: impl Into<String>) -> Self {
        TransportError::NoResponse {
            message: message.into(),
        }
    }

    /// Status code carried by the server response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Response { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Response { status, .. } => {
                write!(f, "Request failed with status code {}", status)
            }
            TransportError::NoResponse { message } => write!(f, "{}", message),
            TransportError::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for TransportError {}

/// Non-success statuses never reach this conversion; the transport builds
/// [`TransportError::Response`] itself from the received response.
impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() || error.is_request() {
            return TransportError::no_response(error.to_string());
        }

        TransportError::other(error.to_string())
    }
}

/// Produces the human-readable reason for a failed request.
pub fn format_error_message(error: &TransportError) -> String {
    match error {
        TransportError::Response { status, .. } => {
            format!("Server responded with status {}", status)
        }
        TransportError::NoResponse { .. } => "No response received from server".to_string(),
        TransportError::Other { message } => format!("Request failed: {}", message),
    }
}

/// The normalized failure returned by every verb method.
///
/// Its message is always `"<METHOD> request failed: <reason>"`. The raw
/// transport failure stays reachable through [`std::error::Error::source`].
#[derive(Debug, Clone)]
pub struct RequestError {
    method: Method,
    reason: String,
    source: TransportError,
}

impl RequestError {
    /// Wraps a raw failure, formatting its reason with [`format_error_message`].
    pub fn new(method: Method, source: TransportError) -> Self {
        let reason = format_error_message(&source);
        Self {
            method,
            reason,
            source,
        }
    }

    /// The HTTP method of the failed request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The formatted reason, i.e. the message without the method prefix.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// The raw failure this error was built from.
    pub fn transport_error(&self) -> &TransportError {
        &self.source
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} request failed: {}",
            self.method.as_str().to_ascii_uppercase(),
            self.reason
        )
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_format_server_response() {
        let err = TransportError::Response {
            status: 404,
            headers: HashMap::new(),
            data: Value::Null,
        };
        assert_eq!(format_error_message(&err), "Server responded with status 404");
    }

    #[test]
    fn test_format_no_response() {
        let err = TransportError::no_response("operation timed out");
        assert_eq!(format_error_message(&err), "No response received from server");
    }

    #[test]
    fn test_format_other() {
        let err = TransportError::other("relative URL without a base");
        assert_eq!(
            format_error_message(&err),
            "Request failed: relative URL without a base"
        );
    }

    #[test]
    fn test_request_error_message() {
        let err = RequestError::new(Method::GET, TransportError::no_response("timeout"));
        assert_eq!(
            err.to_string(),
            "GET request failed: No response received from server"
        );
        assert_eq!(err.reason(), "No response received from server");
    }

    #[test]
    fn test_request_error_uppercases_extension_method() {
        let method = Method::from_bytes(b"purge").unwrap();
        let err = RequestError::new(method, TransportError::other("boom"));
        assert_eq!(err.to_string(), "PURGE request failed: Request failed: boom");
    }

    #[test]
    fn test_request_error_keeps_source() {
        let raw = TransportError::Response {
            status: 500,
            headers: HashMap::new(),
            data: serde_json::json!({"error": "down"}),
        };
        let err = RequestError::new(Method::POST, raw.clone());
        assert_eq!(err.transport_error(), &raw);
        assert!(err.source().is_some());
        assert_eq!(err.transport_error().status(), Some(500));
    }
}
