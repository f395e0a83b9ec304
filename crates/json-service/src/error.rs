use serde::{Deserialize, Serialize};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

use crate::types::{JsonRpcVersion, RequestId};

/// Boxed error type accepted from operation closures
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
}

impl ErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::ServerError(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::ServerError(_) => "Server error",
        }
    }

    /// Map a numeric code back to its kind
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -32700 => Some(ErrorCode::ParseError),
            -32600 => Some(ErrorCode::InvalidRequest),
            -32601 => Some(ErrorCode::MethodNotFound),
            -32602 => Some(ErrorCode::InvalidParams),
            -32603 => Some(ErrorCode::InternalError),
            c if (crate::error_codes::SERVER_ERROR_START..=crate::error_codes::SERVER_ERROR_END)
                .contains(&c) =>
            {
                Some(ErrorCode::ServerError(c))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// The `error` member of an error envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl ErrorObject {
    pub fn new(code: ErrorCode, message: Option<String>, data: Option<String>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(ErrorCode::ParseError, None, None)
    }

    pub fn invalid_request() -> Self {
        Self::new(ErrorCode::InvalidRequest, None, None)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotFound,
            Some(format!("Method '{}' not found", method)),
            None,
        )
    }

    pub fn internal_error(message: Option<String>, data: Option<String>) -> Self {
        Self::new(ErrorCode::InternalError, message, data)
    }
}

/// Error envelope written in place of a result.
///
/// Field order matches the wire: `jsonrpc`, `error`, `id`. The `id` is always
/// written, as `null` when the request could not be read far enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub error: ErrorObject,
    pub id: Option<RequestId>,
}

impl ErrorEnvelope {
    pub fn new(id: Option<RequestId>, error: ErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            error,
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(None, ErrorObject::parse_error())
    }

    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, ErrorObject::invalid_request())
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "jsonrpc": self.version.as_str(),
            "error": self.error,
            "id": self.id,
        })
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC Error {}: {}", self.error.code, self.error.message)
    }
}

impl std::error::Error for ErrorEnvelope {}

/// Failures raised while resolving or invoking an operation
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Service '{0}' is not registered")]
    ServiceNotFound(String),

    #[error("Method '{0}' not found")]
    MethodNotFound(String),

    #[error("Invalid params for '{method}': {reason}")]
    InvalidParams { method: String, reason: String },

    /// Application failure reported with a code from the server error range
    #[error("{message}")]
    Server { code: i64, message: String },

    #[error("{message}")]
    Internal {
        message: String,
        diagnostic: Option<String>,
        #[source]
        source: Option<BoxError>,
    },
}

impl ServiceError {
    pub fn invalid_params(method: &str, reason: impl Into<String>) -> Self {
        ServiceError::InvalidParams {
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    /// Application error with a code in `-32099..=-32000`.
    ///
    /// Returns `None` for codes outside the server error range.
    pub fn server(code: i64, message: impl Into<String>) -> Option<Self> {
        match ErrorCode::from_code(code)? {
            ErrorCode::ServerError(code) => Some(ServiceError::Server {
                code,
                message: message.into(),
            }),
            _ => None,
        }
    }

    /// Wrap a failure raised by an operation, capturing a diagnostic trace
    pub fn internal(source: BoxError) -> Self {
        let message = source.to_string();
        let diagnostic = Some(diagnostic_trace(source.as_ref()));
        ServiceError::Internal {
            message,
            diagnostic,
            source: Some(source),
        }
    }

    /// Report a panic payload caught while running an operation
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "operation panicked".to_string()
        };
        let diagnostic = Some(urlencoding::encode(&format!("panic: {}", message)).into_owned());
        ServiceError::Internal {
            message,
            diagnostic,
            source: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::InvalidRequest(_) | ServiceError::ServiceNotFound(_) => {
                ErrorCode::InvalidRequest
            }
            ServiceError::MethodNotFound(_) => ErrorCode::MethodNotFound,
            ServiceError::InvalidParams { .. } => ErrorCode::InvalidParams,
            ServiceError::Server { code, .. } => ErrorCode::ServerError(*code),
            ServiceError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    pub fn to_error_object(&self) -> ErrorObject {
        match self {
            ServiceError::MethodNotFound(method) => ErrorObject::method_not_found(method),
            ServiceError::Internal {
                message,
                diagnostic,
                ..
            } => ErrorObject::internal_error(Some(message.clone()), diagnostic.clone()),
            ServiceError::Server { message, .. } => {
                ErrorObject::new(self.code(), Some(message.clone()), None)
            }
            other => ErrorObject::new(other.code(), Some(other.to_string()), None),
        }
    }

    /// Drop the diagnostic payload, keeping the message
    pub fn without_diagnostic(self) -> Self {
        match self {
            ServiceError::Internal {
                message, source, ..
            } => ServiceError::Internal {
                message,
                diagnostic: None,
                source,
            },
            other => other,
        }
    }
}

/// Build a URL-encoded diagnostic string for an unexpected failure.
///
/// Contains the error chain and, when backtraces are enabled for the process,
/// the captured backtrace. Never fails.
pub fn diagnostic_trace(error: &(dyn StdError + 'static)) -> String {
    let mut text = format!("{:?}", error);
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str("\nCaused by: ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        text.push('\n');
        text.push_str(&backtrace.to_string());
    }
    urlencoding::encode(&text).into_owned()
}

/// Errors raised while building a service definition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Service identifier must not be empty")]
    EmptyIdentifier,

    #[error("Operation '{name}' is declared twice with parameters ({signature})")]
    AmbiguousOverload { name: String, signature: String },

    #[error("Operation '{name}' declares {declared} parameters but its handler takes {handler}")]
    ArityMismatch {
        name: String,
        declared: usize,
        handler: usize,
    },
}
