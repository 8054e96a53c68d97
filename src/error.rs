//! Error types for the SoR connector kit
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Errors fall into four classes (see [`ErrorClass`]):
//! - caller errors (malformed cursor, bad configuration), never retried
//! - retryable upstream failures (429, 5xx, timeouts, deadline expiry)
//! - fatal upstream failures (auth, other 4xx, unexpected shapes)
//! - record errors (attribute coercion), absorbed below the page boundary

use thiserror::Error;

/// The main error type for the SoR connector kit
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Cursor Errors
    // ============================================================================
    #[error("Malformed cursor: {message}")]
    MalformedCursor { message: String },

    // ============================================================================
    // Upstream Errors (classified at the paginator boundary)
    // ============================================================================
    #[error("Upstream call failed for {frame}: {message}")]
    UpstreamFatal { frame: String, message: String },

    #[error("Upstream call for {frame} failed transiently, retry the request: {message}")]
    UpstreamRetryable { frame: String, message: String },

    #[error("Deadline exceeded after {timeout_ms}ms waiting on {frame}")]
    DeadlineExceeded { frame: String, timeout_ms: u64 },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("JSONPath error: {message}")]
    JsonPath { message: String },

    #[error("Failed to decode upstream response: {message}")]
    Decode { message: String },

    #[error("Cannot convert attribute '{attribute}': {message}")]
    AttributeCoercion { attribute: String, message: String },

    // ============================================================================
    // Template Errors
    // ============================================================================
    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Coarse classification used to decide who acts on an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself is wrong (cursor, config); retrying cannot help
    Caller,
    /// Transient upstream condition; re-issue the identical request
    Retryable,
    /// Permanent upstream or internal failure
    Fatal,
    /// Affects a single record only
    Record,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a malformed cursor error
    pub fn malformed_cursor(message: impl Into<String>) -> Self {
        Self::MalformedCursor {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a JSONPath error
    pub fn json_path(message: impl Into<String>) -> Self {
        Self::JsonPath {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an attribute coercion error
    pub fn coercion(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AttributeCoercion {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Create a template error
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Wrap a paginator failure with the frame it happened in.
    ///
    /// Already classified errors pass through unchanged.
    pub fn upstream(frame: impl Into<String>, source: Error) -> Self {
        match source {
            Error::UpstreamFatal { .. } | Error::UpstreamRetryable { .. } => source,
            other if other.is_retryable() => Error::UpstreamRetryable {
                frame: frame.into(),
                message: other.to_string(),
            },
            other => Error::UpstreamFatal {
                frame: frame.into(),
                message: other.to_string(),
            },
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimited { .. }
            | Error::Timeout { .. }
            | Error::DeadlineExceeded { .. }
            | Error::UpstreamRetryable { .. } => true,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::MalformedCursor { .. }
            | Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_)
            | Error::Template { .. }
            | Error::UndefinedVariable { .. } => ErrorClass::Caller,
            Error::AttributeCoercion { .. } => ErrorClass::Record,
            e if e.is_retryable() => ErrorClass::Retryable,
            _ => ErrorClass::Fatal,
        }
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for the SoR connector kit
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("entities");
        assert_eq!(err.to_string(), "Missing required config field: entities");

        let err = Error::malformed_cursor("not base64");
        assert_eq!(err.to_string(), "Malformed cursor: not base64");

        let err = Error::coercion("active", "expected bool");
        assert_eq!(
            err.to_string(),
            "Cannot convert attribute 'active': expected bool"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::RateLimited {
            retry_after_seconds: 60
        }
        .is_retryable());
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::DeadlineExceeded {
            frame: "users".to_string(),
            timeout_ms: 10
        }
        .is_retryable());
        assert!(Error::http_status(429, "").is_retryable());
        assert!(Error::http_status(503, "").is_retryable());

        assert!(!Error::http_status(400, "").is_retryable());
        assert!(!Error::http_status(401, "").is_retryable());
        assert!(!Error::malformed_cursor("x").is_retryable());
    }

    #[test]
    fn test_upstream_classification() {
        let err = Error::upstream("collection 'users'", Error::http_status(503, "busy"));
        assert!(matches!(err, Error::UpstreamRetryable { .. }));
        assert_eq!(err.class(), ErrorClass::Retryable);

        let err = Error::upstream("collection 'users'", Error::http_status(403, "denied"));
        assert!(matches!(err, Error::UpstreamFatal { .. }));
        assert_eq!(err.class(), ErrorClass::Fatal);
        assert!(err.to_string().contains("collection 'users'"));

        let err = Error::upstream("outer", Error::upstream("inner", Error::decode("bad")));
        assert!(err.to_string().contains("inner"));
    }

    #[test]
    fn test_error_class() {
        assert_eq!(Error::malformed_cursor("x").class(), ErrorClass::Caller);
        assert_eq!(Error::config("x").class(), ErrorClass::Caller);
        assert_eq!(Error::coercion("a", "b").class(), ErrorClass::Record);
        assert_eq!(Error::decode("x").class(), ErrorClass::Fatal);
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
