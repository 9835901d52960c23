//! Structured error handling for racegraph
//!
//! Component errors stay small `thiserror` enums next to the code that raises
//! them ([`QueryError`], [`MappingError`], [`SerializationError`]). At the
//! boundary they convert into [`RaceGraphError`], which carries:
//! - an error code for programmatic handling
//! - an HTTP status mapping
//! - an optional hint
//! - a JSON body of the form `{"error": "..."}`
//!
//! # Example
//!
//! ```rust,ignore
//! use racegraph::error::{RaceGraphError, ErrorCode};
//!
//! fn check(query: &str) -> Result<(), RaceGraphError> {
//!     if query.trim().is_empty() {
//!         return Err(RaceGraphError::empty_input("query"));
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::format::reader::ReadError;
use crate::format::SerializationError;
use crate::mapper::MappingError;
use crate::sparql::QueryError;

// ============================================================================
// Error Codes
// ============================================================================

/// Unique error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Parse errors (1xxx)
    /// Invalid SPARQL syntax
    InvalidSparql = 1003,
    /// Invalid Turtle / N-Triples input
    InvalidTurtle = 1004,
    /// Recognised but unimplemented query feature
    UnsupportedFeature = 1008,

    // Mapping errors (2xxx)
    /// Entity missing a required attribute
    MappingFailed = 2001,

    // Data errors (3xxx)
    /// Entity snapshot could not be read
    DataNotFound = 3001,

    // Validation errors (5xxx)
    /// Empty input
    EmptyInput = 5001,
    /// Input too large
    InputTooLarge = 5002,
    /// Invalid format
    InvalidFormat = 5003,
    /// Unknown output format requested
    UnknownFormat = 5006,

    // Config errors (7xxx)
    /// Generic config error
    ConfigError = 7000,
    /// Config file not found
    ConfigNotFound = 7001,
    /// Invalid config syntax
    InvalidConfigSyntax = 7002,

    // Internal errors (9xxx)
    /// Internal error
    InternalError = 9000,
    /// A malformed term reached a serializer
    SerializationFailed = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a short description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidSparql => "Invalid SPARQL syntax",
            ErrorCode::InvalidTurtle => "Invalid Turtle syntax",
            ErrorCode::UnsupportedFeature => "Unsupported query feature",
            ErrorCode::MappingFailed => "Entity mapping failed",
            ErrorCode::DataNotFound => "Data not found",
            ErrorCode::EmptyInput => "Empty input",
            ErrorCode::InputTooLarge => "Input too large",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::UnknownFormat => "Unknown output format",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::ConfigNotFound => "Configuration file not found",
            ErrorCode::InvalidConfigSyntax => "Invalid configuration syntax",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::SerializationFailed => "Serialization failed",
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::InvalidSparql
            | ErrorCode::InvalidTurtle
            | ErrorCode::UnsupportedFeature
            | ErrorCode::MappingFailed
            | ErrorCode::EmptyInput
            | ErrorCode::InvalidFormat
            | ErrorCode::UnknownFormat => 400,

            ErrorCode::DataNotFound | ErrorCode::ConfigNotFound => 404,

            ErrorCode::InputTooLarge => 413,

            ErrorCode::ConfigError
            | ErrorCode::InvalidConfigSyntax
            | ErrorCode::InternalError
            | ErrorCode::SerializationFailed => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for racegraph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceGraphError {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Hint for resolving the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl RaceGraphError {
    /// Create a new error with a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), hint: None }
    }

    /// Create a SPARQL syntax error
    pub fn sparql_syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidSparql, message)
    }

    /// Create an empty input error
    pub fn empty_input(field: &str) -> Self {
        Self::new(ErrorCode::EmptyInput, format!("{} cannot be empty", field))
    }

    /// Create an input too large error; `limit` is in bytes
    pub fn input_too_large(limit: usize) -> Self {
        Self::new(ErrorCode::InputTooLarge, format!("Request body exceeds limit {}", limit))
            .with_hint("Send a smaller request or raise server.max_body_size")
    }

    /// Create an unknown format error
    pub fn unknown_format(format: &str, supported: &[&str]) -> Self {
        Self::new(ErrorCode::UnknownFormat, format!("Unknown format: {}", format))
            .with_hint(format!("Supported formats: {}", supported.join(", ")))
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Add a hint for resolving the error
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.http_status())
    }
}

impl fmt::Display for RaceGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;
        if let Some(ref hint) = self.hint {
            write!(f, "\nHint: {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for RaceGraphError {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<QueryError> for RaceGraphError {
    fn from(err: QueryError) -> Self {
        let code = match err {
            QueryError::Syntax { .. } => ErrorCode::InvalidSparql,
            QueryError::Unsupported { .. } => ErrorCode::UnsupportedFeature,
        };
        RaceGraphError::new(code, err.to_string())
    }
}

impl From<ReadError> for RaceGraphError {
    fn from(err: ReadError) -> Self {
        RaceGraphError::new(ErrorCode::InvalidTurtle, err.to_string())
    }
}

impl From<SerializationError> for RaceGraphError {
    fn from(err: SerializationError) -> Self {
        RaceGraphError::new(ErrorCode::SerializationFailed, err.to_string())
    }
}

impl From<MappingError> for RaceGraphError {
    fn from(err: MappingError) -> Self {
        RaceGraphError::new(ErrorCode::MappingFailed, err.to_string())
    }
}

impl From<std::io::Error> for RaceGraphError {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::DataNotFound,
            _ => ErrorCode::InternalError,
        };
        RaceGraphError::new(code, err.to_string())
    }
}

impl From<serde_json::Error> for RaceGraphError {
    fn from(err: serde_json::Error) -> Self {
        RaceGraphError::new(ErrorCode::InvalidFormat, err.to_string())
    }
}

impl From<toml::de::Error> for RaceGraphError {
    fn from(err: toml::de::Error) -> Self {
        RaceGraphError::new(ErrorCode::InvalidConfigSyntax, err.to_string())
    }
}

/// A Result type using RaceGraphError
pub type RaceGraphResult<T> = Result<T, RaceGraphError>;

// ============================================================================
// Error response for HTTP APIs
// ============================================================================

/// JSON body returned with every failed HTTP request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code (string form)
    pub code: ErrorCode,
    /// HTTP status code
    pub status: u16,
    /// Hint for resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<&RaceGraphError> for ErrorResponse {
    fn from(err: &RaceGraphError) -> Self {
        Self {
            error: err.message.clone(),
            code: err.code,
            status: err.http_status(),
            hint: err.hint.clone(),
        }
    }
}

impl ErrorResponse {
    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| serde_json::json!({ "error": self.error }).to_string())
    }
}
