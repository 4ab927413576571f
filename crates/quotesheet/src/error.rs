//! Error types for quotesheet.
//!
//! This module defines all error types used throughout the quotesheet crate,
//! providing detailed context for debugging and operator-friendly messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for quotesheet operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Document Errors ===
    /// The quote document could not be parsed.
    #[error("invalid quote document: {0}")]
    Document(#[from] serde_json::Error),

    /// A submitted form field could not be mapped onto the document.
    #[error("unrecognised form field '{name}'")]
    FormField {
        /// The offending field name.
        name: String,
    },

    // === Storage Errors ===
    /// Failed to read the data file.
    #[error("failed to read {path}: {source}")]
    DataRead {
        /// Path to the data file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the data file.
    #[error("failed to write {path}: {source}")]
    DataWrite {
        /// Path that couldn't be written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Server Errors ===
    /// The listening port is taken by another process.
    #[error("port {port} is already in use; pick another port or stop the program using it")]
    PortInUse {
        /// The port that could not be bound.
        port: u16,
    },

    /// Binding the listener failed for another reason.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address we tried to bind.
        addr: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Client Errors ===
    /// An HTTP request to the server failed.
    #[error("request to server failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server responded with HTTP {status}")]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
    },

    /// The configured server URL is not usable.
    #[error("invalid server URL '{url}': {message}")]
    ServerUrl {
        /// The URL as configured.
        url: String,
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for quotesheet operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a config validation error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a form field error.
    #[must_use]
    pub fn form_field(name: impl Into<String>) -> Self {
        Self::FormField { name: name.into() }
    }

    /// Map a bind failure onto the matching variant.
    #[must_use]
    pub fn bind(addr: impl Into<String>, port: u16, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::AddrInUse {
            Self::PortInUse { port }
        } else {
            Self::Bind {
                addr: addr.into(),
                source,
            }
        }
    }

    /// Check if this error came from the request payload rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Document(_) | Self::FormField { .. })
    }
}
