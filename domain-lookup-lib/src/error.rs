//! Error handling for domain lookup operations.
//!
//! This module defines the error type covering every way a single lookup
//! attempt can fail, from malformed input to silent WHOIS servers. The
//! orchestrator never lets these escape `lookup()`; they are folded into the
//! diagnostic of an error record instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Main error type for lookup operations.
#[derive(Debug, Clone)]
pub enum LookupError {
    /// Input is not a syntactically valid domain name (or is an IP literal)
    InvalidDomainSyntax { input: String, reason: String },

    /// Neither protocol has a configured server for the TLD
    UnsupportedTld { tld: String },

    /// TCP connect (WHOIS) or HTTP connect (RDAP) failed
    ConnectFailed { server: String, message: String },

    /// The attempt did not finish within its budget
    Timeout { server: String, duration: Duration },

    /// WHOIS peer closed the connection with (almost) nothing
    EmptyResponse { server: String, bytes: usize },

    /// Registry says the domain does not exist (RDAP 404 or WHOIS "no match")
    NotFound { server: String },

    /// RDAP server answered with a non-success, non-404 status
    HttpStatus { server: String, status: u16 },

    /// Transport failure after the connection was established
    NetworkError { server: String, message: String },

    /// WHOIS server refused to answer because of query volume
    RateLimited { server: String },

    /// Response could not be interpreted
    ParseFailure { message: String },

    /// Every configured source for the active mode failed
    AllSourcesExhausted { attempts: Vec<String> },

    /// Invalid configuration values
    ConfigError { message: String },

    /// Configuration file could not be read
    FileError { path: String, message: String },
}

/// Serializable failure category carried by error records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidDomainSyntax,
    UnsupportedTld,
    ConnectFailed,
    Timeout,
    EmptyResponse,
    NotFound,
    HttpStatus,
    NetworkError,
    RateLimited,
    ParseFailure,
    AllSourcesExhausted,
    ConfigError,
    FileError,
}

impl LookupError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<I: Into<String>, R: Into<String>>(input: I, reason: R) -> Self {
        Self::InvalidDomainSyntax {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a new unsupported TLD error.
    pub fn unsupported_tld<T: Into<String>>(tld: T) -> Self {
        Self::UnsupportedTld { tld: tld.into() }
    }

    /// Create a new connect failure.
    pub fn connect<S: Into<String>, M: Into<String>>(server: S, message: M) -> Self {
        Self::ConnectFailed {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(server: S, duration: Duration) -> Self {
        Self::Timeout {
            server: server.into(),
            duration,
        }
    }

    /// Create a new network error.
    pub fn network<S: Into<String>, M: Into<String>>(server: S, message: M) -> Self {
        Self::NetworkError {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error.
    pub fn not_found<S: Into<String>>(server: S) -> Self {
        Self::NotFound {
            server: server.into(),
        }
    }

    /// Create a new parse failure.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseFailure {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The serializable category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDomainSyntax { .. } => ErrorKind::InvalidDomainSyntax,
            Self::UnsupportedTld { .. } => ErrorKind::UnsupportedTld,
            Self::ConnectFailed { .. } => ErrorKind::ConnectFailed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::EmptyResponse { .. } => ErrorKind::EmptyResponse,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::NetworkError { .. } => ErrorKind::NetworkError,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::ParseFailure { .. } => ErrorKind::ParseFailure,
            Self::AllSourcesExhausted { .. } => ErrorKind::AllSourcesExhausted,
            Self::ConfigError { .. } => ErrorKind::ConfigError,
            Self::FileError { .. } => ErrorKind::FileError,
        }
    }

    /// Check if this error means the registry has no such domain.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomainSyntax { input, reason } => {
                write!(f, "Invalid domain '{}': {}", input, reason)
            }
            Self::UnsupportedTld { tld } => {
                write!(f, "No RDAP or WHOIS server known for TLD '{}'", tld)
            }
            Self::ConnectFailed { server, message } => {
                write!(f, "Connection to {} failed: {}", server, message)
            }
            Self::Timeout { server, duration } => {
                write!(f, "Timeout after {:?} waiting for {}", duration, server)
            }
            Self::EmptyResponse { server, bytes } => {
                write!(f, "Empty response from {} ({} bytes)", server, bytes)
            }
            Self::NotFound { server } => {
                write!(f, "Domain not found at {}", server)
            }
            Self::HttpStatus { server, status } => {
                write!(f, "HTTP {} from {}", status, server)
            }
            Self::NetworkError { server, message } => {
                write!(f, "Network error talking to {}: {}", server, message)
            }
            Self::RateLimited { server } => {
                write!(f, "Rate limited by {}", server)
            }
            Self::ParseFailure { message } => {
                write!(f, "Parse error: {}", message)
            }
            Self::AllSourcesExhausted { attempts } => {
                write!(f, "All sources exhausted: {}", attempts.join("; "))
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
        }
    }
}

impl std::error::Error for LookupError {}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseFailure {
            message: format!("JSON parsing failed: {}", err),
        }
    }
}

impl From<toml::de::Error> for LookupError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", err),
        }
    }
}
