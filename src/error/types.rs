//! Error types
//!
//! Defines domain-specific error types for each part of the relay.

use std::fmt;
use std::io;

use crate::client::SessionId;

/// Listener errors
#[derive(Debug)]
pub enum ListenerError {
    /// The configured address could not be bound. Fatal.
    Bind(String, io::Error),
    /// A single accept call failed. The accept loop continues.
    Accept(io::Error),
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerError::Bind(addr, e) => write!(f, "Failed to bind to {}: {}", addr, e),
            ListenerError::Accept(e) => write!(f, "Failed to accept connection: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// Client registry errors
#[derive(Debug, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateSession(SessionId),
    Full(usize),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateSession(id) => write!(f, "Session {} already registered", id),
            RegistryError::Full(max) => write!(f, "Registry full ({} sessions)", max),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Inbound framing errors. The offending frame is dropped; the connection stays open.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameError {
    TooLong(usize),
    InvalidUtf8,
    Truncated(usize),
    EmptyName,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::TooLong(max) => write!(f, "Frame exceeds {} bytes", max),
            FrameError::InvalidUtf8 => write!(f, "Frame is not valid UTF-8"),
            FrameError::Truncated(len) => {
                write!(f, "Stream ended inside a frame ({} bytes unterminated)", len)
            }
            FrameError::EmptyName => write!(f, "Join frame carries an empty name"),
        }
    }
}

impl std::error::Error for FrameError {}

/// Per-recipient delivery errors. Isolated to the recipient, which is then removed.
#[derive(Debug, PartialEq, Eq)]
pub enum DeliveryError {
    Overflow(SessionId),
    Closed(SessionId),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Overflow(id) => write!(f, "Outbound buffer full for session {}", id),
            DeliveryError::Closed(id) => write!(f, "Outbound path closed for session {}", id),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Errors that stop the server or are reported from the accept loop
#[derive(Debug)]
pub enum RelayError {
    Listener(ListenerError),
    Config(config::ConfigError),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Listener(e) => write!(f, "Listener error: {}", e),
            RelayError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<ListenerError> for RelayError {
    fn from(error: ListenerError) -> Self {
        RelayError::Listener(error)
    }
}

impl From<config::ConfigError> for RelayError {
    fn from(error: config::ConfigError) -> Self {
        RelayError::Config(error)
    }
}
