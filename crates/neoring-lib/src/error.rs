//! Unified error type for the neoring-lib crate.
//!
//! [`NeoringError`] wraps module-specific errors (`DeviceError`, `TransportError`)
//! and domain-specific error kinds (`Config`, `Payload`, `Color`).
//! `From` impls allow `?` to propagate across module boundaries seamlessly.

use std::fmt;

use crate::device::DeviceError;
use crate::transport::TransportError;

/// Unified error type for neoring-lib operations.
#[derive(Debug)]
pub enum NeoringError {
    /// LED ring driver error (init, write, read).
    Device(DeviceError),
    /// Publish/subscribe transport error (connect, publish).
    Transport(TransportError),
    /// Standard I/O error (file read/write, config persistence).
    Io(std::io::Error),
    /// Configuration validation error.
    Config(String),
    /// Set-color payload could not be parsed.
    Payload(String),
    /// Color string parsing error.
    Color(String),
    /// A runtime thread could not be spawned or panicked.
    Thread(String),
    /// Broker connection retries exhausted; the runtime is fail-stopped.
    Halted,
}

impl fmt::Display for NeoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeoringError::Device(e) => write!(f, "{e}"),
            NeoringError::Transport(e) => write!(f, "{e}"),
            NeoringError::Io(e) => write!(f, "I/O error: {e}"),
            NeoringError::Config(e) => write!(f, "Config error: {e}"),
            NeoringError::Payload(e) => write!(f, "Payload error: {e}"),
            NeoringError::Color(e) => write!(f, "Color error: {e}"),
            NeoringError::Thread(e) => write!(f, "Thread error: {e}"),
            NeoringError::Halted => {
                write!(f, "Could not connect to the broker, ran out of retries")
            }
        }
    }
}

impl std::error::Error for NeoringError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NeoringError::Device(e) => Some(e),
            NeoringError::Transport(e) => Some(e),
            NeoringError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DeviceError> for NeoringError {
    fn from(e: DeviceError) -> Self {
        NeoringError::Device(e)
    }
}

impl From<TransportError> for NeoringError {
    fn from(e: TransportError) -> Self {
        NeoringError::Transport(e)
    }
}

impl From<std::io::Error> for NeoringError {
    fn from(e: std::io::Error) -> Self {
        NeoringError::Io(e)
    }
}

/// Crate-level Result alias using [`NeoringError`].
pub type Result<T> = std::result::Result<T, NeoringError>;
