//! Common error types for atlas-sensor.
//!
//! This module provides a centralized Error enum using thiserror, covering
//! both sensor transports and the polling glue around them.

use std::io;
use thiserror::Error;

/// Main error type for atlas-sensor operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Device node or serial port could not be opened
    #[error("failed to open {path}: {source}")]
    TransportOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The I2C slave-address bind failed, or the channel has no bound address
    #[error("failed to bind I2C address {address} (0x{address:02x}): {source}")]
    AddressBind {
        address: u8,
        #[source]
        source: io::Error,
    },

    /// Rejected before any I/O was attempted
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A read or write on the transport failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Response frame could not be parsed
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operation attempted after close()
    #[error("channel is closed")]
    ChannelClosed,

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
