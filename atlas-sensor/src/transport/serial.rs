//! Blocking serial port transport.
//!
//! Uses the synchronous builder that tokio-serial re-exports from
//! serialport; the sensor protocol is strictly request/response and never
//! needs an async stream.

use std::time::Duration;

use tokio_serial::SerialPort;

use crate::error::{Error, Result};
use crate::tracing::prelude::*;

/// Open `path` at `baud_rate` with a per-read `timeout`.
pub fn open_port(path: &str, baud_rate: u32, timeout: Duration) -> Result<Box<dyn SerialPort>> {
    let port = tokio_serial::new(path, baud_rate)
        .timeout(timeout)
        .open()
        .map_err(|e| Error::TransportOpen {
            path: path.to_string(),
            source: e.into(),
        })?;
    debug!("Opened {path} at {baud_rate} baud, read timeout {timeout:?}.");
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_port_is_transport_open_error() {
        let err = open_port("/dev/ttyDOES_NOT_EXIST", 9600, Duration::from_millis(10))
            .err()
            .expect("port should not open");
        assert!(matches!(err, Error::TransportOpen { ref path, .. } if path == "/dev/ttyDOES_NOT_EXIST"));
    }
}
