//! EZO circuits over UART.
//!
//! Commands and responses are carriage-return terminated ASCII lines. A
//! circuit may answer with several lines (e.g. a reading followed by
//! `*OK`), so replies are collected until the port goes quiet.

use std::io::{self, Read, Write};
use std::time::Duration;

use tokio_serial::SerialPort;

use crate::error::{Error, Result};
use crate::hw_trait::{Delay, ThreadDelay};
use crate::tracing::prelude::*;
use crate::transport;

use super::{validate_command, Reply, CR};

/// Settle time between sending a command and collecting its lines.
pub const RESPONSE_DELAY: Duration = Duration::from_millis(1300);

/// Command/response channel to an EZO circuit on a serial line.
pub struct SerialSensorChannel<P = Box<dyn SerialPort>, D = ThreadDelay> {
    port: Option<P>,
    delay: D,
    response_delay: Duration,
}

impl SerialSensorChannel {
    /// Open `path` at `baud_rate`. `timeout` bounds every single-byte read.
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        Ok(Self::new(transport::open_port(path, baud_rate, timeout)?))
    }
}

impl<P: Read + Write> SerialSensorChannel<P> {
    /// Wrap an already-open stream.
    pub fn new(port: P) -> Self {
        Self::with_delay(port, ThreadDelay)
    }
}

impl<P: Read + Write, D: Delay> SerialSensorChannel<P, D> {
    pub fn with_delay(port: P, delay: D) -> Self {
        Self {
            port: Some(port),
            delay,
            response_delay: RESPONSE_DELAY,
        }
    }

    /// Override the settle time used by `exchange`.
    pub fn with_response_delay(mut self, response_delay: Duration) -> Self {
        self.response_delay = response_delay;
        self
    }

    pub fn response_delay(&self) -> Duration {
        self.response_delay
    }

    pub fn is_closed(&self) -> bool {
        self.port.is_none()
    }

    fn port(&mut self) -> Result<&mut P> {
        self.port.as_mut().ok_or(Error::ChannelClosed)
    }

    /// Send `command` followed by a carriage return.
    pub fn write_command(&mut self, command: &str) -> Result<()> {
        validate_command(command)?;
        let mut frame = Vec::with_capacity(command.len() + 1);
        frame.extend_from_slice(command.as_bytes());
        frame.push(CR);

        let port = self.port()?;
        port.write_all(&frame)?;
        port.flush()?;
        trace!("TX {command:?}");
        Ok(())
    }

    /// Send `command`, logging instead of propagating any failure.
    ///
    /// Returns whether the command went out.
    pub fn send_command(&mut self, command: &str) -> bool {
        match self.write_command(command) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send {command:?}: {e}");
                false
            }
        }
    }

    /// Read one line, without its carriage return.
    ///
    /// Stops early when a read returns no data (the port timed out), handing
    /// back whatever arrived so far. An empty string means nothing was
    /// waiting.
    pub fn read_line(&mut self) -> Result<String> {
        let port = self.port()?;
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            match port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) if byte[0] == CR => break,
                Ok(_) => line.push(byte[0]),
                Err(e) if is_timeout(&e) => break,
                Err(e) => return Err(e.into()),
            }
        }

        let line = String::from_utf8_lossy(&line).into_owned();
        if !line.is_empty() {
            trace!("RX {line:?}");
        }
        Ok(line)
    }

    /// Read lines until the port goes quiet, propagating transport errors.
    pub fn try_read_lines(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            if line.is_empty() {
                return Ok(lines);
            }
            lines.push(line);
        }
    }

    /// Read lines until the port goes quiet.
    ///
    /// A transport error is logged and yields `None` instead of a partial
    /// result.
    pub fn read_lines(&mut self) -> Option<Vec<String>> {
        match self.try_read_lines() {
            Ok(lines) => Some(lines),
            Err(e) => {
                warn!("Failed to read response lines: {e}");
                None
            }
        }
    }

    /// Send `command`, give the circuit time to answer, and collect its lines.
    pub fn exchange_lines(&mut self, command: &str) -> Result<Vec<String>> {
        self.write_command(command)?;
        self.delay.delay(self.response_delay);
        self.try_read_lines()
    }

    /// Release the port. Every later call fails with `ChannelClosed`.
    pub fn close(&mut self) -> Result<()> {
        self.port.take().ok_or(Error::ChannelClosed)?;
        debug!("Closed serial channel.");
        Ok(())
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

impl From<Vec<String>> for Reply {
    fn from(lines: Vec<String>) -> Self {
        Reply::Lines(lines)
    }
}
