//! EZO circuits over I2C.
//!
//! A command is written as ASCII plus a NUL terminator. The circuit then
//! needs time to process it (see [`TimeoutTier`]) before the response can be
//! read back; reading early returns status 254 ("still processing").

use crate::error::{Error, Result};
use crate::hw_trait::{Delay, I2cBus, ThreadDelay};
use crate::tracing::prelude::*;
use crate::transport::LinuxI2c;

use super::{
    parse_i2c_frame, validate_address, validate_command, Reply, TimeoutTier, Timeouts,
    MAX_ADDRESS, MAX_RESPONSE_LEN, NUL,
};

/// Command/response channel to an EZO circuit on an I2C bus.
///
/// Owns the bus handle exclusively. Every read and write goes to the
/// current address, which only [`set_address`](Self::set_address) changes.
pub struct I2cSensorChannel<B = LinuxI2c, D = ThreadDelay> {
    bus: Option<B>,
    delay: D,
    address: u8,
    bound: bool,
    timeouts: Timeouts,
}

impl I2cSensorChannel {
    /// Open `/dev/i2c-<bus>` and bind it to `address`.
    pub fn open(bus: u8, address: u8) -> Result<Self> {
        validate_address(address)?;
        Self::new(LinuxI2c::open(bus)?, address)
    }
}

impl<B: I2cBus> I2cSensorChannel<B> {
    /// Wrap an already-open bus and bind it to `address`.
    pub fn new(bus: B, address: u8) -> Result<Self> {
        Self::with_delay(bus, address, ThreadDelay)
    }
}

impl<B: I2cBus, D: Delay> I2cSensorChannel<B, D> {
    /// Like [`new`](I2cSensorChannel::new), with a custom delay source.
    pub fn with_delay(bus: B, address: u8, delay: D) -> Result<Self> {
        validate_address(address)?;
        let mut channel = Self {
            bus: Some(bus),
            delay,
            address,
            bound: false,
            timeouts: Timeouts::default(),
        };
        channel.set_address(address)?;
        Ok(channel)
    }

    /// Replace the processing delays used by [`query`](Self::query).
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Address that reads and writes currently target.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Whether the last bind succeeded.
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn is_closed(&self) -> bool {
        self.bus.is_none()
    }

    /// Direct subsequent reads and writes at `address`.
    ///
    /// On a failed bind the channel stays unusable until a later call
    /// succeeds.
    pub fn set_address(&mut self, address: u8) -> Result<()> {
        validate_address(address)?;
        let bus = self.bus.as_mut().ok_or(Error::ChannelClosed)?;

        self.address = address;
        match bus.bind(address) {
            Ok(()) => {
                self.bound = true;
                trace!("Bound I2C address 0x{address:02x}.");
                Ok(())
            }
            Err(source) => {
                self.bound = false;
                Err(Error::AddressBind { address, source })
            }
        }
    }

    fn bound_bus(&mut self) -> Result<&mut B> {
        let bus = self.bus.as_mut().ok_or(Error::ChannelClosed)?;
        if !self.bound {
            return Err(Error::AddressBind {
                address: self.address,
                source: std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "no address bound since last bind failure",
                ),
            });
        }
        Ok(bus)
    }

    /// Send `command` with its NUL terminator. Does not wait or read.
    pub fn write(&mut self, command: &str) -> Result<()> {
        validate_command(command)?;
        let mut frame = Vec::with_capacity(command.len() + 1);
        frame.extend_from_slice(command.as_bytes());
        frame.push(NUL);

        let address = self.address;
        let written = self.bound_bus()?.write(&frame)?;
        if written != frame.len() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("short write: {written} of {} bytes", frame.len()),
            )));
        }
        trace!("TX 0x{address:02x}: {command:?}");
        Ok(())
    }

    /// Read and decode a response of at most [`MAX_RESPONSE_LEN`] bytes.
    pub fn read(&mut self) -> Result<Reply> {
        self.read_bytes(MAX_RESPONSE_LEN)
    }

    /// Read and decode a response of at most `max_bytes` bytes.
    pub fn read_bytes(&mut self, max_bytes: usize) -> Result<Reply> {
        if max_bytes == 0 {
            return Err(Error::InvalidArgument("read length must be at least 1".into()));
        }
        let address = self.address;
        let mut buffer = vec![0u8; max_bytes];
        let n = self.bound_bus()?.read(&mut buffer)?;
        trace!("RX 0x{address:02x}: {:02x?}", &buffer[..n]);
        parse_i2c_frame(&buffer[..n])
    }

    /// Write `command`, wait for the circuit to process it, and read the
    /// response.
    ///
    /// SLEEP is written but never read: the circuit is asleep by the time a
    /// reply could be fetched.
    pub fn query(&mut self, command: &str) -> Result<Reply> {
        self.write(command)?;

        let tier = TimeoutTier::for_command(command);
        let Some(wait) = self.timeouts.for_tier(tier) else {
            debug!("0x{:02x} acknowledged {command:?}, not reading.", self.address);
            return Ok(Reply::SleepAcknowledged);
        };
        self.delay.delay(wait);
        self.read()
    }

    /// Read from every address and report the ones that answer.
    ///
    /// An address counts as present when a read completes at the I/O level,
    /// whatever it returns: an error status or an all-NUL frame from a
    /// non-EZO chip still means something acknowledged. Failed binds and
    /// reads only exclude their address. The address in use before the scan
    /// is restored afterwards, and a failed restore is returned as an error.
    pub fn scan_bus(&mut self) -> Result<Vec<u8>> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }
        let previous = self.address;

        let found: Vec<u8> = (0..=MAX_ADDRESS)
            .filter(|&address| self.answers(address))
            .collect();

        self.set_address(previous)?;
        Ok(found)
    }

    fn answers(&mut self, address: u8) -> bool {
        match self.set_address(address).and_then(|()| self.read()) {
            Ok(reply) => {
                debug!("Found device at 0x{address:02x} ({reply}).");
                true
            }
            Err(Error::Protocol(e)) => {
                debug!("Found device at 0x{address:02x} ({e}).");
                true
            }
            Err(e) => {
                trace!("Nothing at 0x{address:02x}: {e}");
                false
            }
        }
    }

    /// Release the bus. Every later call fails with `ChannelClosed`.
    pub fn close(&mut self) -> Result<()> {
        self.bus.take().ok_or(Error::ChannelClosed)?;
        self.bound = false;
        debug!("Closed I2C channel (last address 0x{:02x}).", self.address);
        Ok(())
    }
}
