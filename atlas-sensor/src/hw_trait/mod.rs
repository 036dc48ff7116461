//! Hardware abstraction layer traits.
//!
//! The sensor channels talk to hardware only through these traits, so the
//! same protocol code runs over a Linux i2c-dev node or an in-memory bus in
//! tests. Serial ports need no trait of their own: any `Read + Write` stream
//! will do.

use std::io;
use std::time::Duration;

/// Raw byte access to an I2C bus with a selectable target device.
///
/// Mirrors the i2c-dev model: a bind operation selects the device address,
/// and plain reads and writes then go to that device.
pub trait I2cBus {
    /// Direct subsequent reads and writes at `address`.
    fn bind(&mut self, address: u8) -> io::Result<()>;

    /// Write `data` to the bound device, returning the number of bytes
    /// accepted.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Read up to `buffer.len()` bytes from the bound device.
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize>;
}

/// Blocking delay used to wait out on-device processing time.
pub trait Delay {
    fn delay(&mut self, duration: Duration);
}

/// Delay backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
