//! Linux i2c-dev transport.
//!
//! Opens `/dev/i2c-N` twice, once for reading and once for writing, and
//! selects the target device with the `I2C_SLAVE` ioctl on both handles.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use nix::libc::c_int;

use crate::error::{Error, Result};
use crate::hw_trait::I2cBus;
use crate::tracing::prelude::*;

/// `I2C_SLAVE` from linux/i2c-dev.h
pub const I2C_SLAVE: u32 = 0x0703;

nix::ioctl_write_int_bad!(i2c_set_slave, I2C_SLAVE);

/// Device node for a numbered I2C bus.
pub fn bus_path(bus: u8) -> PathBuf {
    PathBuf::from(format!("/dev/i2c-{bus}"))
}

/// An I2C bus reached through the kernel's i2c-dev interface.
#[derive(Debug)]
pub struct LinuxI2c {
    reader: File,
    writer: File,
}

impl LinuxI2c {
    /// Open the device node for `bus`.
    pub fn open(bus: u8) -> Result<Self> {
        Self::open_path(bus_path(bus))
    }

    /// Open an explicit device node path.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| Error::TransportOpen {
            path: path.display().to_string(),
            source,
        };

        let reader = OpenOptions::new().read(true).open(&path).map_err(open_err)?;
        let writer = OpenOptions::new().write(true).open(&path).map_err(open_err)?;
        debug!("Opened {}.", path.display());

        Ok(Self { reader, writer })
    }
}

impl I2cBus for LinuxI2c {
    fn bind(&mut self, address: u8) -> io::Result<()> {
        for file in [&self.reader, &self.writer] {
            // SAFETY: the descriptor is owned by `file` and stays open for
            // the duration of the call; I2C_SLAVE takes its argument by value.
            unsafe { i2c_set_slave(file.as_raw_fd(), c_int::from(address)) }?;
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.writer.write(data)
    }

    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buffer)
    }
}
