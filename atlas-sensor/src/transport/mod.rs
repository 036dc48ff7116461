//! Physical transports for sensor connections.
//!
//! Raw byte access only: opening device nodes and ports and mapping their
//! failures into crate errors. Framing and the sensor protocol live in
//! [`crate::atlas`].

pub mod i2cdev;
pub mod serial;

pub use i2cdev::LinuxI2c;
pub use serial::open_port;
