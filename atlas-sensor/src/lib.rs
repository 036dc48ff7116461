//! Command/response driver for Atlas Scientific EZO sensor circuits over
//! I2C and UART, plus the glue that polls them on a timer.

pub mod atlas;
pub mod config;
pub mod error;
pub mod hw_trait;
pub mod poller;
pub mod tracing;
pub mod transport;
