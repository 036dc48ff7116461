//! Transport-independent view of a sensor channel.

use std::fmt;
use std::io::{Read, Write};

use crate::error::Result;
use crate::hw_trait::{Delay, I2cBus};

use super::{I2cSensorChannel, Reply, SerialSensorChannel};

/// Which physical link a channel uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    I2c,
    Serial,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::I2c => write!(f, "i2c"),
            Transport::Serial => write!(f, "serial"),
        }
    }
}

/// A command/response link to one sensor.
///
/// Lets a caller poll without caring whether the circuit sits on I2C or on
/// a UART.
pub trait SensorChannel {
    fn transport(&self) -> Transport;

    /// Send `command` and wait for the circuit's answer.
    fn exchange(&mut self, command: &str) -> Result<Reply>;

    /// Release the underlying handle.
    fn close(&mut self) -> Result<()>;
}

impl<B: I2cBus, D: Delay> SensorChannel for I2cSensorChannel<B, D> {
    fn transport(&self) -> Transport {
        Transport::I2c
    }

    fn exchange(&mut self, command: &str) -> Result<Reply> {
        self.query(command)
    }

    fn close(&mut self) -> Result<()> {
        I2cSensorChannel::close(self)
    }
}

impl<P: Read + Write, D: Delay> SensorChannel for SerialSensorChannel<P, D> {
    fn transport(&self) -> Transport {
        Transport::Serial
    }

    fn exchange(&mut self, command: &str) -> Result<Reply> {
        self.exchange_lines(command).map(Reply::from)
    }

    fn close(&mut self) -> Result<()> {
        SerialSensorChannel::close(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::i2c::tests::{FakeBus, RecordingDelay};
    use crate::atlas::serial::tests::{Chunk, FakePort};
    use crate::error::Error;

    fn poll_all(channels: &mut [Box<dyn SensorChannel>], command: &str) -> Vec<(Transport, Reply)> {
        channels
            .iter_mut()
            .map(|ch| (ch.transport(), ch.exchange(command).unwrap()))
            .collect()
    }

    #[test]
    fn both_transports_answer_through_one_interface() {
        let bus = FakeBus::with_device(99, &[&[0x01, 0xB7, 0xAE, 0xB0, 0xB2]]);
        let i2c = I2cSensorChannel::with_delay(bus, 99, RecordingDelay::default()).unwrap();
        let serial = SerialSensorChannel::with_delay(
            FakePort::scripted(vec![Chunk::Data(b"7.02\r*OK\r")]),
            RecordingDelay::default(),
        );
        let mut channels: Vec<Box<dyn SensorChannel>> = vec![Box::new(i2c), Box::new(serial)];

        let replies = poll_all(&mut channels, "R");
        assert_eq!(
            replies,
            vec![
                (Transport::I2c, Reply::Success("7.02".into())),
                (
                    Transport::Serial,
                    Reply::Lines(vec!["7.02".into(), "*OK".into()])
                ),
            ]
        );
    }

    #[test]
    fn close_through_trait_closes_channel() {
        let i2c = I2cSensorChannel::with_delay(FakeBus::default(), 99, RecordingDelay::default())
            .unwrap();
        let mut channel: Box<dyn SensorChannel> = Box::new(i2c);
        channel.close().unwrap();
        assert!(matches!(channel.exchange("R"), Err(Error::ChannelClosed)));
    }

    #[test]
    fn transport_names() {
        assert_eq!(Transport::I2c.to_string(), "i2c");
        assert_eq!(Transport::Serial.to_string(), "serial");
    }
}
