//! Command-line access to a single sensor.
//!
//! Transport parameters default to the same `ATLAS_*` variables the poller
//! uses; the flags below override them.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use atlas_sensor::atlas::{I2cSensorChannel, SensorChannel, SerialSensorChannel};
use atlas_sensor::config::{parse_address, PollerConfig};
use atlas_sensor::tracing;

#[derive(Debug, Parser)]
#[command(name = "atlas-cli", about = "Talk to an Atlas EZO sensor over I2C or serial")]
struct Cli {
    /// I2C bus number (/dev/i2c-N)
    #[arg(long, global = true)]
    bus: Option<u8>,

    /// I2C device address, decimal or 0x hex
    #[arg(long, global = true, value_parser = parse_address)]
    address: Option<u8>,

    /// Serial port path
    #[arg(long, global = true)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(long, global = true)]
    baud: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List responding I2C addresses
    Scan,
    /// Send a command over I2C and print the reply
    Query { command: String },
    /// Send a command over serial and print the lines
    Send { command: String },
}

fn main() -> Result<()> {
    tracing::init_stderr();

    let cli = Cli::parse();
    let mut config = PollerConfig::from_lookup(|key| {
        // The CLI picks its transport from the subcommand.
        (key != "ATLAS_TRANSPORTS")
            .then(|| std::env::var(key).ok())
            .flatten()
    })?;
    cli.apply(&mut config);

    match &cli.command {
        Command::Scan => scan(&config),
        Command::Query { command } => query(&config, command),
        Command::Send { command } => send(&config, command),
    }
}

impl Cli {
    fn apply(&self, config: &mut PollerConfig) {
        if let Some(i2c) = config.i2c.as_mut() {
            i2c.bus = self.bus.unwrap_or(i2c.bus);
            i2c.address = self.address.unwrap_or(i2c.address);
        }
        if let Some(serial) = config.serial.as_mut() {
            if let Some(port) = &self.port {
                serial.port.clone_from(port);
            }
            serial.baud_rate = self.baud.unwrap_or(serial.baud_rate);
        }
    }
}

fn scan(config: &PollerConfig) -> Result<()> {
    let i2c = config.i2c.as_ref().context("I2C is not configured")?;
    let mut channel = I2cSensorChannel::open(i2c.bus, i2c.address)?;
    let found = channel.scan_bus().context("bus scan failed")?;
    if found.is_empty() {
        println!("no devices on bus {}", i2c.bus);
    }
    for address in found {
        println!("0x{address:02x} ({address})");
    }
    channel.close()?;
    Ok(())
}

fn query(config: &PollerConfig, command: &str) -> Result<()> {
    let i2c = config.i2c.as_ref().context("I2C is not configured")?;
    let mut channel = I2cSensorChannel::open(i2c.bus, i2c.address)?;
    println!("{}", channel.query(command)?);
    channel.close()?;
    Ok(())
}

fn send(config: &PollerConfig, command: &str) -> Result<()> {
    let serial = config.serial.as_ref().context("serial is not configured")?;
    let mut channel = SerialSensorChannel::open(&serial.port, serial.baud_rate, serial.timeout)?;
    let reply = channel
        .exchange(command)
        .with_context(|| format!("no reply from {}", serial.port))?;
    println!("{reply}");
    channel.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment_defaults() {
        let cli = Cli::try_parse_from([
            "atlas-cli", "--bus", "3", "--address", "0x64", "--baud", "115200", "scan",
        ])
        .unwrap();
        let mut config = PollerConfig::default();
        cli.apply(&mut config);

        let i2c = config.i2c.unwrap();
        assert_eq!((i2c.bus, i2c.address), (3, 0x64));
        assert_eq!(config.serial.unwrap().baud_rate, 115200);
        assert!(matches!(cli.command, Command::Scan));
    }

    #[test]
    fn subcommands_take_the_command_text() {
        let cli = Cli::try_parse_from(["atlas-cli", "send", "Cal,mid,7.00"]).unwrap();
        assert!(matches!(cli.command, Command::Send { command } if command == "Cal,mid,7.00"));
    }

    #[test]
    fn bad_address_is_rejected() {
        assert!(Cli::try_parse_from(["atlas-cli", "--address", "200", "scan"]).is_err());
        assert!(Cli::try_parse_from(["atlas-cli"]).is_err());
    }
}
