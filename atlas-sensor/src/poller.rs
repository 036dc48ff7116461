//! Periodic polling of the configured sensor channels.
//!
//! The channels are blocking, so each poll round runs on tokio's blocking
//! pool while the async side only waits for the next tick or for shutdown.

use std::io;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::atlas::{I2cSensorChannel, Reply, SensorChannel, SerialSensorChannel, Transport};
use crate::config::PollerConfig;
use crate::error::{Error, Result};
use crate::tracing::prelude::*;

/// A channel the poller can move onto a worker thread.
pub type BoxedChannel = Box<dyn SensorChannel + Send>;

/// Open every transport named in `config`.
///
/// Fails on the first transport that cannot be opened; channels opened
/// before it are dropped, which closes them.
pub fn open_channels(config: &PollerConfig) -> Result<Vec<BoxedChannel>> {
    let mut channels: Vec<BoxedChannel> = Vec::new();

    if let Some(i2c) = &config.i2c {
        let channel = I2cSensorChannel::open(i2c.bus, i2c.address)?;
        info!("I2C sensor on bus {} at 0x{:02x}.", i2c.bus, i2c.address);
        channels.push(Box::new(channel));
    }

    if let Some(serial) = &config.serial {
        let channel = SerialSensorChannel::open(&serial.port, serial.baud_rate, serial.timeout)?;
        info!("Serial sensor on {} at {} baud.", serial.port, serial.baud_rate);
        channels.push(Box::new(channel));
    }

    if channels.is_empty() {
        return Err(Error::Config("no transport configured".into()));
    }
    Ok(channels)
}

/// Send `command` on every channel once, logging each outcome.
///
/// A failing channel does not stop the round.
pub fn poll_once<C>(channels: &mut [Box<C>], command: &str) -> Vec<(Transport, Result<Reply>)>
where
    C: SensorChannel + ?Sized,
{
    channels
        .iter_mut()
        .map(|channel| {
            let transport = channel.transport();
            let outcome = channel.exchange(command);
            match &outcome {
                Ok(reply) => info!("{transport}: {reply}"),
                Err(e) => warn!("{transport}: {command:?} failed: {e}"),
            }
            (transport, outcome)
        })
        .collect()
}

/// Close every channel, logging failures.
pub fn close_all<C>(channels: &mut [Box<C>])
where
    C: SensorChannel + ?Sized,
{
    for channel in channels.iter_mut() {
        if let Err(e) = channel.close() {
            warn!("Failed to close {} channel: {e}", channel.transport());
        }
    }
}

/// Open the configured channels and poll them until `running` is cancelled.
///
/// Opening the channels is the only fatal step; errors during a round are
/// logged and the next round goes ahead as scheduled.
pub async fn task(config: PollerConfig, running: CancellationToken) -> Result<()> {
    trace!("Task started.");
    let channels = open_channels(&config)?;
    run(channels, config.interval, config.command, running).await?;
    trace!("Task stopped.");
    Ok(())
}

/// Send `command` on every channel each `interval`, starting one interval
/// from now, until `running` is cancelled. The channels are closed on the
/// way out.
pub async fn run(
    mut channels: Vec<BoxedChannel>,
    interval: Duration,
    command: String,
    running: CancellationToken,
) -> Result<()> {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = running.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let round_command = command.clone();
        channels = tokio::task::spawn_blocking(move || {
            poll_once(&mut channels, &round_command);
            channels
        })
        .await
        .map_err(|e| Error::Io(io::Error::other(format!("poll worker failed: {e}"))))?;
    }

    close_all(&mut channels);
    Ok(())
}
