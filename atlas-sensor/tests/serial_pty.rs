//! Serial channel against a pseudo-terminal standing in for the sensor.

#![cfg(all(target_os = "linux", not(feature = "skip-pty-tests")))]

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use nix::pty::openpty;
use serial_test::serial;

use atlas_sensor::atlas::{Reply, SensorChannel, SerialSensorChannel};
use atlas_sensor::error::Error;

const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// The sensor's end of the line, and the channel opened on the other end.
fn connect() -> (File, SerialSensorChannel) {
    let pty = openpty(None, None).expect("openpty");
    let slave_path: PathBuf = std::fs::read_link(format!("/proc/self/fd/{}", pty.slave.as_raw_fd()))
        .expect("resolve pty slave path");
    let channel = SerialSensorChannel::open(slave_path.to_str().unwrap(), 9600, READ_TIMEOUT)
        .expect("open pty slave")
        .with_response_delay(Duration::from_millis(20));
    // The channel holds its own descriptor; ours can go.
    drop(pty.slave);
    (File::from(pty.master), channel)
}

fn read_exactly(sensor: &mut File, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    sensor.read_exact(&mut buf).expect("read from pty master");
    buf
}

#[test]
#[serial]
fn command_arrives_with_carriage_return() {
    let (mut sensor, mut channel) = connect();
    assert!(channel.send_command("R"));
    assert_eq!(read_exactly(&mut sensor, 2), b"R\r");
}

#[test]
#[serial]
fn terminated_line_is_returned_without_terminator() {
    let (mut sensor, mut channel) = connect();
    sensor.write_all(b"ok\r").unwrap();
    assert_eq!(channel.read_line().unwrap(), "ok");
}

#[test]
#[serial]
fn unterminated_line_is_returned_after_timeout() {
    let (mut sensor, mut channel) = connect();
    sensor.write_all(b"partial").unwrap();

    let started = Instant::now();
    assert_eq!(channel.read_line().unwrap(), "partial");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
#[serial]
fn lines_are_collected_until_quiet() {
    let (mut sensor, mut channel) = connect();
    sensor.write_all(b"A\rB\r").unwrap();
    assert_eq!(channel.read_lines(), Some(vec!["A".to_string(), "B".to_string()]));
}

#[test]
#[serial]
fn exchange_round_trip() {
    let (mut sensor, mut channel) = connect();
    // Queue the answer up front; it is read after the response delay.
    sensor.write_all(b"7.02\r*OK\r").unwrap();

    let reply = channel.exchange("R").unwrap();
    assert_eq!(reply, Reply::Lines(vec!["7.02".into(), "*OK".into()]));
    assert_eq!(read_exactly(&mut sensor, 2), b"R\r");
}

#[test]
#[serial]
fn closed_channel_rejects_io() {
    let (_sensor, mut channel) = connect();
    SensorChannel::close(&mut channel).unwrap();
    assert!(matches!(channel.read_line(), Err(Error::ChannelClosed)));
    assert!(!channel.send_command("R"));
}
