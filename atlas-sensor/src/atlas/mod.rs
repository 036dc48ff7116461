//! Atlas Scientific EZO command/response protocol.
//!
//! EZO circuits speak the same ASCII command set over I2C and UART, but the
//! framing differs:
//!
//! - I2C commands end with a NUL byte. Responses start with a status byte
//!   (1 = success) followed by the ASCII payload, padded with NULs. The
//!   Raspberry Pi I2C driver sets bit 7 on received bytes, so payload bytes
//!   are masked back to 7-bit ASCII.
//! - UART commands and responses are terminated by a single carriage return.
//!
//! This module holds the pieces shared by both transports; see [`i2c`] and
//! [`serial`] for the channels themselves.

pub mod channel;
pub mod i2c;
pub mod serial;

pub use channel::{SensorChannel, Transport};
pub use i2c::I2cSensorChannel;
pub use serial::SerialSensorChannel;

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Status byte of a successful I2C response.
pub const STATUS_SUCCESS: u8 = 1;

/// Default number of bytes requested per I2C read.
pub const MAX_RESPONSE_LEN: usize = 31;

/// I2C write terminator.
pub const NUL: u8 = 0x00;

/// UART line terminator.
pub const CR: u8 = b'\r';

/// Factory address of EZO circuits (0x63).
pub const DEFAULT_ADDRESS: u8 = 99;

/// Highest 7-bit I2C address.
pub const MAX_ADDRESS: u8 = 0x7F;

/// Wait after read ("R") and calibration ("CAL") commands.
pub const LONG_TIMEOUT: Duration = Duration::from_millis(1500);

/// Wait after every other command.
pub const SHORT_TIMEOUT: Duration = Duration::from_millis(500);

/// How long a command keeps the circuit busy before its reply can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutTier {
    /// Readings and calibration
    Long,
    /// Ordinary commands
    Short,
    /// The circuit goes to sleep and will not answer
    Sleep,
}

impl TimeoutTier {
    /// Classify a command by its case-insensitive prefix.
    pub fn for_command(command: &str) -> Self {
        if starts_with_ignore_case(command, "R") || starts_with_ignore_case(command, "CAL") {
            TimeoutTier::Long
        } else if starts_with_ignore_case(command, "SLEEP") {
            TimeoutTier::Sleep
        } else {
            TimeoutTier::Short
        }
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Processing delays used by I2C queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub long: Duration,
    pub short: Duration,
}

impl Timeouts {
    /// Delay to apply for `tier`, or `None` when no reply will come.
    pub fn for_tier(&self, tier: TimeoutTier) -> Option<Duration> {
        match tier {
            TimeoutTier::Long => Some(self.long),
            TimeoutTier::Short => Some(self.short),
            TimeoutTier::Sleep => None,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            long: LONG_TIMEOUT,
            short: SHORT_TIMEOUT,
        }
    }
}

/// Outcome of a command exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// I2C status 1 with its payload
    Success(String),
    /// I2C status other than 1
    Failure(u8),
    /// SLEEP was sent; the circuit does not answer while asleep
    SleepAcknowledged,
    /// Lines received over UART, in arrival order
    Lines(Vec<String>),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Success(payload) => write!(f, "Command succeeded {payload}"),
            Reply::Failure(code) => write!(f, "Error {code}"),
            Reply::SleepAcknowledged => write!(f, "sleep mode"),
            Reply::Lines(lines) => write!(f, "{}", lines.join("\n")),
        }
    }
}

/// Reject command text that would collide with either transport's framing.
pub fn validate_command(command: &str) -> Result<()> {
    if command.is_empty() {
        return Err(Error::InvalidArgument("empty command".into()));
    }
    if let Some(b) = command
        .bytes()
        .find(|&b| b == NUL || b == CR || !b.is_ascii())
    {
        return Err(Error::InvalidArgument(format!(
            "command {command:?} contains byte 0x{b:02x}"
        )));
    }
    Ok(())
}

/// Reject addresses outside the 7-bit range.
pub fn validate_address(address: u8) -> Result<()> {
    if address > MAX_ADDRESS {
        return Err(Error::InvalidArgument(format!(
            "I2C address {address} is outside 0..={MAX_ADDRESS}"
        )));
    }
    Ok(())
}

/// Decode a raw I2C response frame.
///
/// NUL padding is dropped wherever it appears. The first remaining byte is
/// the status; on success the rest is the payload with bit 7 cleared.
pub fn parse_i2c_frame(raw: &[u8]) -> Result<Reply> {
    let mut bytes = raw.iter().copied().filter(|&b| b != NUL);
    let status = bytes
        .next()
        .ok_or_else(|| Error::Protocol(format!("empty response ({} raw bytes)", raw.len())))?;

    if status == STATUS_SUCCESS {
        Ok(Reply::Success(bytes.map(|b| char::from(b & 0x7F)).collect()))
    } else {
        Ok(Reply::Failure(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("R", TimeoutTier::Long; "read")]
    #[test_case("r", TimeoutTier::Long; "read lowercase")]
    #[test_case("RT,25.0", TimeoutTier::Long; "read with temperature")]
    #[test_case("cal,low,7", TimeoutTier::Long; "calibration")]
    #[test_case("Cal,clear", TimeoutTier::Long; "calibration mixed case")]
    #[test_case("SLEEP", TimeoutTier::Sleep; "sleep")]
    #[test_case("sleep", TimeoutTier::Sleep; "sleep lowercase")]
    #[test_case("status", TimeoutTier::Short; "status")]
    #[test_case("i", TimeoutTier::Short; "info")]
    #[test_case("Slope,?", TimeoutTier::Short; "slope is not sleep")]
    #[test_case("C", TimeoutTier::Short; "continuous is not calibration")]
    fn tier_from_prefix(command: &str, expected: TimeoutTier) {
        assert_eq!(TimeoutTier::for_command(command), expected);
    }

    #[test]
    fn default_timeouts_match_datasheet_waits() {
        let t = Timeouts::default();
        assert_eq!(t.for_tier(TimeoutTier::Long), Some(Duration::from_millis(1500)));
        assert_eq!(t.for_tier(TimeoutTier::Short), Some(Duration::from_millis(500)));
        assert_eq!(t.for_tier(TimeoutTier::Sleep), None);
    }

    #[test]
    fn success_frame_masks_high_bit() {
        let reply = parse_i2c_frame(&[0x00, 0x01, 0xC1, 0xC2, 0x00]).unwrap();
        assert_eq!(reply, Reply::Success("AB".into()));
    }

    #[test]
    fn success_frame_with_reading() {
        let mut raw = vec![0x01];
        raw.extend(b"7.02".iter().map(|b| b | 0x80));
        raw.resize(MAX_RESPONSE_LEN, 0);
        assert_eq!(parse_i2c_frame(&raw).unwrap(), Reply::Success("7.02".into()));
    }

    #[test]
    fn nuls_inside_payload_are_dropped() {
        let reply = parse_i2c_frame(&[0x01, b'1', 0x00, b'2']).unwrap();
        assert_eq!(reply, Reply::Success("12".into()));
    }

    #[test_case(&[0x02], 2; "syntax error")]
    #[test_case(&[0xFE, 0x00], 254; "still processing")]
    #[test_case(&[0x00, 0xFF], 255; "no data")]
    fn failure_frame_carries_status(raw: &[u8], code: u8) {
        assert_eq!(parse_i2c_frame(raw).unwrap(), Reply::Failure(code));
    }

    #[test]
    fn empty_frames_are_protocol_errors() {
        assert!(matches!(parse_i2c_frame(&[]), Err(Error::Protocol(_))));
        assert!(matches!(parse_i2c_frame(&[0; MAX_RESPONSE_LEN]), Err(Error::Protocol(_))));
    }

    #[test]
    fn status_only_success_has_empty_payload() {
        assert_eq!(parse_i2c_frame(&[0x01]).unwrap(), Reply::Success(String::new()));
    }

    #[test_case("R"; "single letter")]
    #[test_case("Cal,mid,7.00"; "with arguments")]
    fn valid_commands_pass(command: &str) {
        assert!(validate_command(command).is_ok());
    }

    #[test_case(""; "empty")]
    #[test_case("R\0"; "embedded nul")]
    #[test_case("R\r"; "embedded cr")]
    #[test_case("pH°"; "non ascii")]
    fn invalid_commands_rejected(command: &str) {
        assert!(matches!(validate_command(command), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn address_range() {
        assert!(validate_address(0).is_ok());
        assert!(validate_address(127).is_ok());
        assert!(matches!(validate_address(128), Err(Error::InvalidArgument(_))));
        assert!(matches!(validate_address(255), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn reply_display_matches_log_format() {
        assert_eq!(Reply::Success("7.02".into()).to_string(), "Command succeeded 7.02");
        assert_eq!(Reply::Failure(2).to_string(), "Error 2");
        assert_eq!(Reply::SleepAcknowledged.to_string(), "sleep mode");
        assert_eq!(Reply::Lines(vec!["A".into(), "B".into()]).to_string(), "A\nB");
    }
}
