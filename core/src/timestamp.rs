//! APRS timestamps.
//!
//! Timestamps are kept in the structured form they were transmitted in.
//! Turning `DDHHMM` into an absolute time needs the receive date, which the
//! caller owns.

use serde::Serialize;

use crate::error::{AprsError, Result};

pub const TIMESTAMP_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Timestamp {
    /// `DDHHMMz` (zulu) or `DDHHMM/` (local time)
    DayHourMinute { day: u8, hour: u8, minute: u8, zulu: bool },
    /// `HHMMSSh`, always zulu
    HourMinuteSecond { hour: u8, minute: u8, second: u8 },
    /// `MMDDHHMM`, positionless weather reports
    MonthDayHourMinute { month: u8, day: u8, hour: u8, minute: u8 },
}

fn two_digits(field: &[u8], at: usize) -> Option<u8> {
    let hi = *field.get(at)?;
    let lo = *field.get(at + 1)?;
    if hi.is_ascii_digit() && lo.is_ascii_digit() {
        Some((hi - b'0') * 10 + (lo - b'0'))
    } else {
        None
    }
}

/// Parse a 7-character `DDHHMMz`, `DDHHMM/` or `HHMMSSh` timestamp
pub fn parse_timestamp(field: &[u8]) -> Result<Timestamp> {
    if field.len() < TIMESTAMP_LEN {
        return Err(AprsError::TimestampInvalid);
    }
    let a = two_digits(field, 0).ok_or(AprsError::TimestampInvalid)?;
    let b = two_digits(field, 2).ok_or(AprsError::TimestampInvalid)?;
    let c = two_digits(field, 4).ok_or(AprsError::TimestampInvalid)?;

    let stamp = match field[6] {
        b'z' | b'/' => Timestamp::DayHourMinute {
            day: a,
            hour: b,
            minute: c,
            zulu: field[6] == b'z',
        },
        b'h' => Timestamp::HourMinuteSecond {
            hour: a,
            minute: b,
            second: c,
        },
        _ => return Err(AprsError::TimestampInvalid),
    };

    if stamp.is_valid() {
        Ok(stamp)
    } else {
        Err(AprsError::TimestampInvalid)
    }
}

/// Parse the 8-digit `MMDDHHMM` timestamp of a positionless weather report
pub fn parse_weather_timestamp(field: &[u8]) -> Result<Timestamp> {
    let month = two_digits(field, 0).ok_or(AprsError::TimestampInvalid)?;
    let day = two_digits(field, 2).ok_or(AprsError::TimestampInvalid)?;
    let hour = two_digits(field, 4).ok_or(AprsError::TimestampInvalid)?;
    let minute = two_digits(field, 6).ok_or(AprsError::TimestampInvalid)?;
    let stamp = Timestamp::MonthDayHourMinute {
        month,
        day,
        hour,
        minute,
    };
    if stamp.is_valid() {
        Ok(stamp)
    } else {
        Err(AprsError::TimestampInvalid)
    }
}

impl Timestamp {
    pub fn is_valid(&self) -> bool {
        match *self {
            Timestamp::DayHourMinute { day, hour, minute, .. } => {
                (1..=31).contains(&day) && hour < 24 && minute < 60
            }
            Timestamp::HourMinuteSecond { hour, minute, second } => hour < 24 && minute < 60 && second < 60,
            Timestamp::MonthDayHourMinute { month, day, hour, minute } => {
                (1..=12).contains(&month) && (1..=31).contains(&day) && hour < 24 && minute < 60
            }
        }
    }
}

/// Wire form of a timestamp, the inverse of [`parse_timestamp`] and
/// [`parse_weather_timestamp`]
pub fn make_timestamp(stamp: &Timestamp) -> Result<String> {
    if !stamp.is_valid() {
        return Err(AprsError::InvalidEncodeInput(format!("timestamp out of range: {:?}", stamp)));
    }
    Ok(match *stamp {
        Timestamp::DayHourMinute { day, hour, minute, zulu } => {
            format!("{:02}{:02}{:02}{}", day, hour, minute, if zulu { 'z' } else { '/' })
        }
        Timestamp::HourMinuteSecond { hour, minute, second } => {
            format!("{:02}{:02}{:02}h", hour, minute, second)
        }
        Timestamp::MonthDayHourMinute { month, day, hour, minute } => {
            format!("{:02}{:02}{:02}{:02}", month, day, hour, minute)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zulu_and_local() {
        assert_eq!(
            parse_timestamp(b"092345z").unwrap(),
            Timestamp::DayHourMinute { day: 9, hour: 23, minute: 45, zulu: true }
        );
        assert_eq!(
            parse_timestamp(b"310000/").unwrap(),
            Timestamp::DayHourMinute { day: 31, hour: 0, minute: 0, zulu: false }
        );
    }

    #[test]
    fn test_parse_hms() {
        assert_eq!(
            parse_timestamp(b"234517h").unwrap(),
            Timestamp::HourMinuteSecond { hour: 23, minute: 45, second: 17 }
        );
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(parse_timestamp(b"002345z").is_err());
        assert!(parse_timestamp(b"092460z").is_err());
        assert!(parse_timestamp(b"245959h").is_err());
        assert!(parse_timestamp(b"09234xz").is_err());
        assert!(parse_timestamp(b"092345x").is_err());
        assert!(parse_timestamp(b"0923").is_err());
    }

    #[test]
    fn test_weather_timestamp() {
        assert_eq!(
            parse_weather_timestamp(b"10090556").unwrap(),
            Timestamp::MonthDayHourMinute { month: 10, day: 9, hour: 5, minute: 56 }
        );
        assert!(parse_weather_timestamp(b"13090556").is_err());
    }

    #[test]
    fn test_make_timestamp() {
        let stamp = Timestamp::DayHourMinute { day: 1, hour: 2, minute: 3, zulu: true };
        assert_eq!(make_timestamp(&stamp).unwrap(), "010203z");
        let stamp = Timestamp::HourMinuteSecond { hour: 12, minute: 0, second: 59 };
        assert_eq!(make_timestamp(&stamp).unwrap(), "120059h");
        let bad = Timestamp::HourMinuteSecond { hour: 25, minute: 0, second: 0 };
        assert!(make_timestamp(&bad).is_err());
    }
}
