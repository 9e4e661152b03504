//! Raw GPS NMEA sentences sent as APRS bodies: `GPRMC`, `GPGGA`, `GPGLL`

use crate::error::{AprsError, Result};
use crate::packet::{PacketFormat, PacketType, ParsedPacket};
use crate::position::{check_range, resolution_for_digits};
use crate::timestamp::Timestamp;
use crate::KNOT_TO_KMH;

const DEFAULT_SYMBOL_TABLE: char = '/';
const DEFAULT_SYMBOL_CODE: char = '/';

/// Verify and strip a trailing `*hh` checksum
fn strip_checksum(sentence: &str) -> Result<&str> {
    let Some((data, checksum)) = sentence.rsplit_once('*') else {
        return Ok(sentence);
    };
    let expected = u8::from_str_radix(checksum, 16)
        .map_err(|_| AprsError::NmeaInvalid(format!("bad checksum field {:?}", checksum)))?;
    let actual = data.bytes().fold(0u8, |acc, b| acc ^ b);
    if checksum.len() != 2 || expected != actual {
        return Err(AprsError::NmeaChecksum);
    }
    Ok(data)
}

/// `ddmm.mmmm` (latitude) or `dddmm.mmmm` (longitude) with hemisphere.
/// Returns signed degrees and the number of minute decimals.
fn coordinate(value: &str, hemisphere: &str, degree_digits: usize) -> Result<(f64, usize)> {
    let invalid = || AprsError::NmeaInvalid(format!("bad coordinate {:?}", value));
    if value.len() < degree_digits + 2 || !value.is_ascii() {
        return Err(invalid());
    }
    let (degrees, minutes) = value.split_at(degree_digits);
    if !degrees.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let degrees: f64 = degrees.parse().map_err(|_| invalid())?;
    let minutes_value: f64 = minutes.parse().map_err(|_| invalid())?;
    if !(0.0..60.0).contains(&minutes_value) {
        return Err(invalid());
    }
    let decimals = minutes.split_once('.').map_or(0, |(_, frac)| frac.len());

    let value = degrees + minutes_value / 60.0;
    let value = match hemisphere {
        "N" | "E" => value,
        "S" | "W" => -value,
        _ => return Err(AprsError::NmeaInvalid(format!("bad hemisphere {:?}", hemisphere))),
    };
    Ok((value, decimals))
}

fn time_of_day(field: &str) -> Option<Timestamp> {
    let b = field.as_bytes();
    if b.len() < 6 || !b[..6].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let two = |i: usize| (b[i] - b'0') * 10 + (b[i + 1] - b'0');
    let stamp = Timestamp::HourMinuteSecond {
        hour: two(0),
        minute: two(2),
        second: two(4),
    };
    stamp.is_valid().then_some(stamp)
}

fn field<'a>(fields: &[&'a str], index: usize) -> Result<&'a str> {
    fields
        .get(index)
        .copied()
        .ok_or_else(|| AprsError::NmeaInvalid(format!("missing field {}", index)))
}

/// Decode a `$GP...`/`$GN...` body
pub(crate) fn decode_nmea(body: &[u8], packet: &mut ParsedPacket) -> Result<()> {
    let sentence = std::str::from_utf8(body)
        .map_err(|_| AprsError::NmeaInvalid("non-ASCII sentence".to_string()))?
        .trim_end();
    let sentence = sentence
        .strip_prefix('$')
        .ok_or_else(|| AprsError::NmeaInvalid("missing $".to_string()))?;
    let sentence = strip_checksum(sentence)?;
    let fields: Vec<&str> = sentence.split(',').collect();
    let kind = fields[0].get(2..).unwrap_or_default();

    let (lat_at, time_at) = match kind {
        "RMC" => {
            if field(&fields, 2)? != "A" {
                return Err(AprsError::NmeaNoFix);
            }
            (3, 1)
        }
        "GGA" => {
            let quality: u8 = field(&fields, 6)?.parse().map_err(|_| AprsError::NmeaNoFix)?;
            if quality < 1 {
                return Err(AprsError::NmeaNoFix);
            }
            (2, 1)
        }
        "GLL" => {
            if fields.get(6).map_or(false, |status| !status.starts_with('A')) {
                return Err(AprsError::NmeaNoFix);
            }
            (1, 5)
        }
        _ => return Err(AprsError::NmeaUnsupported(fields[0].to_string())),
    };

    let (latitude, decimals) = coordinate(field(&fields, lat_at)?, field(&fields, lat_at + 1)?, 2)?;
    let (longitude, _) = coordinate(field(&fields, lat_at + 2)?, field(&fields, lat_at + 3)?, 3)?;
    check_range(latitude, longitude)?;

    packet.packet_type = PacketType::Location;
    packet.format = PacketFormat::Nmea;
    packet.latitude = Some(latitude);
    packet.longitude = Some(longitude);
    packet.pos_resolution = Some(resolution_for_digits(decimals as i32));
    packet.symbol_table = Some(DEFAULT_SYMBOL_TABLE);
    packet.symbol_code = Some(DEFAULT_SYMBOL_CODE);
    packet.timestamp = fields.get(time_at).and_then(|t| time_of_day(t));

    match kind {
        "RMC" => {
            if let Ok(knots) = field(&fields, 7)?.parse::<f64>() {
                packet.speed = Some(knots * KNOT_TO_KMH);
            }
            if let Ok(course) = field(&fields, 8)?.parse::<f64>() {
                let course = course.round() as i64;
                packet.course = Some(match course {
                    0 => 360,
                    1..=360 => course as u16,
                    _ => 0,
                });
            }
        }
        "GGA" => {
            let unit = fields.get(10).copied().unwrap_or_default();
            if let (Ok(altitude), "M") = (field(&fields, 9)?.parse::<f64>(), unit) {
                packet.altitude = Some(altitude);
            }
        }
        _ => {}
    }

    Ok(())
}
