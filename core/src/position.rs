//! Plain and base-91 compressed position decoding

use crate::base91;
use crate::comment::{decode_comment, CommentRules};
use crate::error::{AprsError, Result};
use crate::packet::{PacketFormat, ParsedPacket};
use crate::weather::parse_weather;
use crate::{
    AMBIGUITY_RESOLUTION, COMPRESSED_RESOLUTION, FEET_TO_METERS, KNOT_TO_KMH, MPH_TO_KMH, WEATHER_SYMBOL,
};

/// `DDMM.hhN/DDDMM.hhW$`
pub const UNCOMPRESSED_LEN: usize = 19;
/// `/YYYYXXXX$csT`
pub const COMPRESSED_LEN: usize = 13;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub symbol_table: char,
    pub symbol_code: char,
    pub format: PacketFormat,
    pub ambiguity: Option<u8>,
    pub resolution: f64,
    pub course: Option<u16>,
    pub speed: Option<f64>,
    pub altitude: Option<f64>,
    pub radio_range: Option<f64>,
    pub gps_fix_current: Option<bool>,
}

impl Position {
    pub(crate) fn apply_to(self, packet: &mut ParsedPacket) {
        packet.latitude = Some(self.latitude);
        packet.longitude = Some(self.longitude);
        packet.symbol_table = Some(self.symbol_table);
        packet.symbol_code = Some(self.symbol_code);
        packet.format = self.format;
        packet.pos_ambiguity = self.ambiguity;
        packet.pos_resolution = Some(self.resolution);
        packet.course = self.course;
        packet.speed = self.speed;
        packet.altitude = self.altitude;
        packet.radio_range = self.radio_range;
        packet.gps_fix_current = self.gps_fix_current;
    }
}

pub fn is_symbol_table(b: u8) -> bool {
    b == b'/' || b == b'\\' || b.is_ascii_uppercase() || b.is_ascii_digit()
}

pub fn is_symbol_code(b: u8) -> bool {
    (0x21..=0x7b).contains(&b) || b == 0x7d
}

/// Leading byte of a compressed position: symbol table, or an overlay
/// digit sent as `a`..`j`
pub fn is_compressed_table(b: u8) -> bool {
    b == b'/' || b == b'\\' || b.is_ascii_uppercase() || (b'a'..=b'j').contains(&b)
}

/// Position resolution in meters for the given ambiguity level
pub fn resolution_for_ambiguity(ambiguity: u8) -> f64 {
    AMBIGUITY_RESOLUTION[(ambiguity as usize).min(AMBIGUITY_RESOLUTION.len() - 1)]
}

/// Position resolution in meters when minutes carry `digits` decimals.
/// Negative counts blank out whole minutes (-1) or all minutes (-2).
pub fn resolution_for_digits(digits: i32) -> f64 {
    if digits <= -2 {
        AMBIGUITY_RESOLUTION[4]
    } else if digits < 0 {
        1852.0 * 10f64.powi(-digits)
    } else {
        1852.0 / 10f64.powi(digits)
    }
}

pub(crate) fn check_range(latitude: f64, longitude: f64) -> Result<()> {
    if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
        Ok(())
    } else {
        Err(AprsError::PositionOutOfRange)
    }
}

/// Minutes value of `MMmm` digits with the trailing `ambiguity` digits
/// blanked. The blanked part is replaced by the middle of its range.
pub(crate) fn ambiguous_minutes(digits: &[u8; 4], ambiguity: u8) -> Result<f64> {
    let used = 4 - ambiguity as usize;
    if !digits[..used].iter().all(u8::is_ascii_digit) {
        return Err(AprsError::LocationAmbiguityInvalid);
    }
    let d = |i: usize| (digits[i] - b'0') as f64;
    let minutes = match ambiguity {
        0 => d(0) * 10.0 + d(1) + d(2) / 10.0 + d(3) / 100.0,
        1 => d(0) * 10.0 + d(1) + d(2) / 10.0 + 0.05,
        2 => d(0) * 10.0 + d(1) + 0.5,
        3 => d(0) * 10.0 + 5.0,
        _ => 30.0,
    };
    if minutes >= 60.0 {
        return Err(AprsError::LocationInvalid);
    }
    Ok(minutes)
}

fn minute_field(field: &[u8]) -> Option<[u8; 4]> {
    // MM.mm, digits or spaces around a fixed decimal point
    if field.len() != 5 || field[2] != b'.' {
        return None;
    }
    let digits = [field[0], field[1], field[3], field[4]];
    if digits.iter().all(|&b| b.is_ascii_digit() || b == b' ') {
        Some(digits)
    } else {
        None
    }
}

fn digits_value(field: &[u8]) -> Option<u32> {
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(field.iter().fold(0u32, |acc, &b| acc * 10 + (b - b'0') as u32))
}

/// Decode `DDMM.hhN/DDDMM.hhW$` from the start of `data`
pub fn decode_uncompressed(data: &[u8]) -> Result<Position> {
    if data.len() < UNCOMPRESSED_LEN {
        return Err(AprsError::LocationShort);
    }

    let lat_deg = digits_value(&data[0..2]).ok_or(AprsError::LocationInvalid)?;
    let lat_min = minute_field(&data[2..7]).ok_or(AprsError::LocationInvalid)?;
    let north = match data[7] {
        b'N' | b'n' => true,
        b'S' | b's' => false,
        _ => return Err(AprsError::LocationInvalid),
    };
    let symbol_table = data[8];
    let lon_deg = digits_value(&data[9..12]).ok_or(AprsError::LocationInvalid)?;
    let lon_min = minute_field(&data[12..17]).ok_or(AprsError::LocationInvalid)?;
    let east = match data[17] {
        b'E' | b'e' => true,
        b'W' | b'w' => false,
        _ => return Err(AprsError::LocationInvalid),
    };
    let symbol_code = data[18];
    if !is_symbol_code(symbol_code) {
        return Err(AprsError::LocationInvalid);
    }
    if !is_symbol_table(symbol_table) {
        return Err(AprsError::InvalidSymbolTable(symbol_table as char));
    }

    // Ambiguity is the run of blanks closing the latitude minutes
    let used = lat_min.iter().take_while(|b| b.is_ascii_digit()).count();
    if lat_min[used..].iter().any(|&b| b != b' ') {
        return Err(AprsError::LocationAmbiguityInvalid);
    }
    let ambiguity = (4 - used) as u8;

    let (latitude, longitude) = if ambiguity == 4 {
        (lat_deg as f64 + 0.5, lon_deg as f64 + 0.5)
    } else {
        let lat = ambiguous_minutes(&lat_min, ambiguity)?;
        let lon = ambiguous_minutes(&lon_min, ambiguity)?;
        (lat_deg as f64 + lat / 60.0, lon_deg as f64 + lon / 60.0)
    };
    let latitude = if north { latitude } else { -latitude };
    let longitude = if east { longitude } else { -longitude };
    check_range(latitude, longitude)?;

    Ok(Position {
        latitude,
        longitude,
        symbol_table: symbol_table as char,
        symbol_code: symbol_code as char,
        format: PacketFormat::Uncompressed,
        ambiguity: Some(ambiguity),
        resolution: resolution_for_ambiguity(ambiguity),
        course: None,
        speed: None,
        altitude: None,
        radio_range: None,
        gps_fix_current: None,
    })
}

/// Decode the 13-byte base-91 compressed position at the start of `data`
pub fn decode_compressed(data: &[u8]) -> Result<Position> {
    if data.len() < COMPRESSED_LEN {
        return Err(AprsError::CompressedInvalid);
    }
    let data = &data[..COMPRESSED_LEN];
    if !is_compressed_table(data[0])
        || !data[1..9].iter().all(|&b| base91::is_digit(b))
        || !is_symbol_code(data[9])
        || !data[10..13].iter().all(|&b| (0x20..=0x7b).contains(&b))
    {
        return Err(AprsError::CompressedInvalid);
    }

    let lat_value = base91::decode(&data[1..5]).ok_or(AprsError::CompressedInvalid)?;
    let lon_value = base91::decode(&data[5..9]).ok_or(AprsError::CompressedInvalid)?;
    let latitude = 90.0 - lat_value as f64 / 380_926.0;
    let longitude = lon_value as f64 / 190_463.0 - 180.0;
    check_range(latitude, longitude)?;

    let symbol_table = match data[0] {
        b @ b'a'..=b'j' => (b - b'a' + b'0') as char,
        b => b as char,
    };

    let mut position = Position {
        latitude,
        longitude,
        symbol_table,
        symbol_code: data[9] as char,
        format: PacketFormat::Compressed,
        ambiguity: None,
        resolution: COMPRESSED_RESOLUTION,
        course: None,
        speed: None,
        altitude: None,
        radio_range: None,
        gps_fix_current: None,
    };

    // A space in c or s means no course/speed/altitude/range
    if data[10] == b' ' || data[11] == b' ' {
        return Ok(position);
    }
    let c = (data[10] - 33) as i32;
    let s = (data[11] - 33) as i32;
    let comp_type = data[12].wrapping_sub(33);
    position.gps_fix_current = Some(comp_type & 0x20 != 0);

    if comp_type & 0x18 == 0x10 {
        // GGA source: cs carries altitude
        let feet = 1.002f64.powi(c * 91 + s);
        position.altitude = Some(feet * FEET_TO_METERS);
    } else if (0..=89).contains(&c) {
        position.course = Some(if c == 0 { 360 } else { (c * 4) as u16 });
        position.speed = Some((1.08f64.powi(s) - 1.0) * KNOT_TO_KMH);
    } else if c == 90 {
        position.radio_range = Some(2.0 * 1.08f64.powi(s) * MPH_TO_KMH);
    }

    Ok(position)
}

/// Whether `data` starts with something [`decode_report`] can decode
pub fn starts_position(data: &[u8]) -> bool {
    data.first().map_or(false, |&b| b.is_ascii_digit() || is_compressed_table(b))
}

/// Decode a position and whatever follows it into `packet`. A weather
/// station symbol turns the trailing text into a weather report.
pub(crate) fn decode_report(data: &[u8], packet: &mut ParsedPacket) -> Result<()> {
    let first = *data.first().ok_or(AprsError::LocationShort)?;
    let (position, used) = if first.is_ascii_digit() {
        (decode_uncompressed(data)?, UNCOMPRESSED_LEN)
    } else if is_compressed_table(first) {
        (decode_compressed(data)?, COMPRESSED_LEN)
    } else {
        return Err(AprsError::LocationInvalid);
    };

    position.apply_to(packet);
    decode_trailer(&data[used..], packet, CommentRules { data_extension: true })
}

/// Decode the text after a position: a weather report for the weather
/// station symbol, otherwise extensions and comment.
pub(crate) fn decode_trailer(rest: &[u8], packet: &mut ParsedPacket, rules: CommentRules) -> Result<()> {
    if packet.symbol_code == Some(WEATHER_SYMBOL) {
        match parse_weather(rest) {
            Ok(weather) => packet.weather = Some(weather),
            Err(err) => packet.warn(err),
        }
        packet.comment = None;
        Ok(())
    } else {
        decode_comment(rest, packet, rules)
    }
}
