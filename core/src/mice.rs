//! Mic-E decoding.
//!
//! Latitude, hemisphere bits and the 3-bit message code travel in the six
//! characters of the destination callsign. The information field carries
//! longitude, speed, course and the symbol:
//!
//! ```text
//! 0     1   2   3    4   5   6    7    8     9..
//! type  d+28 m+28 h+28 SP+28 DC+28 SE+28 code table comment
//! ```

use crate::base91;
use crate::comment::CommentRules;
use crate::error::{AprsError, Result};
use crate::packet::{PacketFormat, PacketType, ParsedPacket};
use crate::position::{
    ambiguous_minutes, check_range, decode_trailer, is_symbol_code, is_symbol_table, resolution_for_ambiguity,
};
use crate::telemetry::parse_mice_telemetry;
use crate::KNOT_TO_KMH;

/// Type byte plus the eight fixed information bytes
pub const MIN_BODY_LEN: usize = 9;
const DESTINATION_LEN: usize = 6;
const OFFSET: u8 = 28;
const ALTITUDE_OFFSET: f64 = 10_000.0;

/// Message bit strings and their names
pub const MICE_MESSAGES: [(&str, &str); 15] = [
    ("111", "off duty"),
    ("222", "custom 0"),
    ("110", "en route"),
    ("220", "custom 1"),
    ("101", "in service"),
    ("202", "custom 2"),
    ("100", "returning"),
    ("200", "custom 3"),
    ("011", "committed"),
    ("022", "custom 4"),
    ("010", "special"),
    ("020", "custom 5"),
    ("001", "priority"),
    ("002", "custom 6"),
    ("000", "emergency"),
];

pub fn mice_message(mbits: &str) -> Option<&'static str> {
    MICE_MESSAGES.iter().find(|(bits, _)| *bits == mbits).map(|(_, name)| *name)
}

/// Validate the destination field and return its six characters
fn destination_chars(destination: &str) -> Result<[u8; DESTINATION_LEN]> {
    let base = destination.split('-').next().unwrap_or_default().as_bytes();
    let chars: [u8; DESTINATION_LEN] = base.try_into().map_err(|_| AprsError::MicEInvalidDestination)?;

    let head_ok = chars[..3]
        .iter()
        .all(|&c| c.is_ascii_digit() || (b'A'..=b'L').contains(&c) || (b'P'..=b'Z').contains(&c));
    let tail_ok = chars[3..]
        .iter()
        .all(|&c| c.is_ascii_digit() || c == b'L' || (b'P'..=b'Z').contains(&c));
    if head_ok && tail_ok {
        Ok(chars)
    } else {
        Err(AprsError::MicEInvalidDestination)
    }
}

fn message_bit(c: u8) -> char {
    match c {
        b'0'..=b'9' | b'L' => '0',
        b'P'..=b'Z' => '1',
        _ => '2',
    }
}

/// Latitude digit of a destination character, `None` for the ambiguity
/// markers `K`, `L` and `Z`
fn latitude_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c),
        b'A'..=b'J' => Some(c - b'A' + b'0'),
        b'P'..=b'Y' => Some(c - b'P' + b'0'),
        _ => None,
    }
}

fn is_info_valid(info: &[u8]) -> bool {
    let in_range = |b: u8, lo: u8, hi: u8| (lo..=hi).contains(&b);
    info.len() >= 8
        && in_range(info[0], 0x26, 0x7f)
        && in_range(info[1], 0x26, 0x61)
        && in_range(info[2], 0x1c, 0x7f)
        && in_range(info[3], 0x1c, 0x7f)
        && in_range(info[4], 0x1c, 0x7d)
        && in_range(info[5], 0x1c, 0x7f)
        && is_symbol_code(info[6])
        && is_symbol_table(info[7])
}

/// Repair the common dropout of one speed/course byte: four good bytes, a
/// space, then symbol code and table
fn repair_info(info: &[u8]) -> Option<Vec<u8>> {
    let in_range = |b: u8, lo: u8, hi: u8| (lo..=hi).contains(&b);
    let mangled = info.len() >= 7
        && in_range(info[0], 0x26, 0x7f)
        && in_range(info[1], 0x26, 0x61)
        && in_range(info[2], 0x1c, 0x7f)
        && in_range(info[3], 0x1c, 0x7f)
        && info[4] == b' '
        && is_symbol_code(info[5])
        && is_symbol_table(info[6]);
    if !mangled {
        return None;
    }
    let mut repaired = Vec::with_capacity(info.len() + 1);
    repaired.extend_from_slice(&info[..4]);
    repaired.extend_from_slice(b"  ");
    repaired.extend_from_slice(&info[5..]);
    Some(repaired)
}

/// Altitude `xxx}`: three base-91 digits, meters above -10 km
fn extract_altitude(comment: &mut Vec<u8>) -> Option<f64> {
    let end = comment
        .windows(4)
        .position(|w| w[3] == b'}' && w[..3].iter().all(|&b| base91::is_digit(b)))?;
    let value = base91::decode(&comment[end..end + 3])?;
    comment.drain(end..end + 4);
    Some(value as f64 - ALTITUDE_OFFSET)
}

/// Decode a Mic-E body (starting with its `'` or `` ` `` type byte) sent
/// to `destination`
pub(crate) fn decode_mice(
    destination: &str,
    body: &[u8],
    accept_broken: bool,
    packet: &mut ParsedPacket,
) -> Result<()> {
    if body.len() < MIN_BODY_LEN {
        return Err(AprsError::MicEShort);
    }
    let dst = destination_chars(destination)?;

    let mut mangled = false;
    let info = if is_info_valid(&body[1..]) {
        body[1..].to_vec()
    } else {
        match repair_info(&body[1..]).filter(|_| accept_broken) {
            Some(repaired) => {
                log::warn!("repairing mangled Mic-E body from {}", packet.src_callsign.as_deref().unwrap_or("?"));
                mangled = true;
                repaired
            }
            None if !is_symbol_table(body[8]) => {
                return Err(AprsError::InvalidSymbolTable(body[8] as char));
            }
            None => return Err(AprsError::MicEInvalidInfo),
        }
    };

    // Latitude digits, with trailing ambiguity markers as blanks
    let mut lat = [b' '; DESTINATION_LEN];
    for (slot, &c) in lat.iter_mut().zip(dst.iter()) {
        if let Some(digit) = latitude_digit(c) {
            *slot = digit;
        }
    }
    let used = lat.iter().take_while(|b| b.is_ascii_digit()).count();
    if used == 0 || lat[used..].iter().any(|&b| b != b' ') {
        return Err(AprsError::MicEAmbiguityInvalid);
    }
    let ambiguity = (DESTINATION_LEN - used) as u8;
    if ambiguity > 4 {
        return Err(AprsError::MicEAmbiguityInvalid);
    }

    let lat_deg = ((lat[0] - b'0') * 10 + (lat[1] - b'0')) as f64;
    let lat_min = [lat[2], lat[3], lat[4], lat[5]];
    let mut latitude = if ambiguity == 4 {
        lat_deg + 0.5
    } else {
        lat_deg + ambiguous_minutes(&lat_min, ambiguity).map_err(|_| AprsError::MicEInvalidInfo)? / 60.0
    };
    if dst[3] <= b'L' {
        latitude = -latitude;
    }

    let mut lon_deg = (info[0] - OFFSET) as i32;
    if dst[4] >= b'P' {
        lon_deg += 100;
    }
    if (180..=189).contains(&lon_deg) {
        lon_deg -= 80;
    } else if (190..=199).contains(&lon_deg) {
        lon_deg -= 190;
    }
    let mut lon_min = info[1] - OFFSET;
    if lon_min >= 60 {
        lon_min -= 60;
    }
    let lon_hundredths = info[2] - OFFSET;
    let digits = format!("{:02}{:02}", lon_min, lon_hundredths.min(99));
    let lon_min: [u8; 4] = digits.as_bytes().try_into().map_err(|_| AprsError::MicEInvalidInfo)?;
    let mut longitude = if ambiguity == 4 {
        lon_deg as f64 + 0.5
    } else {
        lon_deg as f64 + ambiguous_minutes(&lon_min, ambiguity).map_err(|_| AprsError::MicEInvalidInfo)? / 60.0
    };
    if dst[5] >= b'P' {
        longitude = -longitude;
    }
    check_range(latitude, longitude)?;

    packet.packet_type = PacketType::Location;
    packet.format = PacketFormat::Mice;
    packet.latitude = Some(latitude);
    packet.longitude = Some(longitude);
    packet.pos_ambiguity = Some(ambiguity);
    packet.pos_resolution = Some(resolution_for_ambiguity(ambiguity));
    packet.symbol_code = Some(info[6] as char);
    packet.symbol_table = Some(info[7] as char);
    packet.mice_mangled = mangled;

    let mbits: String = dst[..3].iter().map(|&c| message_bit(c)).collect();
    packet.mice_message = mice_message(&mbits);
    packet.mbits = Some(mbits);

    if !mangled {
        let sp = (info[3] - OFFSET) as u32;
        let dc = (info[4] - OFFSET) as u32;
        let se = (info[5] - OFFSET) as u32;
        let mut speed = sp * 10 + dc / 10;
        let mut course = (dc % 10) * 100 + se;
        if speed >= 800 {
            speed -= 800;
        }
        if course >= 400 {
            course -= 400;
        }
        packet.speed = Some(speed as f64 * KNOT_TO_KMH);
        if course <= 360 {
            packet.course = Some(course as u16);
        }
    }

    let mut comment = info[8..].to_vec();
    if let Some((telemetry, used)) = parse_mice_telemetry(&comment) {
        packet.telemetry = Some(telemetry);
        comment.drain(..used);
    }
    if let Some(altitude) = extract_altitude(&mut comment) {
        packet.altitude = Some(altitude);
    }
    decode_trailer(&comment, packet, CommentRules { data_extension: false })
}
