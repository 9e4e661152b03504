//! Comment extensions: the leading data extension (`CCC/SSS`, `PHGphgd`,
//! `RNGrrrr`), `/A=` altitude, telemetry, `!DAO!` and the cleanup of what
//! is left as free text.

use crate::base91;
use crate::error::Result;
use crate::packet::ParsedPacket;
use crate::position::check_range;
use crate::telemetry::extract_comment_telemetry;
use crate::{FEET_TO_METERS, KNOT_TO_KMH, MPH_TO_KMH};

const DATA_EXTENSION_LEN: usize = 7;
const ALTITUDE_TAG: &[u8] = b"/A=";
const ALTITUDE_DIGITS: usize = 6;
const DAO_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum DataExtension {
    /// Course in degrees (0 unknown), speed in km/h
    CourseSpeed { course: u16, speed: Option<f64> },
    /// `phgd` digits plus an optional beacon rate character
    Phg(String),
    /// Radio range in km
    Range(f64),
}

/// Precision refinement from a `!DAO!` extension
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dao {
    pub datum: char,
    /// Degrees to add away from zero, `None` for datum-only extensions
    pub lat_offset: Option<f64>,
    pub lon_offset: Option<f64>,
    pub resolution: Option<f64>,
}

fn digits_value(raw: &[u8]) -> Option<u32> {
    if raw.is_empty() || !raw.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(raw.iter().fold(0, |acc, &b| acc * 10 + (b - b'0') as u32))
}

/// Recognize the fixed-width data extension at the start of a comment.
/// Returns the extension and the number of bytes it occupies.
pub fn parse_data_extension(data: &[u8]) -> Option<(DataExtension, usize)> {
    if data.len() < DATA_EXTENSION_LEN {
        return None;
    }

    let is_cse_byte = |b: &u8| b.is_ascii_digit() || *b == b'.' || *b == b' ';
    if data[3] == b'/' && data[..3].iter().all(is_cse_byte) && data[4..7].iter().all(is_cse_byte) {
        let course = match digits_value(&data[..3]) {
            Some(c) if (1..=360).contains(&c) => c as u16,
            _ => 0,
        };
        let speed = digits_value(&data[4..7]).map(|s| s as f64 * KNOT_TO_KMH);
        return Some((DataExtension::CourseSpeed { course, speed }, DATA_EXTENSION_LEN));
    }

    if let Some(phg) = data.strip_prefix(b"PHG") {
        let valid = phg[0].is_ascii_digit()
            && (0x30..=0x7e).contains(&phg[1])
            && phg[2].is_ascii_digit()
            && phg[3].is_ascii_digit();
        if !valid {
            return None;
        }
        // A fifth character is a beacon rate, only when a `/` ends it
        let with_rate = phg.len() >= 6
            && (phg[4].is_ascii_digit() || phg[4].is_ascii_uppercase())
            && phg[5] == b'/';
        let len = if with_rate { 5 } else { 4 };
        let text = String::from_utf8_lossy(&phg[..len]).into_owned();
        return Some((DataExtension::Phg(text), 3 + len));
    }

    if let Some(rng) = data.strip_prefix(b"RNG") {
        let miles = digits_value(&rng[..4])?;
        return Some((DataExtension::Range(miles as f64 * MPH_TO_KMH), DATA_EXTENSION_LEN));
    }

    None
}

/// Cut the first well-formed `/A=` altitude out of `comment`, in meters
pub fn extract_altitude(comment: &mut Vec<u8>) -> Option<f64> {
    let mut from = 0;
    while let Some(at) = find(&comment[from..], ALTITUDE_TAG) {
        let start = from + at;
        let value_start = start + ALTITUDE_TAG.len();
        if let Some(raw) = comment.get(value_start..value_start + ALTITUDE_DIGITS) {
            let feet = match raw[0] {
                b'-' => digits_value(&raw[1..]).map(|v| -(v as f64)),
                _ => digits_value(raw).map(|v| v as f64),
            };
            if let Some(feet) = feet {
                comment.drain(start..value_start + ALTITUDE_DIGITS);
                return Some(feet * FEET_TO_METERS);
            }
        }
        from = start + 1;
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Decode the three bytes between the `!` delimiters of a DAO extension
pub fn parse_dao(field: &[u8; 3]) -> Option<Dao> {
    let [datum, lat, lon] = *field;
    match datum {
        b'A'..=b'Z' if lat.is_ascii_digit() && lon.is_ascii_digit() => Some(Dao {
            datum: datum as char,
            lat_offset: Some((lat - b'0') as f64 * 0.001 / 60.0),
            lon_offset: Some((lon - b'0') as f64 * 0.001 / 60.0),
            resolution: Some(1.852),
        }),
        b'a'..=b'z' if base91::is_digit(lat) && base91::is_digit(lon) => Some(Dao {
            datum: datum.to_ascii_uppercase() as char,
            lat_offset: Some((lat - base91::FIRST) as f64 / 91.0 * 0.01 / 60.0),
            lon_offset: Some((lon - base91::FIRST) as f64 / 91.0 * 0.01 / 60.0),
            resolution: Some(0.1852),
        }),
        0x21..=0x7b if lat == b' ' && lon == b' ' => Some(Dao {
            datum: datum.to_ascii_uppercase() as char,
            lat_offset: None,
            lon_offset: None,
            resolution: None,
        }),
        _ => None,
    }
}

/// Cut the last decodable `!DAO!` out of `comment`
pub fn extract_dao(comment: &mut Vec<u8>) -> Option<Dao> {
    if comment.len() < DAO_LEN {
        return None;
    }
    for start in (0..=comment.len() - DAO_LEN).rev() {
        let window = &comment[start..start + DAO_LEN];
        if window[0] != b'!' || window[4] != b'!' {
            continue;
        }
        let field = [window[1], window[2], window[3]];
        if let Some(dao) = parse_dao(&field) {
            comment.drain(start..start + DAO_LEN);
            return Some(dao);
        }
    }
    None
}

fn away_from_zero(value: f64, offset: f64) -> f64 {
    if value < 0.0 {
        value - offset
    } else {
        value + offset
    }
}

impl Dao {
    /// Refine the packet position. Offsets that would push it past the
    /// poles or the antimeridian fail with `PositionOutOfRange`.
    pub(crate) fn apply_to(&self, packet: &mut ParsedPacket) -> Result<()> {
        let latitude = match (packet.latitude, self.lat_offset) {
            (Some(lat), Some(off)) => Some(away_from_zero(lat, off)),
            (lat, _) => lat,
        };
        let longitude = match (packet.longitude, self.lon_offset) {
            (Some(lon), Some(off)) => Some(away_from_zero(lon, off)),
            (lon, _) => lon,
        };
        check_range(latitude.unwrap_or_default(), longitude.unwrap_or_default())?;

        packet.dao_datum = Some(self.datum);
        packet.latitude = latitude;
        packet.longitude = longitude;
        if let Some(resolution) = self.resolution {
            packet.pos_resolution = Some(resolution);
        }
        Ok(())
    }
}

/// Free text left after extensions: control characters dropped, trimmed,
/// `None` when nothing remains
pub fn clean_comment(raw: &[u8]) -> Option<String> {
    let text: String = String::from_utf8_lossy(raw).chars().filter(|c| !c.is_control()).collect();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Which extensions a comment may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CommentRules {
    pub data_extension: bool,
}

/// Decode the comment following a position into `packet`
pub(crate) fn decode_comment(data: &[u8], packet: &mut ParsedPacket, rules: CommentRules) -> Result<()> {
    let mut rest = data.to_vec();

    if rules.data_extension {
        if let Some((extension, used)) = parse_data_extension(&rest) {
            log::trace!("data extension {:?}", extension);
            match extension {
                DataExtension::CourseSpeed { course, speed } => {
                    if packet.course.is_none() {
                        packet.course = Some(course);
                        packet.speed = speed;
                    }
                }
                DataExtension::Phg(phg) => packet.phg = Some(phg),
                DataExtension::Range(range) => packet.radio_range = Some(range),
            }
            rest.drain(..used);
        }
    }

    if let Some(altitude) = extract_altitude(&mut rest) {
        packet.altitude.get_or_insert(altitude);
    }
    if let Some(telemetry) = extract_comment_telemetry(&mut rest) {
        packet.telemetry = Some(telemetry);
    }
    if let Some(dao) = extract_dao(&mut rest) {
        dao.apply_to(packet)?;
    }

    let text = match rest.first() {
        Some(b'/') => &rest[1..],
        _ => &rest[..],
    };
    packet.comment = clean_comment(text);
    Ok(())
}
