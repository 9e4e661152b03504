//! Position, object and item body encoding

use crate::base91;
use crate::error::{AprsError, Result};
use crate::object::{is_item_name_byte, ITEM_NAME_MAX, ITEM_NAME_MIN, OBJECT_NAME_LEN};
use crate::position::{is_symbol_code, is_symbol_table};
use crate::timestamp::{make_timestamp, Timestamp};
use crate::{FEET_TO_METERS, KNOT_TO_KMH};

const MAX_KNOTS: f64 = 999.0;
const MAX_ALTITUDE_FEET: f64 = 999_999.0;
const MIN_ALTITUDE_FEET: f64 = -99_999.0;
const MAX_AMBIGUITY: u8 = 4;
/// Compression type with course/speed: current fix, software origin
const COMPRESSION_TYPE_COURSE: char = 'G';
/// Compression type with altitude: current fix, GGA origin
const COMPRESSION_TYPE_ALTITUDE: char = 'W';

/// Everything needed to encode a position report
#[derive(Debug, Clone, PartialEq)]
pub struct PositionReport {
    pub latitude: f64,
    pub longitude: f64,
    /// km/h, sent together with `course`
    pub speed: Option<f64>,
    /// Degrees 1-360, 0 for unknown
    pub course: Option<u16>,
    /// Meters
    pub altitude: Option<f64>,
    pub symbol_table: char,
    pub symbol_code: char,
    /// 0-4 blanked minute digits, uncompressed only
    pub ambiguity: u8,
    pub compressed: bool,
    /// Append a `!DAO!` extension with two more minute decimals
    pub dao: bool,
    pub comment: Option<String>,
}

impl PositionReport {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(AprsError::InvalidEncodeInput(msg));
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return invalid(format!("latitude {} out of range", self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return invalid(format!("longitude {} out of range", self.longitude));
        }
        if self.ambiguity > MAX_AMBIGUITY {
            return invalid(format!("ambiguity {} not in 0-4", self.ambiguity));
        }
        if self.compressed && self.ambiguity > 0 {
            return invalid("compressed positions cannot be ambiguous".to_string());
        }
        // A blanked region is decoded to its middle, which would cross the limit
        if self.ambiguity > 0
            && (split_coordinate(self.latitude, false).0 >= 90 || split_coordinate(self.longitude, false).0 >= 180)
        {
            return invalid("ambiguous positions cannot sit on a pole or the antimeridian".to_string());
        }
        if self.dao && (self.compressed || self.ambiguity > 0) {
            return invalid("DAO needs an exact uncompressed position".to_string());
        }
        if !self.symbol_table.is_ascii() || !is_symbol_table(self.symbol_table as u8) {
            return invalid(format!("symbol table {:?}", self.symbol_table));
        }
        if !self.symbol_code.is_ascii() || !is_symbol_code(self.symbol_code as u8) {
            return invalid(format!("symbol code {:?}", self.symbol_code));
        }
        if self.course.is_some() != self.speed.is_some() {
            return invalid("course and speed go together".to_string());
        }
        if let Some(speed) = self.speed {
            if !speed.is_finite() || speed < 0.0 {
                return invalid(format!("speed {}", speed));
            }
        }
        if let Some(course) = self.course {
            if course > 360 {
                return invalid(format!("course {}", course));
            }
        }
        if let Some(altitude) = self.altitude {
            let feet = altitude / FEET_TO_METERS;
            if !feet.is_finite() || !(MIN_ALTITUDE_FEET..=MAX_ALTITUDE_FEET).contains(&feet.round()) {
                return invalid(format!("altitude {}", altitude));
            }
        }
        Ok(())
    }

    fn course_speed(&self) -> Option<(u16, f64)> {
        match (self.course, self.speed) {
            (Some(course), Some(speed)) => Some((course, (speed / KNOT_TO_KMH).min(MAX_KNOTS))),
            _ => None,
        }
    }
}

impl Default for PositionReport {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            speed: None,
            course: None,
            altitude: None,
            symbol_table: '/',
            symbol_code: '/',
            ambiguity: 0,
            compressed: false,
            dao: false,
            comment: None,
        }
    }
}

/// Degrees, hundredths of minutes and the next two minute decimals
fn split_coordinate(value: f64, dao: bool) -> (u64, u64, u64) {
    let minutes = value.abs() * 60.0;
    let (hundredths, extra) = if dao {
        let ten_thousandths = (minutes * 10_000.0).round() as u64;
        (ten_thousandths / 100, ten_thousandths % 100)
    } else {
        ((minutes * 100.0).round() as u64, 0)
    };
    (hundredths / 6000, hundredths % 6000, extra)
}

/// Blank the trailing `ambiguity` minute digits of `DDMM.mm` / `DDDMM.mm`
fn blank_minutes(text: &mut String, ambiguity: u8) {
    let mut bytes = std::mem::take(text).into_bytes();
    let len = bytes.len();
    let minute_digits = [len - 5, len - 4, len - 2, len - 1];
    for &i in minute_digits.iter().rev().take(ambiguity as usize) {
        bytes[i] = b' ';
    }
    *text = String::from_utf8_lossy(&bytes).into_owned();
}

fn dao_char(extra: u64) -> char {
    (base91::FIRST + (extra as f64 / 1.1) as u8) as char
}

fn altitude_extension(meters: f64) -> String {
    let feet = (meters / FEET_TO_METERS).round() as i64;
    if feet < 0 {
        format!("/A=-{:05}", -feet)
    } else {
        format!("/A={:06}", feet)
    }
}

fn encode_uncompressed(report: &PositionReport) -> String {
    let (lat_deg, lat_min, lat_extra) = split_coordinate(report.latitude, report.dao);
    let (lon_deg, lon_min, lon_extra) = split_coordinate(report.longitude, report.dao);

    let mut lat = format!("{:02}{:02}.{:02}", lat_deg, lat_min / 100, lat_min % 100);
    let mut lon = format!("{:03}{:02}.{:02}", lon_deg, lon_min / 100, lon_min % 100);
    blank_minutes(&mut lat, report.ambiguity);
    blank_minutes(&mut lon, report.ambiguity);

    let mut out = format!(
        "{}{}{}{}{}{}",
        lat,
        if report.latitude < 0.0 { 'S' } else { 'N' },
        report.symbol_table,
        lon,
        if report.longitude < 0.0 { 'W' } else { 'E' },
        report.symbol_code
    );

    if let Some((course, knots)) = report.course_speed() {
        out.push_str(&format!("{:03}/{:03}", course, knots.round() as u32));
    }
    if let Some(altitude) = report.altitude {
        out.push_str(&altitude_extension(altitude));
    }
    if report.dao {
        out.push_str(&format!("!w{}{}!", dao_char(lat_extra), dao_char(lon_extra)));
    }
    out
}

fn encode_compressed(report: &PositionReport) -> String {
    let lat_value = (380_926.0 * (90.0 - report.latitude)) as u32;
    let lon_value = (190_463.0 * (180.0 + report.longitude)) as u32;
    let table = match report.symbol_table {
        c @ '0'..='9' => (c as u8 - b'0' + b'a') as char,
        c => c,
    };

    let mut out = String::with_capacity(13);
    out.push(table);
    out.push_str(&base91::encode(lat_value, 4));
    out.push_str(&base91::encode(lon_value, 4));
    out.push(report.symbol_code);

    let mut altitude_text = None;
    match (report.course_speed(), report.altitude) {
        (Some((course, knots)), altitude) => {
            let c = ((course as f64 / 4.0).round() as u32) % 90;
            let s = ((knots + 1.0).ln() / 1.08f64.ln()).round().clamp(0.0, 89.0) as u32;
            out.push((base91::FIRST + c as u8) as char);
            out.push((base91::FIRST + s as u8) as char);
            out.push(COMPRESSION_TYPE_COURSE);
            altitude_text = altitude.map(altitude_extension);
        }
        (None, Some(altitude)) if altitude / FEET_TO_METERS >= 1.0 => {
            let feet = altitude / FEET_TO_METERS;
            let cs = ((feet.ln() / 1.002f64.ln()).round() as u32).min(base91::BASE * base91::BASE - 1);
            out.push_str(&base91::encode(cs, 2));
            out.push(COMPRESSION_TYPE_ALTITUDE);
        }
        (None, altitude) => {
            out.push_str("   ");
            altitude_text = altitude.map(altitude_extension);
        }
    }
    if let Some(text) = altitude_text {
        out.push_str(&text);
    }
    out
}

/// Encode the position part of a report (no type prefix), followed by its
/// comment
pub fn encode_position(report: &PositionReport) -> Result<String> {
    report.validate()?;
    let mut out = if report.compressed {
        encode_compressed(report)
    } else {
        encode_uncompressed(report)
    };
    if let Some(comment) = &report.comment {
        out.push_str(comment);
    }
    Ok(out)
}

fn position_timestamp(timestamp: &Timestamp) -> Result<String> {
    match timestamp {
        Timestamp::MonthDayHourMinute { .. } => Err(AprsError::InvalidEncodeInput(
            "month/day timestamps only belong to weather reports".to_string(),
        )),
        _ => make_timestamp(timestamp),
    }
}

/// Build a complete position body: `!`, `=`, `/` or `@` by timestamp and
/// messaging capability, then the encoded position
pub fn make_position(report: &PositionReport, timestamp: Option<&Timestamp>, messaging: bool) -> Result<String> {
    let position = encode_position(report)?;
    Ok(match timestamp {
        Some(timestamp) => {
            let prefix = if messaging { '@' } else { '/' };
            format!("{}{}{}", prefix, position_timestamp(timestamp)?, position)
        }
        None => {
            let prefix = if messaging { '=' } else { '!' };
            format!("{}{}", prefix, position)
        }
    })
}

/// Build an object body `;NAME     *DDHHMMz<position>`
pub fn make_object(name: &str, alive: bool, timestamp: &Timestamp, report: &PositionReport) -> Result<String> {
    if name.is_empty() || name.len() > OBJECT_NAME_LEN || !name.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        return Err(AprsError::InvalidEncodeInput(format!("object name {:?}", name)));
    }
    Ok(format!(
        ";{:<width$}{}{}{}",
        name,
        if alive { '*' } else { '_' },
        position_timestamp(timestamp)?,
        encode_position(report)?,
        width = OBJECT_NAME_LEN
    ))
}

/// Build an item body `)NAME!<position>`
pub fn make_item(name: &str, alive: bool, report: &PositionReport) -> Result<String> {
    if !(ITEM_NAME_MIN..=ITEM_NAME_MAX).contains(&name.len()) || !name.bytes().all(is_item_name_byte) {
        return Err(AprsError::InvalidEncodeInput(format!("item name {:?}", name)));
    }
    Ok(format!(
        "){}{}{}",
        name,
        if alive { '!' } else { '_' },
        encode_position(report)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{decode_compressed, decode_uncompressed};

    fn report(latitude: f64, longitude: f64) -> PositionReport {
        PositionReport {
            symbol_code: '>',
            ..PositionReport::new(latitude, longitude)
        }
    }

    #[test]
    fn test_uncompressed_basic() {
        let text = encode_position(&report(49.058333, -72.029167)).unwrap();
        assert_eq!(text, "4903.50N/07201.75W>");
    }

    #[test]
    fn test_minute_carry() {
        // 59.999 minutes rounds up into the next degree
        let text = encode_position(&report(10.0 + 59.999 / 60.0, 0.0)).unwrap();
        assert_eq!(text, "1100.00N/00000.00E>");
    }

    #[test]
    fn test_ambiguity_blanking() {
        let expected = [
            "4903.50N/07201.75W>",
            "4903.5 N/07201.7 W>",
            "4903.  N/07201.  W>",
            "490 .  N/0720 .  W>",
            "49  .  N/072  .  W>",
        ];
        for (ambiguity, text) in expected.iter().enumerate() {
            let r = PositionReport {
                ambiguity: ambiguity as u8,
                ..report(49.058333, -72.029167)
            };
            assert_eq!(&encode_position(&r).unwrap(), text);
            assert_eq!(decode_uncompressed(text.as_bytes()).unwrap().ambiguity, Some(ambiguity as u8));
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let bad = [
            PositionReport { ambiguity: 5, ..report(0.0, 0.0) },
            PositionReport { compressed: true, ambiguity: 1, ..report(0.0, 0.0) },
            PositionReport { course: Some(361), speed: Some(1.0), ..report(0.0, 0.0) },
            PositionReport { course: Some(90), ..report(0.0, 0.0) },
            PositionReport { speed: Some(10.0), ..report(0.0, 0.0) },
            PositionReport { ambiguity: 1, ..report(90.0, 0.0) },
            PositionReport { ambiguity: 4, ..report(0.0, -180.0) },
            PositionReport { ambiguity: 2, ..report(89.99999, 0.0) },
            PositionReport { symbol_table: 'x', ..report(0.0, 0.0) },
            report(90.5, 0.0),
            report(0.0, -180.5),
            report(f64::NAN, 0.0),
        ];
        for r in bad {
            assert!(matches!(encode_position(&r), Err(AprsError::InvalidEncodeInput(_))), "{:?}", r);
        }
    }

    #[test]
    fn test_course_speed_altitude() {
        let r = PositionReport {
            course: Some(88),
            speed: Some(36.0 * KNOT_TO_KMH),
            altitude: Some(1234.0 * FEET_TO_METERS),
            ..report(49.058333, -72.029167)
        };
        assert_eq!(encode_position(&r).unwrap(), "4903.50N/07201.75W>088/036/A=001234");

        let r = PositionReport {
            altitude: Some(-100.0 * FEET_TO_METERS),
            ..report(49.058333, -72.029167)
        };
        assert!(encode_position(&r).unwrap().ends_with("/A=-00100"));
    }

    #[test]
    fn test_dao() {
        let r = PositionReport {
            dao: true,
            ..report(60.0 + 28.5175 / 60.0, 25.0 + 5.6849 / 60.0)
        };
        let text = encode_position(&r).unwrap();
        assert!(text.starts_with("6028.51N/02505.68E>"), "{}", text);
        let lat_char = (b'!' + (75.0f64 / 1.1) as u8) as char;
        let lon_char = (b'!' + (49.0f64 / 1.1) as u8) as char;
        assert!(text.ends_with(&format!("!w{}{}!", lat_char, lon_char)), "{}", text);
    }

    #[test]
    fn test_compressed() {
        let r = PositionReport {
            compressed: true,
            course: Some(88),
            speed: Some(36.2 * KNOT_TO_KMH),
            ..report(49.5, -72.75)
        };
        let text = encode_position(&r).unwrap();
        assert_eq!(text, "/5L!!<*e7>7PG");
        let decoded = decode_compressed(text.as_bytes()).unwrap();
        assert_eq!(decoded.course, Some(88));
        assert_eq!(decoded.gps_fix_current, Some(true));
    }

    #[test]
    fn test_compressed_altitude_only_and_overlay() {
        let r = PositionReport {
            compressed: true,
            symbol_table: '3',
            altitude: Some(10_000.0 * FEET_TO_METERS),
            ..report(49.5, -72.75)
        };
        let text = encode_position(&r).unwrap();
        assert!(text.starts_with('d'));
        assert!(text.ends_with('W'));
        let decoded = decode_compressed(text.as_bytes()).unwrap();
        assert_eq!(decoded.symbol_table, '3');
        let feet = decoded.altitude.unwrap() / FEET_TO_METERS;
        assert!((feet - 10_000.0).abs() / 10_000.0 < 0.002, "{}", feet);
    }

    #[test]
    fn test_compressed_without_extras() {
        let r = PositionReport {
            compressed: true,
            ..report(49.5, -72.75)
        };
        assert_eq!(encode_position(&r).unwrap(), "/5L!!<*e7>   ");
    }

    #[test]
    fn test_make_position_prefixes() {
        let r = report(49.058333, -72.029167);
        let stamp = Timestamp::DayHourMinute { day: 9, hour: 23, minute: 45, zulu: true };
        assert!(make_position(&r, None, false).unwrap().starts_with("!4903"));
        assert!(make_position(&r, None, true).unwrap().starts_with("=4903"));
        assert!(make_position(&r, Some(&stamp), false).unwrap().starts_with("/092345z4903"));
        assert!(make_position(&r, Some(&stamp), true).unwrap().starts_with("@092345z4903"));

        let weather_stamp = Timestamp::MonthDayHourMinute { month: 1, day: 1, hour: 0, minute: 0 };
        assert!(make_position(&r, Some(&weather_stamp), true).is_err());
    }

    #[test]
    fn test_make_object_and_item() {
        let r = report(49.058333, -72.029167);
        let stamp = Timestamp::DayHourMinute { day: 9, hour: 23, minute: 45, zulu: true };
        assert_eq!(
            make_object("LEADER", true, &stamp, &r).unwrap(),
            ";LEADER   *092345z4903.50N/07201.75W>"
        );
        assert_eq!(make_item("AID #2", false, &r).unwrap(), ")AID #2_4903.50N/07201.75W>");
        assert!(make_object("WAY TOO LONG", true, &stamp, &r).is_err());
        assert!(make_item("AB", true, &r).is_err());
        assert!(make_item("BAD!NAME", true, &r).is_err());
    }
}
