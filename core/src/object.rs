//! Objects (`;`) and items (`)`)

use crate::error::{AprsError, Result};
use crate::packet::{PacketType, ParsedPacket};
use crate::position::{decode_report, starts_position};
use crate::timestamp::{parse_timestamp, TIMESTAMP_LEN};

pub const OBJECT_NAME_LEN: usize = 9;
pub const OBJECT_MIN_LEN: usize = 31;
pub const ITEM_NAME_MIN: usize = 3;
pub const ITEM_NAME_MAX: usize = 9;
pub const ITEM_MIN_LEN: usize = 18;

/// `;` + name + alive flag + timestamp
const OBJECT_POSITION_AT: usize = 1 + OBJECT_NAME_LEN + 1 + TIMESTAMP_LEN;

pub fn is_item_name_byte(b: u8) -> bool {
    b == 0x20 || (0x22..=0x5e).contains(&b) || (0x60..=0x7e).contains(&b)
}

/// Decode `;NNNNNNNNN*DDHHMMz<position><comment>`
pub(crate) fn decode_object(body: &[u8], packet: &mut ParsedPacket) -> Result<()> {
    if body.len() < OBJECT_MIN_LEN {
        return Err(AprsError::ObjectShort);
    }
    let name = &body[1..1 + OBJECT_NAME_LEN];
    if !name.iter().all(|b| (0x20..=0x7e).contains(b)) {
        return Err(AprsError::ObjectInvalid);
    }
    let alive = match body[1 + OBJECT_NAME_LEN] {
        b'*' => true,
        b'_' => false,
        _ => return Err(AprsError::ObjectInvalid),
    };
    let stamp = &body[1 + OBJECT_NAME_LEN + 1..OBJECT_POSITION_AT];
    if !stamp[..6].iter().all(u8::is_ascii_digit) || !matches!(stamp[6], b'z' | b'h' | b'/') {
        return Err(AprsError::ObjectInvalid);
    }
    let position = &body[OBJECT_POSITION_AT..];
    if !starts_position(position) {
        return Err(AprsError::ObjectInvalid);
    }

    packet.packet_type = PacketType::Object;
    packet.object_name = Some(String::from_utf8_lossy(name).into_owned());
    packet.alive = Some(alive);
    match parse_timestamp(stamp) {
        Ok(timestamp) => packet.timestamp = Some(timestamp),
        Err(err) => packet.warn(err),
    }
    decode_report(position, packet)
}

/// Decode `)NAME!<position><comment>`
pub(crate) fn decode_item(body: &[u8], packet: &mut ParsedPacket) -> Result<()> {
    if body.len() < ITEM_MIN_LEN {
        return Err(AprsError::ItemShort);
    }
    let name_len = body[1..].iter().take_while(|&&b| is_item_name_byte(b)).count();
    if !(ITEM_NAME_MIN..=ITEM_NAME_MAX).contains(&name_len) {
        return Err(AprsError::ItemInvalid);
    }
    let alive = match body[1 + name_len] {
        b'!' => true,
        b'_' => false,
        _ => return Err(AprsError::ItemInvalid),
    };
    let position = &body[2 + name_len..];
    if !starts_position(position) {
        return Err(AprsError::ItemInvalid);
    }

    packet.packet_type = PacketType::Item;
    packet.item_name = Some(String::from_utf8_lossy(&body[1..1 + name_len]).into_owned());
    packet.alive = Some(alive);
    decode_report(position, packet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketFormat;
    use crate::timestamp::Timestamp;

    #[test]
    fn test_object() {
        let mut packet = ParsedPacket::empty();
        decode_object(b";LEADER   *092345z4903.50N/07201.75W>088/036Cruising", &mut packet).unwrap();
        assert_eq!(packet.packet_type, PacketType::Object);
        assert_eq!(packet.object_name.as_deref(), Some("LEADER   "));
        assert_eq!(packet.alive, Some(true));
        assert_eq!(
            packet.timestamp,
            Some(Timestamp::DayHourMinute { day: 9, hour: 23, minute: 45, zulu: true })
        );
        assert!((packet.latitude.unwrap() - 49.058333).abs() < 0.00001);
        assert_eq!(packet.course, Some(88));
        assert_eq!(packet.comment.as_deref(), Some("Cruising"));
    }

    #[test]
    fn test_killed_compressed_object() {
        let mut packet = ParsedPacket::empty();
        decode_object(b";CAR      _111111z/5L!!<*e7>7P[", &mut packet).unwrap();
        assert_eq!(packet.alive, Some(false));
        assert_eq!(packet.format, PacketFormat::Compressed);
    }

    #[test]
    fn test_object_bad_timestamp_is_warning() {
        let mut packet = ParsedPacket::empty();
        decode_object(b";LEADER   *992345z4903.50N/07201.75W>", &mut packet).unwrap();
        assert_eq!(packet.timestamp, None);
        assert_eq!(packet.warnings, vec![AprsError::TimestampInvalid]);
    }

    #[test]
    fn test_object_errors() {
        let mut packet = ParsedPacket::empty();
        assert!(matches!(decode_object(b";LEADER   *092345z4903", &mut packet), Err(AprsError::ObjectShort)));
        assert!(matches!(
            decode_object(b";LEADER   x092345z4903.50N/07201.75W>", &mut packet),
            Err(AprsError::ObjectInvalid)
        ));
        assert!(matches!(
            decode_object(b";LEADER   *092345z#903.50N/07201.75W>", &mut packet),
            Err(AprsError::ObjectInvalid)
        ));
    }

    #[test]
    fn test_item() {
        let mut packet = ParsedPacket::empty();
        decode_item(b")AID #2!4903.50N/07201.75WA", &mut packet).unwrap();
        assert_eq!(packet.packet_type, PacketType::Item);
        assert_eq!(packet.item_name.as_deref(), Some("AID #2"));
        assert_eq!(packet.alive, Some(true));
        assert!((packet.latitude.unwrap() - 49.0583).abs() < 0.0001);
        assert_eq!(packet.symbol_code, Some('A'));
    }

    #[test]
    fn test_item_errors() {
        let mut packet = ParsedPacket::empty();
        assert!(matches!(decode_item(b")AID!4903.50N", &mut packet), Err(AprsError::ItemShort)));
        assert!(matches!(
            decode_item(b")AB!4903.50N/07201.75WA", &mut packet),
            Err(AprsError::ItemInvalid)
        ));
        assert!(matches!(
            decode_item(b")TOOLONGNAME!4903.50N/07201.75WA", &mut packet),
            Err(AprsError::ItemInvalid)
        ));
    }
}
