//! Messages (`:`) and status reports (`>`)

use crate::error::{AprsError, Result};
use crate::packet::{Message, PacketType, ParsedPacket};
use crate::timestamp::{parse_timestamp, TIMESTAMP_LEN};

pub const ADDRESSEE_LEN: usize = 9;
pub const MESSAGE_MIN_LEN: usize = 1 + ADDRESSEE_LEN + 1;
const MAX_ID_LEN: usize = 5;
const TELEMETRY_PREFIXES: [&str; 4] = ["PARM.", "UNIT.", "EQNS.", "BITS."];

fn is_addressee_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b' ' || b == b'-'
}

fn is_id(id: &str) -> bool {
    (1..=MAX_ID_LEN).contains(&id.len()) && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'}')
}

/// `ackNNNNN` / `rejNNNNN`, tolerating trailing whitespace
fn acknowledgement<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let id = text.strip_prefix(prefix)?.trim_end();
    is_id(id).then_some(id)
}

/// Decode `:ADDRESSEE:text{id`
pub(crate) fn decode_message(body: &[u8], packet: &mut ParsedPacket) -> Result<()> {
    if body.len() < MESSAGE_MIN_LEN {
        return Err(AprsError::MessageInvalid);
    }
    let addressee = &body[1..1 + ADDRESSEE_LEN];
    if !addressee.iter().all(|&b| is_addressee_byte(b)) || body[1 + ADDRESSEE_LEN] != b':' {
        return Err(AprsError::MessageInvalid);
    }
    let destination = String::from_utf8_lossy(addressee).trim_end().to_string();
    let text = String::from_utf8_lossy(&body[MESSAGE_MIN_LEN..]).into_owned();

    let mut message = Message {
        destination,
        ..Message::default()
    };

    if let Some(id) = acknowledgement(&text, "ack") {
        message.ack = Some(id.to_string());
    } else if let Some(id) = acknowledgement(&text, "rej") {
        message.rej = Some(id.to_string());
    } else {
        match text.rsplit_once('{') {
            Some((content, id)) if is_id(id.trim_end()) && !content.contains('{') => {
                message.id = Some(id.trim_end().to_string());
                message.text = Some(content.to_string());
            }
            _ => message.text = Some(text),
        }
    }

    let is_telemetry = message
        .text
        .as_deref()
        .map_or(false, |t| TELEMETRY_PREFIXES.iter().any(|p| t.starts_with(p)));
    packet.packet_type = if is_telemetry {
        PacketType::TelemetryMessage
    } else {
        PacketType::Message
    };
    packet.message = Some(message);
    Ok(())
}

/// Decode `>[DDHHMMz]text`
pub(crate) fn decode_status(body: &[u8], packet: &mut ParsedPacket) -> Result<()> {
    let mut text = &body[1..];
    let stamped = text.len() >= TIMESTAMP_LEN
        && text[..6].iter().all(u8::is_ascii_digit)
        && text[6] == b'z';
    if stamped {
        match parse_timestamp(&text[..TIMESTAMP_LEN]) {
            Ok(timestamp) => packet.timestamp = Some(timestamp),
            Err(err) => packet.warn(err),
        }
        text = &text[TIMESTAMP_LEN..];
    }

    packet.packet_type = PacketType::Status;
    packet.status = Some(String::from_utf8_lossy(text).trim_end().to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::Timestamp;

    fn message(body: &[u8]) -> Result<(PacketType, Message)> {
        let mut packet = ParsedPacket::empty();
        decode_message(body, &mut packet)?;
        Ok((packet.packet_type, packet.message.unwrap()))
    }

    #[test]
    fn test_message_with_id() {
        let (kind, msg) = message(b":OH7LZB   :Testing, 1 2 3{42").unwrap();
        assert_eq!(kind, PacketType::Message);
        assert_eq!(msg.destination, "OH7LZB");
        assert_eq!(msg.text.as_deref(), Some("Testing, 1 2 3"));
        assert_eq!(msg.id.as_deref(), Some("42"));
    }

    #[test]
    fn test_message_without_id() {
        let (_, msg) = message(b":N0CALL-10:hello {not an id").unwrap();
        assert_eq!(msg.destination, "N0CALL-10");
        assert_eq!(msg.text.as_deref(), Some("hello {not an id"));
        assert_eq!(msg.id, None);
    }

    #[test]
    fn test_ack_and_rej() {
        let (_, msg) = message(b":OH7LZB   :ack42  ").unwrap();
        assert_eq!(msg.ack.as_deref(), Some("42"));
        assert_eq!(msg.text, None);
        let (_, msg) = message(b":OH7LZB   :rej1}").unwrap();
        assert_eq!(msg.rej.as_deref(), Some("1}"));
    }

    #[test]
    fn test_telemetry_message() {
        let (kind, _) = message(b":N0CALL   :PARM.Battery,Temp").unwrap();
        assert_eq!(kind, PacketType::TelemetryMessage);
    }

    #[test]
    fn test_invalid_message() {
        assert!(matches!(message(b":SHORT:hi"), Err(AprsError::MessageInvalid)));
        assert!(matches!(message(b":BAD*CALL :hi"), Err(AprsError::MessageInvalid)));
        assert!(matches!(message(b":OH7LZB   hi"), Err(AprsError::MessageInvalid)));
    }

    #[test]
    fn test_status() {
        let mut packet = ParsedPacket::empty();
        decode_status(b">092345zNet Control Center  ", &mut packet).unwrap();
        assert_eq!(packet.packet_type, PacketType::Status);
        assert_eq!(packet.status.as_deref(), Some("Net Control Center"));
        assert_eq!(
            packet.timestamp,
            Some(Timestamp::DayHourMinute { day: 9, hour: 23, minute: 45, zulu: true })
        );

        let mut packet = ParsedPacket::empty();
        decode_status(b">On the air", &mut packet).unwrap();
        assert_eq!(packet.status.as_deref(), Some("On the air"));
        assert_eq!(packet.timestamp, None);
    }
}
