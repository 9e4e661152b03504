//! Decode entry point: header parsing, body classification and routing to
//! the format decoders

use crate::error::{AprsError, Result};
use crate::header::parse_header;
use crate::kiss::kiss_to_tnc2;
use crate::message::{decode_message, decode_status};
use crate::mice::decode_mice;
use crate::nmea::decode_nmea;
use crate::object::{decode_item, decode_object};
use crate::packet::{PacketType, ParsedPacket};
use crate::path::GenericPath;
use crate::position::{decode_report, starts_position};
use crate::telemetry::parse_telemetry_packet;
use crate::timestamp::{parse_timestamp, TIMESTAMP_LEN};
use crate::weather::parse_positionless;

/// Shortest `!`/`=`/`/`/`@` body worth decoding
pub const POSITION_MIN_LEN: usize = 14;
/// A position without a recognized prefix must start its `!` this early
pub const LAST_RESORT_WINDOW: usize = 40;
const POSITIONLESS_WEATHER_STAMP: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Repair Mic-E bodies that lost one speed/course byte
    pub accept_broken_mice: bool,
    /// Apply AX.25 rules to the header, for packets heard off air
    pub raw_ax25: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_broken_mice(mut self, accept: bool) -> Self {
        self.accept_broken_mice = accept;
        self
    }

    pub fn raw_ax25(mut self, raw: bool) -> Self {
        self.raw_ax25 = raw;
        self
    }
}

/// Body formats, keyed on the leading bytes of the body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    MicE,
    Position { timestamped: bool, messaging: bool },
    Nmea,
    Object,
    Item,
    Message,
    Status,
    Telemetry,
    PositionlessWeather,
    Unknown,
}

impl BodyKind {
    pub fn classify(body: &[u8]) -> Self {
        match body {
            [b'\'' | b'`', ..] => BodyKind::MicE,
            [b'!', ..] => BodyKind::Position { timestamped: false, messaging: false },
            [b'=', ..] => BodyKind::Position { timestamped: false, messaging: true },
            [b'/', ..] => BodyKind::Position { timestamped: true, messaging: false },
            [b'@', ..] => BodyKind::Position { timestamped: true, messaging: true },
            [b'$', b'G', b'P' | b'N', ..] => BodyKind::Nmea,
            [b';', ..] => BodyKind::Object,
            [b')', ..] => BodyKind::Item,
            [b':', ..] => BodyKind::Message,
            [b'>', ..] => BodyKind::Status,
            [b'T', b'#', ..] => BodyKind::Telemetry,
            [b'_', rest @ ..]
                if rest.len() >= POSITIONLESS_WEATHER_STAMP
                    && rest[..POSITIONLESS_WEATHER_STAMP].iter().all(u8::is_ascii_digit) =>
            {
                BodyKind::PositionlessWeather
            }
            _ => BodyKind::Unknown,
        }
    }
}

/// APRS packet decoder
#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: ParseOptions,
}

impl Parser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Decode one TNC2 packet. Never fails: errors are reported through
    /// [`ParsedPacket::result`].
    pub fn parse(&self, packet: &[u8]) -> ParsedPacket {
        let (header, body) = match parse_header(packet, self.options.raw_ax25) {
            Ok(split) => split,
            Err(err) => {
                log::debug!("rejecting packet header: {}", err);
                return ParsedPacket::failed(err);
            }
        };

        let mut parsed = ParsedPacket::empty();
        parsed.src_callsign = Some(header.source);
        parsed.dst_callsign = Some(header.destination);
        parsed.header = Some(header.raw);
        parsed.body = Some(String::from_utf8_lossy(body).into_owned());
        parsed.digipeaters = header.digipeaters;

        let reversed: Vec<String> = parsed
            .digipeaters
            .iter()
            .filter(|hop| {
                matches!(GenericPath::parse(&hop.call), Some(GenericPath::Wide { hops, remaining }) if remaining > hops)
            })
            .map(|hop| hop.call.clone())
            .collect();
        for call in reversed {
            parsed.warn(AprsError::ReversedGenericPath(call));
        }

        if let Err(err) = self.decode_body(body, &mut parsed) {
            log::debug!(
                "{}: {} body not decoded: {}",
                parsed.src_callsign.as_deref().unwrap_or("?"),
                err.code(),
                err
            );
            parsed.degrade(err);
        }
        parsed
    }

    /// Decode a KISS frame as heard off air
    pub fn parse_kiss(&self, frame: &[u8]) -> ParsedPacket {
        match kiss_to_tnc2(frame) {
            Ok(tnc2) => self.parse(&tnc2),
            Err(err) => ParsedPacket::failed(err),
        }
    }

    fn decode_body(&self, body: &[u8], packet: &mut ParsedPacket) -> Result<()> {
        if body.is_empty() {
            return Err(AprsError::PacketShort);
        }
        let kind = BodyKind::classify(body);
        log::trace!("body kind {:?}", kind);

        match kind {
            BodyKind::MicE => {
                let destination = packet.dst_callsign.clone().unwrap_or_default();
                decode_mice(&destination, body, self.options.accept_broken_mice, packet)
            }
            BodyKind::Position { timestamped, messaging } => {
                decode_position(body, timestamped, messaging, packet)
            }
            BodyKind::Nmea => decode_nmea(body, packet),
            BodyKind::Object => decode_object(body, packet),
            BodyKind::Item => decode_item(body, packet),
            BodyKind::Message => decode_message(body, packet),
            BodyKind::Status => decode_status(body, packet),
            BodyKind::Telemetry => {
                packet.telemetry = Some(parse_telemetry_packet(&body[2..])?);
                packet.packet_type = PacketType::Telemetry;
                Ok(())
            }
            BodyKind::PositionlessWeather => {
                let (timestamp, weather) = parse_positionless(&body[1..])?;
                packet.packet_type = PacketType::Weather;
                packet.weather = Some(weather);
                match timestamp {
                    Ok(timestamp) => packet.timestamp = Some(timestamp),
                    Err(err) => packet.warn(err),
                }
                Ok(())
            }
            BodyKind::Unknown => {
                decode_last_resort(body, packet);
                Ok(())
            }
        }
    }
}

fn decode_position(body: &[u8], timestamped: bool, messaging: bool, packet: &mut ParsedPacket) -> Result<()> {
    if body.len() < POSITION_MIN_LEN {
        return Err(AprsError::PacketShort);
    }
    let mut data = &body[1..];
    if timestamped {
        match parse_timestamp(&data[..TIMESTAMP_LEN]) {
            Ok(timestamp) => packet.timestamp = Some(timestamp),
            Err(err) => packet.warn(err),
        }
        data = &data[TIMESTAMP_LEN..];
    }
    packet.packet_type = PacketType::Location;
    packet.messaging = Some(messaging);
    decode_report(data, packet)
}

/// Look for a `!` position near the start of an unrecognized body. Failing
/// that the packet stays `other`, which is not an error.
fn decode_last_resort(body: &[u8], packet: &mut ParsedPacket) {
    let window = &body[..body.len().min(LAST_RESORT_WINDOW)];
    let bangs = window.iter().enumerate().rev().filter_map(|(i, &b)| (b == b'!').then_some(i));

    // rightmost `!` first
    for bang in bangs {
        let data = &body[bang + 1..];
        if !starts_position(data) {
            continue;
        }
        let mut attempt = packet.clone();
        attempt.packet_type = PacketType::Location;
        attempt.messaging = Some(false);
        match decode_report(data, &mut attempt) {
            Ok(()) => {
                *packet = attempt;
                return;
            }
            Err(err) => log::debug!("no position after `!` at {}: {}", bang, err),
        }
    }
}

/// Decode one TNC2 packet with the given options
pub fn parse<P: AsRef<[u8]>>(packet: P, options: ParseOptions) -> ParsedPacket {
    Parser::new(options).parse(packet.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketFormat;

    #[test]
    fn test_classify() {
        assert_eq!(BodyKind::classify(b"'abc"), BodyKind::MicE);
        assert_eq!(
            BodyKind::classify(b"@092345z"),
            BodyKind::Position { timestamped: true, messaging: true }
        );
        assert_eq!(BodyKind::classify(b"$GPRMC"), BodyKind::Nmea);
        assert_eq!(BodyKind::classify(b"$ULTW"), BodyKind::Unknown);
        assert_eq!(BodyKind::classify(b"T#001,1"), BodyKind::Telemetry);
        assert_eq!(BodyKind::classify(b"_10090556c"), BodyKind::PositionlessWeather);
        assert_eq!(BodyKind::classify(b"_1009"), BodyKind::Unknown);
        assert_eq!(BodyKind::classify(b"{custom"), BodyKind::Unknown);
    }

    #[test]
    fn test_options_builder() {
        let options = ParseOptions::new().accept_broken_mice(true).raw_ax25(true);
        assert!(options.accept_broken_mice);
        assert!(options.raw_ax25);
        assert_eq!(Parser::new(options).options(), &options);
    }

    #[test]
    fn test_position_with_timestamp() {
        let packet = parse("N0CALL>APRS:@092345z4903.50N/07201.75W>", ParseOptions::default());
        assert!(packet.is_ok());
        assert_eq!(packet.messaging, Some(true));
        assert!(packet.timestamp.is_some());
        assert_eq!(packet.format, PacketFormat::Uncompressed);
    }

    #[test]
    fn test_invalid_timestamp_is_warning() {
        let packet = parse("N0CALL>APRS:/999999z4903.50N/07201.75W>", ParseOptions::default());
        assert!(packet.is_ok());
        assert_eq!(packet.timestamp, None);
        assert_eq!(packet.warnings, vec![AprsError::TimestampInvalid]);
    }

    #[test]
    fn test_short_position_degrades() {
        let packet = parse("N0CALL>APRS:!4903.50N", ParseOptions::default());
        assert_eq!(packet.resultcode(), Some("packet_short"));
        assert_eq!(packet.packet_type, PacketType::Other);
        assert_eq!(packet.src_callsign.as_deref(), Some("N0CALL"));
    }

    #[test]
    fn test_last_resort_position() {
        let packet = parse("N0CALL>APRS:Hello!4903.50N/07201.75W-there", ParseOptions::default());
        assert!(packet.is_ok());
        assert_eq!(packet.packet_type, PacketType::Location);
        assert_eq!(packet.messaging, Some(false));
        assert_eq!(packet.comment.as_deref(), Some("there"));
    }

    #[test]
    fn test_last_resort_skips_earlier_bang() {
        let packet = parse("N0CALL>APRS:Hi! at !4903.50N/07201.75W-there", ParseOptions::default());
        assert!(packet.is_ok());
        assert_eq!(packet.packet_type, PacketType::Location);
        assert!((packet.latitude.unwrap() - 49.058333).abs() < 0.0001);
        assert_eq!(packet.comment.as_deref(), Some("there"));
    }

    #[test]
    fn test_dao_past_the_pole_fails_position() {
        let packet = parse("N0CALL>APRS:!9000.00N/18000.00E>!W99!", ParseOptions::default());
        assert_eq!(packet.resultcode(), Some("position_out_of_range"));
        assert_eq!(packet.packet_type, PacketType::Other);
        assert_eq!(packet.latitude, None);
    }

    #[test]
    fn test_unknown_body_is_not_an_error() {
        let packet = parse("N0CALL>APRS:{{experimental", ParseOptions::default());
        assert!(packet.is_ok());
        assert_eq!(packet.packet_type, PacketType::Other);
        assert_eq!(packet.format, PacketFormat::Unknown);

        let packet = parse("N0CALL>APRS:Hi! not a position", ParseOptions::default());
        assert!(packet.is_ok());
        assert_eq!(packet.latitude, None);
    }

    #[test]
    fn test_reversed_path_warning() {
        let packet = parse("N0CALL>APRS,WIDE1-3:>hi", ParseOptions::default());
        assert!(packet.is_ok());
        assert_eq!(packet.warnings[0].code(), "path_reversed");
        assert_eq!(packet.digihops(), 0);
    }

    #[test]
    fn test_empty_body() {
        let packet = parse("N0CALL>APRS:", ParseOptions::default());
        assert_eq!(packet.resultcode(), Some("packet_short"));
    }

    #[test]
    fn test_positionless_weather_packet() {
        let packet = parse("N0CALL>APRS:_10090556c220s004g005t077", ParseOptions::default());
        assert_eq!(packet.packet_type, PacketType::Weather);
        assert_eq!(packet.weather.unwrap().wind_direction, Some(220));
    }

    #[test]
    fn test_telemetry_packet() {
        let packet = parse("N0CALL>APRS:T#005,199,000,255,073,123,01101001", ParseOptions::default());
        assert_eq!(packet.packet_type, PacketType::Telemetry);
        assert_eq!(packet.telemetry.unwrap().seq, Some(5));

        let packet = parse("N0CALL>APRS:T#xyz", ParseOptions::default());
        assert_eq!(packet.resultcode(), Some("telemetry_malformed"));
        assert_eq!(packet.packet_type, PacketType::Other);
    }
}
