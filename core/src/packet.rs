//! Decode result types

use serde::Serialize;

use crate::error::AprsError;
use crate::path::count_digihops;
use crate::timestamp::Timestamp;
use crate::weather::Weather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacketType {
    Location,
    Object,
    Item,
    Message,
    TelemetryMessage,
    Status,
    Weather,
    Telemetry,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketFormat {
    Uncompressed,
    Compressed,
    Mice,
    Nmea,
    Unknown,
}

/// One element of the digipeater path, in transmitted order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigipeaterHop {
    pub call: String,
    pub wasdigied: bool,
}

/// Telemetry channels. Unused slots stay `None`, a decoded zero is `Some(0)`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Telemetry {
    pub seq: Option<u32>,
    pub vals: [Option<i64>; 5],
    pub bits: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Message {
    pub destination: String,
    pub text: Option<String>,
    pub id: Option<String>,
    pub ack: Option<String>,
    pub rej: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPacket {
    pub src_callsign: Option<String>,
    pub dst_callsign: Option<String>,
    pub header: Option<String>,
    pub body: Option<String>,
    pub packet_type: PacketType,
    pub format: PacketFormat,
    pub digipeaters: Vec<DigipeaterHop>,

    pub symbol_table: Option<char>,
    pub symbol_code: Option<char>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub pos_ambiguity: Option<u8>,
    /// Meters
    pub pos_resolution: Option<f64>,
    /// Degrees, 0 = unknown, 360 = north
    pub course: Option<u16>,
    /// km/h
    pub speed: Option<f64>,
    /// Meters
    pub altitude: Option<f64>,
    pub comment: Option<String>,
    pub messaging: Option<bool>,
    pub timestamp: Option<Timestamp>,

    pub phg: Option<String>,
    /// km
    pub radio_range: Option<f64>,
    pub dao_datum: Option<char>,
    pub gps_fix_current: Option<bool>,
    pub telemetry: Option<Telemetry>,

    pub mbits: Option<String>,
    pub mice_message: Option<&'static str>,
    pub mice_mangled: bool,

    pub object_name: Option<String>,
    pub item_name: Option<String>,
    pub alive: Option<bool>,
    pub message: Option<Message>,
    pub status: Option<String>,
    pub weather: Option<Weather>,

    pub result: Option<AprsError>,
    pub warnings: Vec<AprsError>,
}

impl ParsedPacket {
    /// An empty result with nothing decoded yet
    pub fn empty() -> Self {
        Self {
            src_callsign: None,
            dst_callsign: None,
            header: None,
            body: None,
            packet_type: PacketType::Other,
            format: PacketFormat::Unknown,
            digipeaters: Vec::new(),
            symbol_table: None,
            symbol_code: None,
            latitude: None,
            longitude: None,
            pos_ambiguity: None,
            pos_resolution: None,
            course: None,
            speed: None,
            altitude: None,
            comment: None,
            messaging: None,
            timestamp: None,
            phg: None,
            radio_range: None,
            dao_datum: None,
            gps_fix_current: None,
            telemetry: None,
            mbits: None,
            mice_message: None,
            mice_mangled: false,
            object_name: None,
            item_name: None,
            alive: None,
            message: None,
            status: None,
            weather: None,
            result: None,
            warnings: Vec::new(),
        }
    }

    /// A failed decode carrying only the error
    pub fn failed(err: AprsError) -> Self {
        Self {
            result: Some(err),
            ..Self::empty()
        }
    }

    /// Drop everything a sub-decoder produced, keeping the parsed header.
    pub(crate) fn degrade(&mut self, err: AprsError) {
        let mut degraded = Self::empty();
        degraded.src_callsign = self.src_callsign.take();
        degraded.dst_callsign = self.dst_callsign.take();
        degraded.header = self.header.take();
        degraded.body = self.body.take();
        degraded.digipeaters = std::mem::take(&mut self.digipeaters);
        degraded.warnings = std::mem::take(&mut self.warnings);
        degraded.result = Some(err);
        *self = degraded;
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_none()
    }

    pub fn resultcode(&self) -> Option<&'static str> {
        self.result.as_ref().map(AprsError::code)
    }

    pub fn resultmsg(&self) -> Option<String> {
        self.result.as_ref().map(|err| err.to_string())
    }

    /// Number of hops the packet has travelled, see [`count_digihops`]
    pub fn digihops(&self) -> u32 {
        count_digihops(&self.digipeaters)
    }

    pub(crate) fn warn(&mut self, err: AprsError) {
        log::debug!("{}: {}", self.src_callsign.as_deref().unwrap_or("?"), err);
        self.warnings.push(err);
    }
}

impl Default for ParsedPacket {
    fn default() -> Self {
        Self::empty()
    }
}
