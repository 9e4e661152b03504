use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AprsError {
    #[error("Invalid packet header: {0}")]
    InvalidHeader(String),

    #[error("Invalid AX.25 callsign: {0}")]
    InvalidCallsign(String),

    #[error("SSID out of range 0-15: {0}")]
    SsidOutOfRange(String),

    #[error("Packet body too short for its type")]
    PacketShort,

    #[error("Invalid symbol table character {0:?}")]
    InvalidSymbolTable(char),

    #[error("Position out of range")]
    PositionOutOfRange,

    #[error("Too short uncompressed location")]
    LocationShort,

    #[error("Invalid uncompressed location")]
    LocationInvalid,

    #[error("Invalid position ambiguity")]
    LocationAmbiguityInvalid,

    #[error("Invalid compressed position")]
    CompressedInvalid,

    #[error("Too short Mic-E packet")]
    MicEShort,

    #[error("Invalid characters in Mic-E destination callsign")]
    MicEInvalidDestination,

    #[error("Invalid characters in Mic-E information field")]
    MicEInvalidInfo,

    #[error("Invalid Mic-E position ambiguity")]
    MicEAmbiguityInvalid,

    #[error("Too short object")]
    ObjectShort,

    #[error("Invalid object")]
    ObjectInvalid,

    #[error("Too short item")]
    ItemShort,

    #[error("Invalid item")]
    ItemInvalid,

    #[error("Invalid message packet")]
    MessageInvalid,

    #[error("Invalid timestamp")]
    TimestampInvalid,

    #[error("Invalid NMEA sentence: {0}")]
    NmeaInvalid(String),

    #[error("NMEA checksum mismatch")]
    NmeaChecksum,

    #[error("NMEA sentence reports no position fix")]
    NmeaNoFix,

    #[error("Unsupported NMEA sentence: {0}")]
    NmeaUnsupported(String),

    #[error("Invalid weather report")]
    WeatherInvalid,

    #[error("Reversed generic path element {0}")]
    ReversedGenericPath(String),

    #[error("Malformed telemetry")]
    TelemetryMalformed,

    #[error("KISS frame too short")]
    KissTooShort,

    #[error("KISS frame is not a data frame")]
    KissNotDataFrame,

    #[error("Invalid KISS escape sequence")]
    KissInvalidEscape,

    #[error("Invalid AX.25 addressing in KISS frame")]
    KissBadAddressing,

    #[error("Too many digipeaters")]
    KissTooManyDigis,

    #[error("Not an AX.25 UI frame")]
    KissNotUi,

    #[error("Unsupported AX.25 protocol id")]
    KissBadPid,

    #[error("Invalid encoder input: {0}")]
    InvalidEncodeInput(String),
}

impl AprsError {
    /// Stable result code for the error, as reported in `resultcode`.
    pub fn code(&self) -> &'static str {
        match self {
            AprsError::InvalidHeader(_) => "invalid_header",
            AprsError::InvalidCallsign(_) => "invalid_callsign",
            AprsError::SsidOutOfRange(_) => "ssid_out_of_range",
            AprsError::PacketShort => "packet_short",
            AprsError::InvalidSymbolTable(_) => "sym_inv_table",
            AprsError::PositionOutOfRange => "position_out_of_range",
            AprsError::LocationShort => "loc_short",
            AprsError::LocationInvalid => "loc_inv",
            AprsError::LocationAmbiguityInvalid => "loc_amb_inv",
            AprsError::CompressedInvalid => "comp_inv",
            AprsError::MicEShort => "mice_short",
            AprsError::MicEInvalidDestination => "mice_inv",
            AprsError::MicEInvalidInfo => "mice_inv_info",
            AprsError::MicEAmbiguityInvalid => "mice_amb_inv",
            AprsError::ObjectShort => "obj_short",
            AprsError::ObjectInvalid => "obj_inv",
            AprsError::ItemShort => "item_short",
            AprsError::ItemInvalid => "item_inv",
            AprsError::MessageInvalid => "msg_inv",
            AprsError::TimestampInvalid => "timestamp_inv",
            AprsError::NmeaInvalid(_) => "nmea_inv",
            AprsError::NmeaChecksum => "nmea_inv_cksum",
            AprsError::NmeaNoFix => "nmea_nofix",
            AprsError::NmeaUnsupported(_) => "nmea_unsupp",
            AprsError::WeatherInvalid => "wx_inv",
            AprsError::ReversedGenericPath(_) => "path_reversed",
            AprsError::TelemetryMalformed => "telemetry_malformed",
            AprsError::KissTooShort => "kiss_too_short",
            AprsError::KissNotDataFrame => "kiss_not_data_frame",
            AprsError::KissInvalidEscape => "kiss_inv_escape",
            AprsError::KissBadAddressing => "kiss_bad_addressing",
            AprsError::KissTooManyDigis => "kiss_too_many_digis",
            AprsError::KissNotUi => "kiss_not_ui",
            AprsError::KissBadPid => "kiss_bad_pid",
            AprsError::InvalidEncodeInput(_) => "encode_invalid",
        }
    }
}

impl Serialize for AprsError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AprsError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

pub type Result<T> = std::result::Result<T, AprsError>;
