//! APRS packet decoding and encoding
//!
//! Parses TNC2 text packets (`SRC>DST,PATH:BODY`) into structured reports,
//! converts between KISS/AX.25 frames and TNC2 text, and builds position,
//! object and item bodies for transmission.

pub mod base91;
pub mod callsign;
pub mod comment;
pub mod dispatch;
pub mod encoder;
pub mod error;
pub mod header;
pub mod kiss;
pub mod message;
pub mod mice;
pub mod nmea;
pub mod object;
pub mod packet;
pub mod path;
pub mod position;
pub mod telemetry;
pub mod timestamp;
pub mod weather;

pub use callsign::{validate_callsign, Callsign};
pub use dispatch::{parse, ParseOptions, Parser};
pub use encoder::{encode_position, make_item, make_object, make_position, PositionReport};
pub use error::{AprsError, Result};
pub use kiss::{kiss_to_tnc2, tnc2_to_kiss};
pub use packet::{DigipeaterHop, Message, PacketFormat, PacketType, ParsedPacket, Telemetry};
pub use path::count_digihops;
pub use timestamp::{make_timestamp, Timestamp};
pub use weather::Weather;

// Unit conversions
pub const KNOT_TO_KMH: f64 = 1.852;
pub const MPH_TO_KMH: f64 = 1.609344;
pub const MPH_TO_MS: f64 = 0.44704;
pub const FEET_TO_METERS: f64 = 0.3048;
pub const HUNDREDTH_INCH_TO_MM: f64 = 0.254;

// Position resolution in meters, indexed by ambiguity level
pub const AMBIGUITY_RESOLUTION: [f64; 5] = [18.52, 185.2, 1852.0, 18520.0, 111_120.0];
pub const COMPRESSED_RESOLUTION: f64 = 0.291; // one base-91 unit

// AX.25 addressing
pub const MAX_DIGIPEATERS: usize = 8;
pub const AX25_ADDR_LEN: usize = 7; // 6 shifted callsign bytes + SSID byte
pub const AX25_CONTROL_UI: u8 = 0x03;
pub const AX25_PID_NO_LAYER3: u8 = 0xf0;

// KISS framing
pub const KISS_FEND: u8 = 0xc0;
pub const KISS_FESC: u8 = 0xdb;
pub const KISS_TFEND: u8 = 0xdc;
pub const KISS_TFESC: u8 = 0xdd;
pub const KISS_DATA_FRAME: u8 = 0x00;
pub const KISS_MIN_FRAME_LEN: usize = 16; // type byte + 2 addresses + control + PID

/// Symbol code of a weather station; its comment carries weather data
pub const WEATHER_SYMBOL: char = '_';
