//! Telemetry in its three transports: the base-91 `|ss11..|` comment
//! block, the Mic-E hex channels and `T#` telemetry packets.

use crate::base91;
use crate::error::{AprsError, Result};
use crate::packet::Telemetry;

pub const TELEMETRY_CHANNELS: usize = 5;
pub const TELEMETRY_BITS: usize = 8;

const DELIMITER: u8 = b'|';
const MIN_BLOCK_LEN: usize = 4; // sequence + one channel
const MAX_BLOCK_LEN: usize = 14; // sequence + 5 channels + bits

/// Decode the inside of a `|...|` block: base-91 pairs carrying the
/// sequence, up to five channels and an optional bit field.
pub fn parse_comment_telemetry(block: &[u8]) -> Result<Telemetry> {
    if block.len() % 2 != 0
        || !(MIN_BLOCK_LEN..=MAX_BLOCK_LEN).contains(&block.len())
        || !block.iter().all(|&b| base91::is_digit(b))
    {
        return Err(AprsError::TelemetryMalformed);
    }

    let mut pairs = block.chunks(2).filter_map(base91::decode);
    let mut telemetry = Telemetry {
        seq: pairs.next(),
        ..Telemetry::default()
    };
    for (slot, value) in telemetry.vals.iter_mut().zip(pairs.by_ref()) {
        *slot = Some(value as i64);
    }
    if let Some(bits) = pairs.next() {
        let bits = (bits & 0xff) as u8;
        telemetry.bits = Some((0..TELEMETRY_BITS).map(|i| if bits >> i & 1 == 1 { '1' } else { '0' }).collect());
    }
    Ok(telemetry)
}

/// Find and cut the telemetry block out of a comment.
///
/// The rightmost `|` pair enclosing a well-formed block wins. A lone `|` or
/// a malformed block stays in the comment untouched.
pub(crate) fn extract_comment_telemetry(comment: &mut Vec<u8>) -> Option<Telemetry> {
    let openings: Vec<usize> = comment
        .iter()
        .enumerate()
        .filter_map(|(i, &b)| (b == DELIMITER).then_some(i))
        .collect();

    for &start in openings.iter().rev() {
        let Some(len) = comment[start + 1..].iter().position(|&b| b == DELIMITER) else {
            continue;
        };
        let end = start + 1 + len;
        match parse_comment_telemetry(&comment[start + 1..end]) {
            Ok(telemetry) => {
                comment.drain(start..=end);
                return Some(telemetry);
            }
            Err(_) => log::trace!("ignoring non-telemetry |...| block at {}", start),
        }
    }
    None
}

fn hex_channels(hex: &[u8]) -> Option<Vec<i64>> {
    hex.chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).ok()?;
            i64::from_str_radix(text, 16).ok()
        })
        .collect()
}

/// Mic-E hex telemetry at the start of a comment: `'` with channels 1 and 3
/// or `` ` `` with all five. Returns the telemetry and the bytes consumed.
pub fn parse_mice_telemetry(comment: &[u8]) -> Option<(Telemetry, usize)> {
    let (flag, rest) = comment.split_first()?;
    let hex_len = match *flag {
        b'\'' => 4,
        b'`' => 10,
        _ => return None,
    };
    let hex = rest.get(..hex_len)?;
    if !hex.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let channels = hex_channels(hex)?;

    let mut telemetry = Telemetry::default();
    if channels.len() == 2 {
        telemetry.vals[0] = Some(channels[0]);
        telemetry.vals[2] = Some(channels[1]);
    } else {
        for (slot, value) in telemetry.vals.iter_mut().zip(channels) {
            *slot = Some(value);
        }
    }
    Some((telemetry, 1 + hex_len))
}

/// Decode a `T#` telemetry report body (after the `T#`):
/// `SSS,A1,A2,A3,A4,A5,BBBBBBBB`
pub fn parse_telemetry_packet(data: &[u8]) -> Result<Telemetry> {
    let text = std::str::from_utf8(data).map_err(|_| AprsError::TelemetryMalformed)?;
    let mut fields = text.split(',');

    let seq = fields.next().map(str::trim).ok_or(AprsError::TelemetryMalformed)?;
    let seq = if seq == "MIC" {
        None
    } else {
        Some(seq.parse::<u32>().map_err(|_| AprsError::TelemetryMalformed)?)
    };

    let mut telemetry = Telemetry {
        seq,
        ..Telemetry::default()
    };
    let mut seen = 0;
    for slot in telemetry.vals.iter_mut() {
        let Some(field) = fields.next() else { break };
        let field = field.trim();
        if !field.is_empty() {
            *slot = Some(field.parse::<i64>().map_err(|_| AprsError::TelemetryMalformed)?);
        }
        seen += 1;
    }
    if seen == 0 {
        return Err(AprsError::TelemetryMalformed);
    }

    if let Some(bits) = fields.next() {
        let bits: String = bits.chars().take(TELEMETRY_BITS).collect();
        if !bits.chars().all(|c| c == '0' || c == '1') {
            return Err(AprsError::TelemetryMalformed);
        }
        if !bits.is_empty() {
            telemetry.bits = Some(format!("{:0<width$}", bits, width = TELEMETRY_BITS));
        }
    }

    Ok(telemetry)
}
