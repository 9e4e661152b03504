//! KISS framing and AX.25 UI frame conversion to and from TNC2 text

use crate::callsign::{Callsign, MAX_CALLSIGN_LEN};
use crate::error::{AprsError, Result};
use crate::{
    AX25_ADDR_LEN, AX25_CONTROL_UI, AX25_PID_NO_LAYER3, KISS_DATA_FRAME, KISS_FEND, KISS_FESC, KISS_MIN_FRAME_LEN,
    KISS_TFEND, KISS_TFESC, MAX_DIGIPEATERS,
};

const SSID_LAST: u8 = 0x01; // end of address field
const SSID_RESERVED: u8 = 0x60;
const SSID_COMMAND: u8 = 0x80; // C bit on destination, H bit on digipeaters

/// Escape FEND and FESC inside a frame
pub fn stuff(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 2);
    for &b in data {
        match b {
            KISS_FEND => out.extend_from_slice(&[KISS_FESC, KISS_TFEND]),
            KISS_FESC => out.extend_from_slice(&[KISS_FESC, KISS_TFESC]),
            _ => out.push(b),
        }
    }
    out
}

/// Strip the FEND delimiters of the first frame and undo escaping
pub fn unstuff(frame: &[u8]) -> Result<Vec<u8>> {
    let content = frame
        .split(|&b| b == KISS_FEND)
        .find(|segment| !segment.is_empty())
        .unwrap_or_default();

    let mut out = Vec::with_capacity(content.len());
    let mut bytes = content.iter();
    while let Some(&b) = bytes.next() {
        if b != KISS_FESC {
            out.push(b);
            continue;
        }
        match bytes.next() {
            Some(&KISS_TFEND) => out.push(KISS_FEND),
            Some(&KISS_TFESC) => out.push(KISS_FESC),
            _ => return Err(AprsError::KissInvalidEscape),
        }
    }
    Ok(out)
}

/// One decoded 7-byte address field
struct Address {
    callsign: Callsign,
    flag: bool,
}

fn decode_address(field: &[u8]) -> Result<Address> {
    let mut call = String::with_capacity(MAX_CALLSIGN_LEN);
    for &b in &field[..MAX_CALLSIGN_LEN] {
        let c = (b >> 1) as char;
        if c == ' ' {
            break;
        }
        if !(c.is_ascii_uppercase() || c.is_ascii_digit()) {
            return Err(AprsError::KissBadAddressing);
        }
        call.push(c);
    }
    if call.is_empty() {
        return Err(AprsError::KissBadAddressing);
    }
    let ssid_byte = field[MAX_CALLSIGN_LEN];
    Ok(Address {
        callsign: Callsign {
            call,
            ssid: (ssid_byte >> 1) & 0x0f,
        },
        flag: ssid_byte & SSID_COMMAND != 0,
    })
}

fn encode_address(callsign: &Callsign, flags: u8, out: &mut Vec<u8>) {
    let padded = format!("{:<width$}", callsign.call, width = MAX_CALLSIGN_LEN);
    out.extend(padded.bytes().map(|b| b << 1));
    out.push(flags | SSID_RESERVED | (callsign.ssid << 1));
}

/// Convert a KISS data frame carrying an AX.25 UI frame into TNC2 text
/// (`SRC>DST,DIGI*:body`). The body bytes are copied verbatim.
pub fn kiss_to_tnc2(frame: &[u8]) -> Result<Vec<u8>> {
    let data = unstuff(frame)?;
    if data.len() < KISS_MIN_FRAME_LEN {
        return Err(AprsError::KissTooShort);
    }
    if data[0] != KISS_DATA_FRAME {
        return Err(AprsError::KissNotDataFrame);
    }
    let ax25 = &data[1..];

    // The address field ends at the first byte with its low bit set
    let address_len = ax25
        .iter()
        .position(|&b| b & SSID_LAST != 0)
        .map(|i| i + 1)
        .ok_or(AprsError::KissBadAddressing)?;
    if address_len % AX25_ADDR_LEN != 0 || address_len < 2 * AX25_ADDR_LEN {
        return Err(AprsError::KissBadAddressing);
    }
    let digi_count = address_len / AX25_ADDR_LEN - 2;
    if digi_count > MAX_DIGIPEATERS {
        return Err(AprsError::KissTooManyDigis);
    }

    let (control, pid) = match ax25.get(address_len..address_len + 2) {
        Some(&[control, pid]) => (control, pid),
        _ => return Err(AprsError::KissTooShort),
    };
    if control != AX25_CONTROL_UI {
        return Err(AprsError::KissNotUi);
    }
    if pid != AX25_PID_NO_LAYER3 {
        return Err(AprsError::KissBadPid);
    }

    let mut addresses = ax25[..address_len]
        .chunks(AX25_ADDR_LEN)
        .map(decode_address)
        .collect::<Result<Vec<_>>>()?
        .into_iter();
    let (Some(destination), Some(source)) = (addresses.next(), addresses.next()) else {
        return Err(AprsError::KissBadAddressing);
    };

    let mut header = format!("{}>{}", source.callsign, destination.callsign);
    for digi in addresses {
        header.push(',');
        header.push_str(&digi.callsign.to_string());
        if digi.flag {
            header.push('*');
        }
    }
    log::trace!("KISS frame from {} with {} digipeaters", source.callsign, digi_count);

    let mut tnc2 = header.into_bytes();
    tnc2.push(b':');
    tnc2.extend_from_slice(&ax25[address_len + 2..]);
    Ok(tnc2)
}

/// Convert TNC2 text into a FEND-delimited KISS data frame.
///
/// Every address must be a valid AX.25 callsign with SSID 0-15, and at
/// most eight digipeaters are allowed. A `*` marks a digipeater as used.
pub fn tnc2_to_kiss(packet: &[u8]) -> Result<Vec<u8>> {
    let colon = packet
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| AprsError::InvalidHeader("no body separator".to_string()))?;
    let header = std::str::from_utf8(&packet[..colon])
        .map_err(|_| AprsError::InvalidHeader("non-ASCII header".to_string()))?;
    let body = &packet[colon + 1..];

    let (source, path) = header
        .split_once('>')
        .ok_or_else(|| AprsError::InvalidHeader("no source separator".to_string()))?;
    let mut path = path.split(',');
    let destination = Callsign::parse(path.next().unwrap_or_default())?;
    let source = Callsign::parse(source)?;
    let digipeaters = path
        .map(|token| match token.strip_suffix('*') {
            Some(call) => Callsign::parse(call).map(|c| (c, true)),
            None => Callsign::parse(token).map(|c| (c, false)),
        })
        .collect::<Result<Vec<_>>>()?;
    if digipeaters.len() > MAX_DIGIPEATERS {
        return Err(AprsError::KissTooManyDigis);
    }

    let mut frame = Vec::with_capacity(1 + AX25_ADDR_LEN * (2 + digipeaters.len()) + 2 + body.len());
    frame.push(KISS_DATA_FRAME);
    encode_address(&destination, SSID_COMMAND, &mut frame);
    encode_address(&source, 0, &mut frame);
    for (digi, used) in &digipeaters {
        encode_address(digi, if *used { SSID_COMMAND } else { 0 }, &mut frame);
    }
    // Mark the last address
    let last = frame.len() - 1;
    frame[last] |= SSID_LAST;
    frame.push(AX25_CONTROL_UI);
    frame.push(AX25_PID_NO_LAYER3);
    frame.extend_from_slice(body);

    let mut kiss = Vec::with_capacity(frame.len() + 4);
    kiss.push(KISS_FEND);
    kiss.extend(stuff(&frame));
    kiss.push(KISS_FEND);
    Ok(kiss)
}
