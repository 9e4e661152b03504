use crate::callsign::validate_callsign;
use crate::error::{AprsError, Result};
use crate::packet::DigipeaterHop;
use crate::path::{parse_hop, MAX_PATH_TOKEN_LEN};
use crate::MAX_DIGIPEATERS;

/// Address part of a TNC2 packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub source: String,
    pub destination: String,
    pub digipeaters: Vec<DigipeaterHop>,
    /// Raw `SRC>DST,PATH` text
    pub raw: String,
}

/// Split a TNC2 packet into its header and body.
///
/// `strict` applies the rules of a frame heard directly over AX.25: every
/// callsign must be valid AX.25 and at most eight digipeaters are allowed.
pub fn parse_header(packet: &[u8], strict: bool) -> Result<(Header, &[u8])> {
    let colon = packet
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| AprsError::InvalidHeader("no body separator".to_string()))?;
    let (header_bytes, body) = (&packet[..colon], &packet[colon + 1..]);

    let raw = std::str::from_utf8(header_bytes)
        .ok()
        .filter(|h| h.is_ascii())
        .ok_or_else(|| AprsError::InvalidHeader("non-ASCII header".to_string()))?;

    let (source, rest) = raw
        .split_once('>')
        .ok_or_else(|| AprsError::InvalidHeader("no source separator".to_string()))?;
    if rest.is_empty() {
        return Err(AprsError::InvalidHeader("empty destination path".to_string()));
    }

    let source = if strict {
        validate_callsign(source).map_err(|e| AprsError::InvalidHeader(format!("source: {}", e)))?
    } else {
        let plain = !source.is_empty()
            && source.len() <= MAX_PATH_TOKEN_LEN
            && source.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-');
        if !plain {
            return Err(AprsError::InvalidHeader(format!("invalid source {:?}", source)));
        }
        source.to_string()
    };

    let mut components = rest.split(',');
    let destination = components.next().unwrap_or_default();
    let destination = validate_callsign(destination)
        .map_err(|e| AprsError::InvalidHeader(format!("destination: {}", e)))?;

    let digipeaters = components
        .map(|token| parse_hop(token, strict))
        .collect::<Result<Vec<_>>>()?;
    if strict && digipeaters.len() > MAX_DIGIPEATERS {
        return Err(AprsError::InvalidHeader(format!(
            "{} digipeaters, at most {} allowed",
            digipeaters.len(),
            MAX_DIGIPEATERS
        )));
    }

    Ok((
        Header {
            source,
            destination,
            digipeaters,
            raw: raw.to_string(),
        },
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_header() {
        let packet = b"OH2RDP-1>BEACON-15,OH2RDG*,WIDE:!6028.51N/02505.68E#";
        let (header, body) = parse_header(packet, false).unwrap();
        assert_eq!(header.source, "OH2RDP-1");
        assert_eq!(header.destination, "BEACON-15");
        assert_eq!(header.raw, "OH2RDP-1>BEACON-15,OH2RDG*,WIDE");
        assert_eq!(header.digipeaters.len(), 2);
        assert_eq!(header.digipeaters[0].call, "OH2RDG");
        assert!(header.digipeaters[0].wasdigied);
        assert_eq!(header.digipeaters[1].call, "WIDE");
        assert!(!header.digipeaters[1].wasdigied);
        assert_eq!(body, b"!6028.51N/02505.68E#");
    }

    #[test]
    fn test_body_split_on_first_colon() {
        let (_, body) = parse_header(b"N0CALL>APRS::OH7LZB   :hi", false).unwrap();
        assert_eq!(body, b":OH7LZB   :hi");
    }

    #[test]
    fn test_missing_separators() {
        assert!(matches!(parse_header(b"N0CALL>APRS", false), Err(AprsError::InvalidHeader(_))));
        assert!(matches!(parse_header(b"N0CALL:body", false), Err(AprsError::InvalidHeader(_))));
        assert!(matches!(parse_header(b"N0CALL>:body", false), Err(AprsError::InvalidHeader(_))));
    }

    #[test]
    fn test_invalid_destination() {
        assert!(parse_header(b"N0CALL>aprs:>x", false).is_err());
        assert!(parse_header(b"N0CALL>APRS-16:>x", false).is_err());
    }

    #[test]
    fn test_aprs_is_source_allowed_unless_strict() {
        assert!(parse_header(b"n0call-10>APRS:>x", false).is_ok());
        assert!(parse_header(b"n0call-10>APRS:>x", true).is_err());
    }

    #[test]
    fn test_strict_digipeater_limit() {
        let packet = b"N0CALL>APRS,A,B,C,D,E,F,G,H,I:>x";
        assert!(parse_header(packet, false).is_ok());
        assert!(parse_header(packet, true).is_err());
    }
}
