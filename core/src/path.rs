//! Digipeater path analysis

use crate::callsign::validate_callsign;
use crate::error::{AprsError, Result};
use crate::packet::DigipeaterHop;

/// Longest path element accepted from APRS-IS style (non-AX.25) paths
pub const MAX_PATH_TOKEN_LEN: usize = 9;

/// Generic `WIDEn-N` / `TRACEn-N` path alias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericPath {
    Wide { hops: u8, remaining: u8 },
    Trace { hops: u8, remaining: u8 },
}

impl GenericPath {
    pub fn parse(call: &str) -> Option<Self> {
        let (rest, is_wide) = if let Some(rest) = call.strip_prefix("WIDE") {
            (rest, true)
        } else if let Some(rest) = call.strip_prefix("TRACE") {
            (rest, false)
        } else {
            return None;
        };

        let bytes = rest.as_bytes();
        if bytes.len() != 3 || bytes[1] != b'-' {
            return None;
        }
        let hops = bytes[0];
        let remaining = bytes[2];
        if !(b'1'..=b'7').contains(&hops) || !(b'0'..=b'7').contains(&remaining) {
            return None;
        }
        let hops = hops - b'0';
        let remaining = remaining - b'0';

        Some(if is_wide {
            GenericPath::Wide { hops, remaining }
        } else {
            GenericPath::Trace { hops, remaining }
        })
    }
}

/// Parse one path element, stripping the `*` has-been-digipeated marker.
///
/// Valid AX.25 callsigns are normalized. Unless `strict` is set, other short
/// alphanumeric tokens (`qAC`, `T2FINLAND`) pass through verbatim.
pub fn parse_hop(token: &str, strict: bool) -> Result<DigipeaterHop> {
    let (call, wasdigied) = match token.strip_suffix('*') {
        Some(call) => (call, true),
        None => (token, false),
    };

    match validate_callsign(call) {
        Ok(call) => Ok(DigipeaterHop { call, wasdigied }),
        Err(err) => {
            if strict {
                return Err(AprsError::InvalidHeader(format!("digipeater {}: {}", token, err)));
            }
            let plain = !call.is_empty()
                && call.len() <= MAX_PATH_TOKEN_LEN
                && call.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-');
            if !plain {
                return Err(AprsError::InvalidHeader(format!("invalid digipeater {:?}", token)));
            }
            log::trace!("passing through non-AX.25 path element {}", call);
            Ok(DigipeaterHop {
                call: call.to_string(),
                wasdigied,
            })
        }
    }
}

/// Count the hops a packet has travelled.
///
/// Walks the path from its end. `WIDEn-N` contributes `n - N` (a reversed
/// pair contributes nothing), `TRACEn-N` contributes nothing since tracing
/// digipeaters insert their own callsigns, and any other element counts once
/// if it sits at or before the last element marked as digipeated.
pub fn count_digihops(path: &[DigipeaterHop]) -> u32 {
    let mut hops = 0u32;
    let mut digied = false;

    for hop in path.iter().rev() {
        if hop.wasdigied {
            digied = true;
        }
        match GenericPath::parse(&hop.call) {
            Some(GenericPath::Wide { hops: n, remaining }) => {
                if remaining > n {
                    log::warn!("reversed generic path element {}", hop.call);
                } else {
                    hops += (n - remaining) as u32;
                }
            }
            Some(GenericPath::Trace { .. }) => {}
            None => {
                if digied {
                    hops += 1;
                }
            }
        }
    }

    hops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(tokens: &[&str]) -> Vec<DigipeaterHop> {
        tokens.iter().map(|t| parse_hop(t, false).unwrap()).collect()
    }

    #[test]
    fn test_generic_path_parse() {
        assert_eq!(GenericPath::parse("WIDE2-1"), Some(GenericPath::Wide { hops: 2, remaining: 1 }));
        assert_eq!(GenericPath::parse("TRACE7-7"), Some(GenericPath::Trace { hops: 7, remaining: 7 }));
        assert_eq!(GenericPath::parse("WIDE"), None);
        assert_eq!(GenericPath::parse("WIDE8-1"), None);
        assert_eq!(GenericPath::parse("WIDE2-8"), None);
        assert_eq!(GenericPath::parse("RELAY"), None);
    }

    #[test]
    fn test_hop_digied_marker() {
        let hop = parse_hop("OH2RDG*", false).unwrap();
        assert_eq!(hop.call, "OH2RDG");
        assert!(hop.wasdigied);

        let hop = parse_hop("WIDE", false).unwrap();
        assert!(!hop.wasdigied);
    }

    #[test]
    fn test_non_ax25_passthrough() {
        let hop = parse_hop("qAC", false).unwrap();
        assert_eq!(hop.call, "qAC");
        assert!(parse_hop("qAC", true).is_err());
        assert!(parse_hop("T2FINLAND", false).is_ok());
        assert!(parse_hop("TOOLONGTOKEN", false).is_err());
        assert!(parse_hop("BAD_CHAR", false).is_err());
    }

    #[test]
    fn test_count_wide_hops() {
        assert_eq!(count_digihops(&path(&["WIDE2-1"])), 1);
        assert_eq!(count_digihops(&path(&["WIDE1-1", "WIDE2-2"])), 0);
        assert_eq!(count_digihops(&path(&["WIDE3-0"])), 3);
    }

    #[test]
    fn test_count_digied_callsigns() {
        assert_eq!(count_digihops(&path(&["OH2RDG*", "WIDE"])), 1);
        assert_eq!(count_digihops(&path(&["OH2A", "OH2B*", "WIDE2-1"])), 3);
        assert_eq!(count_digihops(&path(&["OH2A", "OH2B"])), 0);
    }

    #[test]
    fn test_reversed_wide_counts_zero() {
        assert_eq!(count_digihops(&path(&["WIDE1-3"])), 0);
        assert_eq!(count_digihops(&path(&["WIDE1-3", "WIDE2-1"])), 1);
    }

    #[test]
    fn test_trace_counts_zero() {
        assert_eq!(count_digihops(&path(&["OH2A*", "TRACE3-2"])), 1);
        assert_eq!(count_digihops(&path(&["TRACE3-1*"])), 0);
    }
}
