use std::fmt;

use crate::error::{AprsError, Result};

pub const MAX_CALLSIGN_LEN: usize = 6;
pub const MAX_SSID: u8 = 15;

/// AX.25 station address: up to six uppercase alphanumerics plus an SSID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callsign {
    pub call: String,
    pub ssid: u8,
}

impl Callsign {
    /// Parse `CALL` or `CALL-SSID`, rejecting anything AX.25 cannot carry
    pub fn parse(token: &str) -> Result<Self> {
        let (call, ssid) = match token.split_once('-') {
            Some((call, ssid)) => (call, Some(ssid)),
            None => (token, None),
        };

        if call.is_empty()
            || call.len() > MAX_CALLSIGN_LEN
            || !call.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(AprsError::InvalidCallsign(token.to_string()));
        }

        let ssid = match ssid {
            None => 0,
            Some(digits) => {
                if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(AprsError::InvalidCallsign(token.to_string()));
                }
                let value: u8 = digits
                    .parse()
                    .map_err(|_| AprsError::InvalidCallsign(token.to_string()))?;
                if value > MAX_SSID {
                    return Err(AprsError::SsidOutOfRange(token.to_string()));
                }
                value
            }
        };

        Ok(Self {
            call: call.to_string(),
            ssid,
        })
    }
}

impl fmt::Display for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ssid == 0 {
            write!(f, "{}", self.call)
        } else {
            write!(f, "{}-{}", self.call, self.ssid)
        }
    }
}

/// Validate a callsign token and return its normalized text form.
///
/// An explicit SSID is kept (also `-0`), with leading zeros dropped, so
/// `N0CALL-05` becomes `N0CALL-5`.
pub fn validate_callsign(token: &str) -> Result<String> {
    let parsed = Callsign::parse(token)?;
    if token.contains('-') {
        Ok(format!("{}-{}", parsed.call, parsed.ssid))
    } else {
        Ok(parsed.call)
    }
}
