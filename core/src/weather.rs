//! Weather reports, attached to `_` symbol positions or positionless `_`

use serde::Serialize;

use crate::error::{AprsError, Result};
use crate::timestamp::{parse_weather_timestamp, Timestamp};
use crate::{HUNDREDTH_INCH_TO_MM, MPH_TO_MS};

/// Decoded weather observation in metric units
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Weather {
    /// Degrees
    pub wind_direction: Option<u16>,
    /// m/s
    pub wind_speed: Option<f64>,
    /// m/s, peak in the last 5 minutes
    pub wind_gust: Option<f64>,
    /// Celsius
    pub temperature: Option<f64>,
    /// mm
    pub rain_1h: Option<f64>,
    pub rain_24h: Option<f64>,
    pub rain_midnight: Option<f64>,
    /// Percent
    pub humidity: Option<u8>,
    /// hPa
    pub pressure: Option<f64>,
    /// W/m²
    pub luminosity: Option<u32>,
    /// mm
    pub snow_24h: Option<f64>,
    /// Raw rain counter
    pub rain_raw: Option<u32>,
    /// Station software or hardware id trailing the fields
    pub soft: Option<String>,
}

/// `DDD/SSS` wind, the usual lead-in of a positioned report
const WIND_LEN: usize = 7;

fn is_field_byte(b: u8) -> bool {
    b.is_ascii_digit() || b == b' ' || b == b'.' || b == b'-'
}

/// Numeric value of a fixed-width field. Blanks and dots mean no data.
fn field_value(raw: &[u8]) -> Option<Option<f64>> {
    if !raw.iter().all(|&b| is_field_byte(b)) {
        return None;
    }
    if raw.iter().all(|&b| b == b' ' || b == b'.') {
        return Some(None);
    }
    let text = std::str::from_utf8(raw).ok()?.trim();
    text.parse::<f64>().ok().map(Some)
}

fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) / 1.8
}

fn tag_width(tag: u8) -> Option<usize> {
    match tag {
        b'g' | b't' | b'r' | b'p' | b'P' | b'L' | b'l' | b's' | b'#' | b'c' | b'S' => Some(3),
        b'h' => Some(2),
        b'b' => Some(5),
        _ => None,
    }
}

impl Weather {
    fn has_data(&self) -> bool {
        self.wind_direction.is_some()
            || self.wind_speed.is_some()
            || self.wind_gust.is_some()
            || self.temperature.is_some()
            || self.rain_1h.is_some()
            || self.rain_24h.is_some()
            || self.rain_midnight.is_some()
            || self.humidity.is_some()
            || self.pressure.is_some()
            || self.luminosity.is_some()
            || self.snow_24h.is_some()
            || self.rain_raw.is_some()
    }

    fn apply(&mut self, tag: u8, value: f64) {
        match tag {
            b'c' => self.wind_direction = Some(value as u16),
            b'S' => self.wind_speed = Some(value * MPH_TO_MS),
            b'g' => self.wind_gust = Some(value * MPH_TO_MS),
            b't' => self.temperature = Some(fahrenheit_to_celsius(value)),
            b'r' => self.rain_1h = Some(value * HUNDREDTH_INCH_TO_MM),
            b'p' => self.rain_24h = Some(value * HUNDREDTH_INCH_TO_MM),
            b'P' => self.rain_midnight = Some(value * HUNDREDTH_INCH_TO_MM),
            b'h' => {
                let h = value as u8;
                self.humidity = match h {
                    0 => Some(100),
                    1..=100 => Some(h),
                    _ => None,
                };
            }
            b'b' => self.pressure = Some(value / 10.0),
            b'L' => self.luminosity = Some(value as u32),
            b'l' => self.luminosity = Some(value as u32 + 1000),
            b's' => self.snow_24h = Some(value * 25.4),
            b'#' => self.rain_raw = Some(value as u32),
            _ => {}
        }
    }
}

/// Parse the weather fields following a `_` symbol position
pub fn parse_weather(data: &[u8]) -> Result<Weather> {
    let mut weather = Weather::default();
    let mut pos = 0;

    // Positioned reports lead with DDD/SSS; positionless ones use cDDDsSSS
    if data.len() >= WIND_LEN
        && data[3] == b'/'
        && data[..3].iter().all(|&b| is_field_byte(b))
        && data[4..7].iter().all(|&b| is_field_byte(b))
    {
        let direction = field_value(&data[..3]).ok_or(AprsError::WeatherInvalid)?;
        let speed = field_value(&data[4..7]).ok_or(AprsError::WeatherInvalid)?;
        if let Some(direction) = direction {
            weather.apply(b'c', direction);
        }
        if let Some(speed) = speed {
            weather.apply(b'S', speed);
        }
        pos = WIND_LEN;
    }

    while pos < data.len() {
        let tag = data[pos];
        let tag = if tag == b's' && pos == 4 && data.first() == Some(&b'c') {
            // cDDDsSSS: the `s` here is wind speed, not snow
            b'S'
        } else {
            tag
        };
        let Some(width) = tag_width(tag) else { break };
        let Some(raw) = data.get(pos + 1..pos + 1 + width) else { break };
        let Some(value) = field_value(raw) else { break };
        // only temperature may go negative
        if raw.contains(&b'-') && tag != b't' {
            break;
        }
        if let Some(value) = value {
            weather.apply(tag, value);
        }
        pos += 1 + width;
    }

    if !weather.has_data() {
        return Err(AprsError::WeatherInvalid);
    }

    let soft: String = data[pos..]
        .iter()
        .filter(|b| (0x20..=0x7e).contains(*b))
        .map(|&b| b as char)
        .collect();
    let soft = soft.trim();
    if !soft.is_empty() {
        weather.soft = Some(soft.to_string());
    }

    Ok(weather)
}

/// Parse a positionless report body after its `_`: `MMDDHHMM` then fields.
/// An out-of-range timestamp is returned as `Err` beside the weather.
pub fn parse_positionless(data: &[u8]) -> Result<(std::result::Result<Timestamp, AprsError>, Weather)> {
    if data.len() < 8 || !data[..8].iter().all(u8::is_ascii_digit) {
        return Err(AprsError::WeatherInvalid);
    }
    let timestamp = parse_weather_timestamp(&data[..8]);
    let weather = parse_weather(&data[8..])?;
    Ok((timestamp, weather))
}
