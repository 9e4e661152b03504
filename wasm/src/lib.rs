use wasm_bindgen::prelude::*;
use aprskit_core::{
    kiss_to_tnc2, make_position, tnc2_to_kiss, AprsError, ParseOptions, Parser, PositionReport,
};

fn to_js(err: AprsError) -> JsValue {
    JsValue::from_str(&format!("{}: {}", err.code(), err))
}

#[wasm_bindgen]
pub struct WasmParser {
    inner: Parser,
}

#[wasm_bindgen]
impl WasmParser {
    #[wasm_bindgen(constructor)]
    pub fn new(accept_broken_mice: bool, raw_ax25: bool) -> WasmParser {
        let options = ParseOptions::new()
            .accept_broken_mice(accept_broken_mice)
            .raw_ax25(raw_ax25);
        WasmParser { inner: Parser::new(options) }
    }

    /// Decode a TNC2 packet and return the result as a JSON string.
    /// Decode failures are reported in the `result` field, not thrown.
    #[wasm_bindgen]
    pub fn parse(&self, packet: &[u8]) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.parse(packet)).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Decode a KISS frame (Uint8Array) and return the result as JSON
    #[wasm_bindgen(js_name = parseKiss)]
    pub fn parse_kiss(&self, frame: &[u8]) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.parse_kiss(frame)).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

/// Convert a KISS frame into TNC2 text bytes
#[wasm_bindgen(js_name = kissToTnc2)]
pub fn kiss_to_tnc2_js(frame: &[u8]) -> Result<Vec<u8>, JsValue> {
    kiss_to_tnc2(frame).map_err(to_js)
}

/// Convert TNC2 text bytes into a FEND delimited KISS frame
#[wasm_bindgen(js_name = tnc2ToKiss)]
pub fn tnc2_to_kiss_js(packet: &[u8]) -> Result<Vec<u8>, JsValue> {
    tnc2_to_kiss(packet).map_err(to_js)
}

/// Build an uncompressed or compressed position body without timestamp
#[wasm_bindgen(js_name = makePosition)]
pub fn make_position_js(
    latitude: f64,
    longitude: f64,
    symbol_table: char,
    symbol_code: char,
    compressed: bool,
    messaging: bool,
) -> Result<String, JsValue> {
    let report = PositionReport {
        symbol_table,
        symbol_code,
        compressed,
        ..PositionReport::new(latitude, longitude)
    };
    make_position(&report, None, messaging).map_err(to_js)
}

#[wasm_bindgen(start)]
pub fn init() {
    // Optional panic hook setup
}
