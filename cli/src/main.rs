use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use aprskit_core::timestamp::parse_timestamp;
use aprskit_core::{
    kiss_to_tnc2, make_item, make_object, make_position, tnc2_to_kiss, AprsError, ParseOptions, ParsedPacket,
    Parser as PacketParser, PositionReport, KISS_FEND,
};

#[derive(Parser)]
#[command(name = "aprskit")]
#[command(about = "Decode and encode APRS packets and KISS frames")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode TNC2 text packets, one per line
    Decode {
        /// Input file (stdin when omitted or `-`)
        #[arg(value_name = "INPUT.TXT")]
        input: Option<PathBuf>,

        /// Repair Mic-E packets mangled by old TNC firmware
        #[arg(long)]
        accept_broken_mice: bool,

        /// Apply AX.25 rules to the header, as for packets heard off air
        #[arg(long)]
        raw_ax25: bool,

        /// Print each decoded packet as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Convert KISS frames to TNC2 text
    KissDecode {
        /// Input file of raw frames (stdin when omitted or `-`)
        #[arg(value_name = "INPUT.KISS")]
        input: Option<PathBuf>,

        /// Input holds one base64 encoded frame per line
        #[arg(long)]
        base64: bool,

        /// Decode the converted packets and print them as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Convert TNC2 text packets to KISS frames
    KissEncode {
        /// Input file, one packet per line (stdin when omitted or `-`)
        #[arg(value_name = "INPUT.TXT")]
        input: Option<PathBuf>,

        /// Output file for raw frames (stdout when omitted)
        #[arg(short, long, value_name = "OUTPUT.KISS")]
        output: Option<PathBuf>,

        /// Print one base64 encoded frame per line instead of raw bytes
        #[arg(long)]
        base64: bool,
    },

    /// Build a position, object or item body
    Position {
        /// Latitude in degrees, north positive
        #[arg(allow_hyphen_values = true)]
        latitude: f64,

        /// Longitude in degrees, east positive
        #[arg(allow_hyphen_values = true)]
        longitude: f64,

        /// Symbol table and code, e.g. `/>`
        #[arg(short, long, default_value = "//")]
        symbol: String,

        /// Course in degrees (needs --speed)
        #[arg(long)]
        course: Option<u16>,

        /// Speed in km/h (needs --course)
        #[arg(long)]
        speed: Option<f64>,

        /// Altitude in meters
        #[arg(long, allow_hyphen_values = true)]
        altitude: Option<f64>,

        /// Blank 0-4 trailing minute digits
        #[arg(long, default_value = "0")]
        ambiguity: u8,

        /// Use the base-91 compressed format
        #[arg(long)]
        compressed: bool,

        /// Add a !DAO! extension
        #[arg(long)]
        dao: bool,

        /// Station is messaging capable
        #[arg(long)]
        messaging: bool,

        /// Timestamp, `DDHHMMz`, `DDHHMM/` or `HHMMSSh`
        #[arg(long)]
        timestamp: Option<String>,

        /// Comment text
        #[arg(long)]
        comment: Option<String>,

        /// Emit an object with this name (needs --timestamp)
        #[arg(long, conflicts_with = "item")]
        object: Option<String>,

        /// Emit an item with this name
        #[arg(long)]
        item: Option<String>,

        /// Mark the object or item as killed
        #[arg(long)]
        killed: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid symbol {0:?}, expected a table and a code such as \"/>\"")]
    InvalidSymbol(String),

    #[error("objects need --timestamp")]
    MissingTimestamp,

    #[error("line {line}: {source}")]
    Line { line: usize, source: AprsError },

    #[error("line {line}: invalid base64: {source}")]
    Base64 { line: usize, source: base64::DecodeError },
}

#[derive(Serialize)]
struct KissRecord<'a> {
    tnc2: &'a str,
    packet: ParsedPacket,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Decode { input, accept_broken_mice, raw_ax25, json } => {
            let options = ParseOptions::new().accept_broken_mice(accept_broken_mice).raw_ax25(raw_ax25);
            decode_command(input.as_deref(), options, json)?
        }
        Commands::KissDecode { input, base64, json } => kiss_decode_command(input.as_deref(), base64, json)?,
        Commands::KissEncode { input, output, base64 } => {
            kiss_encode_command(input.as_deref(), output.as_deref(), base64)?
        }
        Commands::Position {
            latitude,
            longitude,
            symbol,
            course,
            speed,
            altitude,
            ambiguity,
            compressed,
            dao,
            messaging,
            timestamp,
            comment,
            object,
            item,
            killed,
        } => {
            let mut symbol_chars = symbol.chars();
            let (Some(symbol_table), Some(symbol_code), None) =
                (symbol_chars.next(), symbol_chars.next(), symbol_chars.next())
            else {
                return Err(CliError::InvalidSymbol(symbol).into());
            };
            let report = PositionReport {
                latitude,
                longitude,
                speed,
                course,
                altitude,
                symbol_table,
                symbol_code,
                ambiguity,
                compressed,
                dao,
                comment,
            };
            let timestamp = timestamp.map(|t| parse_timestamp(t.as_bytes())).transpose()?;

            let body = match (object, item) {
                (Some(name), _) => {
                    let timestamp = timestamp.ok_or(CliError::MissingTimestamp)?;
                    make_object(&name, !killed, &timestamp, &report)?
                }
                (None, Some(name)) => make_item(&name, !killed, &report)?,
                (None, None) => make_position(&report, timestamp.as_ref(), messaging)?,
            };
            println!("{}", body);
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
}

fn read_input(input: Option<&Path>) -> io::Result<Vec<u8>> {
    match input {
        Some(path) if path != Path::new("-") => {
            let data = std::fs::read(path)?;
            log::info!("Read {} bytes from {}", data.len(), path.display());
            Ok(data)
        }
        _ => {
            let mut data = Vec::new();
            io::stdin().lock().read_to_end(&mut data)?;
            Ok(data)
        }
    }
}

/// Non-empty input lines with their 1-based line numbers, CR/LF stripped
fn lines(data: &[u8]) -> impl Iterator<Item = (usize, &[u8])> {
    data.split(|&b| b == b'\n')
        .enumerate()
        .map(|(i, line)| (i + 1, line.strip_suffix(b"\r").unwrap_or(line)))
        .filter(|(_, line)| !line.is_empty())
}

fn describe(packet: &ParsedPacket) -> String {
    let mut out = format!(
        "{} -> {} [{}]",
        packet.src_callsign.as_deref().unwrap_or("?"),
        packet.dst_callsign.as_deref().unwrap_or("?"),
        serde_json::to_value(packet.packet_type)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    );
    if let (Some(lat), Some(lon)) = (packet.latitude, packet.longitude) {
        out.push_str(&format!(" {:.5} {:.5}", lat, lon));
    }
    if let (Some(table), Some(code)) = (packet.symbol_table, packet.symbol_code) {
        out.push_str(&format!(" {}{}", table, code));
    }
    if let Some(name) = packet.object_name.as_deref().or(packet.item_name.as_deref()) {
        out.push_str(&format!(" name={:?}", name.trim_end()));
    }
    if let Some(message) = &packet.message {
        out.push_str(&format!(" to={}", message.destination));
        if let Some(text) = &message.text {
            out.push_str(&format!(" text={:?}", text));
        }
    }
    if let Some(comment) = packet.comment.as_deref().or(packet.status.as_deref()) {
        out.push_str(&format!(" {:?}", comment));
    }
    if let (Some(code), Some(msg)) = (packet.resultcode(), packet.resultmsg()) {
        out.push_str(&format!(" error={} ({})", code, msg));
    }
    for warning in &packet.warnings {
        out.push_str(&format!(" warning={}", warning.code()));
    }
    out
}

fn print_packet(packet: &ParsedPacket, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(packet)?);
    } else {
        println!("{}", describe(packet));
    }
    Ok(())
}

fn decode_command(input: Option<&Path>, options: ParseOptions, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_input(input)?;
    let parser = PacketParser::new(options);

    let mut failed = 0;
    let mut total = 0;
    for (_, line) in lines(&data) {
        let packet = parser.parse(line);
        total += 1;
        if !packet.is_ok() {
            failed += 1;
        }
        print_packet(&packet, json)?;
    }
    log::info!("Decoded {} packets, {} with errors", total, failed);
    Ok(())
}

/// Split a raw byte stream into FEND delimited frames
fn raw_frames(data: &[u8]) -> Vec<Vec<u8>> {
    data.split(|&b| b == KISS_FEND)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut frame = Vec::with_capacity(segment.len() + 2);
            frame.push(KISS_FEND);
            frame.extend_from_slice(segment);
            frame.push(KISS_FEND);
            frame
        })
        .collect()
}

fn kiss_decode_command(input: Option<&Path>, base64: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_input(input)?;
    let frames: Vec<(usize, Vec<u8>)> = if base64 {
        lines(&data)
            .map(|(line, text)| {
                BASE64
                    .decode(text)
                    .map(|frame| (line, frame))
                    .map_err(|source| CliError::Base64 { line, source })
            })
            .collect::<Result<_, _>>()?
    } else {
        raw_frames(&data).into_iter().enumerate().map(|(i, f)| (i + 1, f)).collect()
    };

    let parser = PacketParser::new(ParseOptions::new().raw_ax25(true));
    for (line, frame) in frames {
        let tnc2 = match kiss_to_tnc2(&frame) {
            Ok(tnc2) => tnc2,
            Err(err) => {
                log::warn!("frame {}: {} ({})", line, err, err.code());
                continue;
            }
        };
        let text = String::from_utf8_lossy(&tnc2);
        if json {
            let record = KissRecord {
                tnc2: &text,
                packet: parser.parse(&tnc2),
            };
            println!("{}", serde_json::to_string(&record)?);
        } else {
            println!("{}", text);
        }
    }
    Ok(())
}

fn kiss_encode_command(
    input: Option<&Path>,
    output: Option<&Path>,
    base64: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_input(input)?;

    let mut frames = Vec::new();
    for (line, packet) in lines(&data) {
        let frame = tnc2_to_kiss(packet).map_err(|source| CliError::Line { line, source })?;
        frames.push(frame);
    }
    log::info!("Encoded {} frames", frames.len());

    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    for frame in &frames {
        if base64 {
            writeln!(out, "{}", BASE64.encode(frame))?;
        } else {
            out.write_all(frame)?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_skip_blanks_and_carriage_returns() {
        let data = b"first\r\n\nsecond\n";
        let collected: Vec<(usize, &[u8])> = lines(data).collect();
        assert_eq!(collected, vec![(1, &b"first"[..]), (3, &b"second"[..])]);
    }

    #[test]
    fn test_raw_frames_split_on_fend() {
        let data = [KISS_FEND, 0x00, 0x01, KISS_FEND, KISS_FEND, 0x00, 0x02, KISS_FEND];
        let frames = raw_frames(&data);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], vec![KISS_FEND, 0x00, 0x02, KISS_FEND]);
    }

    #[test]
    fn test_describe_failed_packet() {
        let packet = PacketParser::new(ParseOptions::default()).parse(b"garbage");
        assert!(describe(&packet).contains("error=invalid_header"));
    }
}
