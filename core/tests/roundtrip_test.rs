use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use aprskit_core::{
    encode_position, kiss_to_tnc2, parse, tnc2_to_kiss, ParseOptions, PositionReport, AMBIGUITY_RESOLUTION,
    COMPRESSED_RESOLUTION,
};

const SEED: u64 = 0x0a9c5;
const ITERATIONS: usize = 500;
/// One hundredth of an arc minute, in degrees
const HUNDREDTH_MINUTE: f64 = 0.01 / 60.0;

fn decode_body(body: &str) -> aprskit_core::ParsedPacket {
    parse(format!("N0CALL>APRS:!{}", body), ParseOptions::default())
}

#[test]
fn test_uncompressed_positions_survive_encoding() {
    let mut rng = StdRng::seed_from_u64(SEED);
    for _ in 0..ITERATIONS {
        let latitude = rng.gen_range(-89.99..89.99);
        let longitude = rng.gen_range(-179.99..179.99);
        let body = encode_position(&PositionReport::new(latitude, longitude)).expect("encodes");
        let packet = decode_body(&body);

        assert!(packet.is_ok(), "{} failed: {:?}", body, packet.result);
        let lat = packet.latitude.expect("latitude");
        let lon = packet.longitude.expect("longitude");
        assert!((lat - latitude).abs() <= HUNDREDTH_MINUTE, "{} -> {} via {}", latitude, lat, body);
        assert!((lon - longitude).abs() <= HUNDREDTH_MINUTE, "{} -> {} via {}", longitude, lon, body);
    }
}

#[test]
fn test_compressed_positions_survive_encoding() {
    let mut rng = StdRng::seed_from_u64(SEED + 1);
    for _ in 0..ITERATIONS {
        let latitude = rng.gen_range(-89.99..89.99);
        let longitude = rng.gen_range(-179.99..179.99);
        let report = PositionReport {
            compressed: true,
            ..PositionReport::new(latitude, longitude)
        };
        let body = encode_position(&report).expect("encodes");
        let packet = decode_body(&body);

        assert!(packet.is_ok(), "{} failed: {:?}", body, packet.result);
        assert_eq!(packet.pos_resolution, Some(COMPRESSED_RESOLUTION));
        assert!((packet.latitude.expect("latitude") - latitude).abs() < 1e-5);
        assert!((packet.longitude.expect("longitude") - longitude).abs() < 1e-5);
    }
}

#[test]
fn test_ambiguity_resolution() {
    let mut rng = StdRng::seed_from_u64(SEED + 3);
    for _ in 0..ITERATIONS {
        let ambiguity = rng.gen_range(0..AMBIGUITY_RESOLUTION.len()) as u8;
        let report = PositionReport {
            ambiguity,
            ..PositionReport::new(rng.gen_range(-89.9..89.9), rng.gen_range(-179.9..179.9))
        };
        let body = encode_position(&report).expect("encodes");
        let packet = decode_body(&body);

        assert!(packet.is_ok(), "{} failed: {:?}", body, packet.result);
        assert_eq!(packet.pos_ambiguity, Some(ambiguity));
        assert_eq!(packet.pos_resolution, Some(AMBIGUITY_RESOLUTION[ambiguity as usize]));
    }
}

#[test]
fn test_ambiguity_near_the_limits() {
    for ambiguity in 1..=4u8 {
        for (latitude, longitude) in [(90.0, 0.0), (-90.0, 180.0), (0.0, -180.0)] {
            let report = PositionReport {
                ambiguity,
                ..PositionReport::new(latitude, longitude)
            };
            assert!(encode_position(&report).is_err(), "{} {} at {}", latitude, longitude, ambiguity);
        }

        let report = PositionReport {
            ambiguity,
            ..PositionReport::new(89.95, -179.95)
        };
        let packet = decode_body(&encode_position(&report).expect("encodes"));
        assert!(packet.is_ok(), "ambiguity {} failed: {:?}", ambiguity, packet.result);
        assert_eq!(packet.pos_resolution, Some(AMBIGUITY_RESOLUTION[ambiguity as usize]));
    }
}

#[test]
fn test_kiss_conversion_is_stable() {
    let mut rng = StdRng::seed_from_u64(SEED + 2);
    let digis = ["WIDE1-1", "WIDE2-2*", "OH2RDG*", "RELAY"];
    for _ in 0..ITERATIONS {
        let mut tnc2 = format!("N{}CALL-{}>APRS", rng.gen_range(0..10), rng.gen_range(1..16));
        for digi in digis.iter().take(rng.gen_range(0..=digis.len())) {
            tnc2.push(',');
            tnc2.push_str(digi);
        }
        tnc2.push(':');
        let mut packet = tnc2.into_bytes();
        let body_len = rng.gen_range(1..64);
        packet.extend((0..body_len).map(|_| rng.gen::<u8>()));

        let frame = tnc2_to_kiss(&packet).expect("encodes");
        let decoded = kiss_to_tnc2(&frame).expect("decodes");
        assert_eq!(decoded, packet);
        assert_eq!(tnc2_to_kiss(&decoded).expect("re-encodes"), frame);
    }
}
