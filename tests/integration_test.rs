//! Integration tests for ppm-compress

use std::io::{Seek, SeekFrom};

use ppm_compress::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn compressor(order: i32) -> Compressor {
    Compressor::new(CodecConfig::with_order(order).unwrap()).unwrap()
}

#[test]
fn test_full_lifecycle() {
    let compressor = Compressor::default();
    let data = b"the quick brown fox jumps over the lazy dog".repeat(50);
    let compressed = compressor.compress(&data).unwrap();
    assert!(compressed.len() < data.len() / 4);
    let decompressed = compressor.decompress(&compressed).unwrap();
    assert_eq!(decompressed, data);
}

#[test]
fn test_all_orders_roundtrip() {
    let data = b"test data for all model orders, test data for all model orders";
    for order in -1..=4 {
        let compressor = compressor(order);
        let compressed = compressor.compress(data).unwrap();
        let decompressed = compressor.decompress(&compressed).unwrap();
        assert_eq!(decompressed, data, "roundtrip failed for order {order}");
    }
}

#[test]
fn test_every_byte_value() {
    let data: Vec<u8> = (0..=255).cycle().take(2000).collect();
    for order in [-1, 0, 2] {
        let compressor = compressor(order);
        let compressed = compressor.compress(&data).unwrap();
        assert_eq!(compressor.decompress(&compressed).unwrap(), data);
    }
}

#[test]
fn test_random_data_roundtrip() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for order in 0..=3 {
        let len = rng.gen_range(0..3000);
        let data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        let compressor = compressor(order);
        let compressed = compressor.compress(&data).unwrap();
        assert_eq!(compressor.decompress(&compressed).unwrap(), data);
    }
}

#[test]
fn test_skewed_random_data_roundtrip() {
    let mut rng = StdRng::seed_from_u64(42);
    let data: Vec<u8> = (0..20_000)
        .map(|_| if rng.gen_bool(0.9) { b'a' } else { rng.gen_range(b'b'..=b'f') })
        .collect();
    let compressor = compressor(2);
    let compressed = compressor.compress(&data).unwrap();
    assert!(compressed.len() < data.len() / 2);
    assert_eq!(compressor.decompress(&compressed).unwrap(), data);
}

#[test]
fn test_large_data_forces_rescale() {
    let compressor = compressor(1);
    let data = vec![0xABu8; 100_000];
    let (compressed, stats) = compressor.compress_with_stats(&data).unwrap();
    assert!(stats.ratio < 0.01, "large uniform data should compress well");
    assert_eq!(compressor.decompress(&compressed).unwrap(), data);
}

#[test]
fn test_deterministic() {
    let compressor = compressor(3);
    let data = b"same input, same output".repeat(20);
    assert_eq!(
        compressor.compress(&data).unwrap(),
        compressor.compress(&data).unwrap()
    );
}

#[test]
fn test_empty_input() {
    let compressor = Compressor::default();
    let compressed = compressor.compress(b"").unwrap();
    assert!(!compressed.is_empty());
    assert!(compressor.decompress(&compressed).unwrap().is_empty());
}

#[test]
fn test_truncated_stream_rejected() {
    let compressor = Compressor::default();
    let data = b"truncation must never decode silently into the wrong bytes".repeat(4);
    let compressed = compressor.compress(&data).unwrap();
    let result = compressor.decompress(&compressed[..compressed.len() - 1]);
    assert!(matches!(result, Err(CodecError::CorruptStream(_))));
}

#[test]
fn test_file_stream_roundtrip() {
    let config = CodecConfig::from_json(r#"{"model_order": 2}"#).unwrap();
    let data = b"file backed streams go through the same bit transport\n".repeat(30);

    let mut packed = tempfile::tempfile().unwrap();
    let summary = compress_to(&data[..], &mut packed, &config).unwrap();
    assert_eq!(summary.bytes_in, data.len() as u64);
    assert_eq!(packed.metadata().unwrap().len(), summary.bytes_out);

    packed.seek(SeekFrom::Start(0)).unwrap();
    let mut unpacked = Vec::new();
    let summary = decompress_from(&mut packed, &mut unpacked, &config).unwrap();
    assert_eq!(summary.bytes_out, data.len() as u64);
    assert_eq!(unpacked, data);
}

#[test]
fn test_orders_are_not_interchangeable() {
    let data = b"abcabcabcabcabcabcabcabcabcabcabcabc";
    let compressed = compressor(3).compress(data).unwrap();
    let mismatched = compressor(0).decompress(&compressed);
    assert!(!matches!(mismatched, Ok(ref out) if out == data));
}
