//! ppm-compress: lossless compression by prediction by partial matching.
//!
//! An adaptive order-N context model feeds symbol probabilities to a 32-bit
//! binary arithmetic coder:
//! - `frequency` holds the per-context symbol counts
//! - `model` builds the context tree as symbols are seen
//! - `arithmetic` turns probabilities into bits and back
//! - `codec` runs the escape walk that ties the two together
//!
//! The compressed stream is a bare bit sequence with no header, so the model
//! order must be configured identically on both ends.

pub mod arithmetic;
pub mod bit_io;
pub mod codec;
pub mod config;
pub mod error;
pub mod frequency;
pub mod model;

pub use crate::codec::{compress_to, decompress_from, PpmDecoder, PpmEncoder, StreamSummary};
pub use crate::config::CodecConfig;
pub use crate::error::{CodecError, Result};

use tracing::debug;

/// Sizes and entropy of one compression run
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompressionStats {
    pub original_size: usize,
    pub compressed_size: usize,
    pub ratio: f64,
    /// Order-0 Shannon entropy of the input in bits per byte
    pub entropy_bits: f64,
}

/// The main compressor engine
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    config: CodecConfig,
}

impl Compressor {
    /// Create a new compressor with the given configuration
    pub fn new(config: CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Compress data into a raw PPM bit stream
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        codec::compress(data, &self.config)
    }

    /// Decompress a stream produced with the same configuration
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        codec::decompress(data, &self.config)
    }

    /// Compress and report how well it went
    pub fn compress_with_stats(&self, data: &[u8]) -> Result<(Vec<u8>, CompressionStats)> {
        let compressed = self.compress(data)?;
        let ratio = if data.is_empty() {
            1.0
        } else {
            compressed.len() as f64 / data.len() as f64
        };
        let stats = CompressionStats {
            original_size: data.len(),
            compressed_size: compressed.len(),
            ratio,
            entropy_bits: compute_entropy(data),
        };
        debug!(?stats, "compressed buffer");
        Ok((compressed, stats))
    }
}

/// Compute Shannon entropy of data in bits per byte
pub fn compute_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut freq = [0u64; 256];
    for &b in data {
        freq[b as usize] += 1;
    }
    let len = data.len() as f64;
    let mut entropy = 0.0;
    for &f in &freq {
        if f > 0 {
            let p = f as f64 / len;
            entropy -= p * p.log2();
        }
    }
    entropy
}
