//! Symbol codec loop
//!
//! Each symbol is coded against the longest existing context first. When a
//! context has never seen the symbol, its escape is coded instead and the
//! next shorter context is tried, down to the order -1 table that can code
//! anything. In that last table slot 256 means end of stream rather than
//! escape. Encoder and decoder then update the model with the same history
//! and symbol, which keeps the two sides in lockstep.

use std::io::{BufReader, BufWriter, Read, Write};

use tracing::{debug, trace};

use crate::arithmetic::{ArithmeticDecoder, ArithmeticEncoder};
use crate::bit_io::{BitSink, BitSource, StreamBitReader, StreamBitWriter};
use crate::config::CodecConfig;
use crate::error::Result;
use crate::frequency::ESCAPE_SYMBOL;
use crate::model::PpmModel;

/// End-of-stream marker, coded in the order -1 table.
pub const EOF_SYMBOL: u16 = ESCAPE_SYMBOL;

/// The most recent symbols, newest first, capped at the model order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    symbols: Vec<u16>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            symbols: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, symbol: u16) {
        if self.capacity == 0 {
            return;
        }
        self.symbols.truncate(self.capacity - 1);
        self.symbols.insert(0, symbol);
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.symbols
    }
}

/// Code `symbol` (a byte or `EOF_SYMBOL`) in the context selected by `history`.
pub fn encode_symbol<S: BitSink>(
    encoder: &mut ArithmeticEncoder<S>,
    model: &PpmModel,
    history: &[u16],
    symbol: u16,
) -> Result<()> {
    for node in model.contexts_for_history(history) {
        let table = model.table(node);
        if symbol != ESCAPE_SYMBOL && table.get(symbol) > 0 {
            return encoder.encode_symbol(table, symbol);
        }
        trace!(order = model.node(node).order(), symbol, "escape");
        encoder.encode_symbol(table, ESCAPE_SYMBOL)?;
    }
    encoder.encode_symbol(model.order_minus1_table(), symbol)
}

/// Inverse of [`encode_symbol`].
pub fn decode_symbol<S: BitSource>(
    decoder: &mut ArithmeticDecoder<S>,
    model: &PpmModel,
    history: &[u16],
) -> Result<u16> {
    for node in model.contexts_for_history(history) {
        let symbol = decoder.decode_symbol(model.table(node))?;
        if symbol != ESCAPE_SYMBOL {
            return Ok(symbol);
        }
        trace!(order = model.node(node).order(), "escape");
    }
    decoder.decode_symbol(model.order_minus1_table())
}

/// Byte-at-a-time PPM compressor over a bit sink.
pub struct PpmEncoder<S: BitSink> {
    coder: ArithmeticEncoder<S>,
    model: PpmModel,
    history: History,
    symbols: u64,
}

impl<S: BitSink> PpmEncoder<S> {
    pub fn new(sink: S, config: &CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            coder: ArithmeticEncoder::new(sink),
            model: PpmModel::new(config.model_order)?,
            history: History::new(config.history_len()),
            symbols: 0,
        })
    }

    pub fn model(&self) -> &PpmModel {
        &self.model
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.code(u16::from(byte))
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        data.iter().try_for_each(|&b| self.write_byte(b))
    }

    /// Code the end-of-stream marker and flush the sink.
    pub fn finish(mut self) -> Result<S> {
        self.code(EOF_SYMBOL)?;
        debug!(symbols = self.symbols, nodes = self.model.node_count(), "encoder finished");
        self.coder.finish()
    }

    fn code(&mut self, symbol: u16) -> Result<()> {
        encode_symbol(&mut self.coder, &self.model, self.history.as_slice(), symbol)?;
        self.model.increment_contexts(self.history.as_slice(), symbol)?;
        self.history.push(symbol);
        self.symbols += 1;
        Ok(())
    }
}

/// Byte-at-a-time PPM decompressor over a bit source.
pub struct PpmDecoder<S: BitSource> {
    coder: ArithmeticDecoder<S>,
    model: PpmModel,
    history: History,
    finished: bool,
}

impl<S: BitSource> PpmDecoder<S> {
    pub fn new(source: S, config: &CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            coder: ArithmeticDecoder::new(source)?,
            model: PpmModel::new(config.model_order)?,
            history: History::new(config.history_len()),
            finished: false,
        })
    }

    pub fn model(&self) -> &PpmModel {
        &self.model
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_inner(self) -> S {
        self.coder.into_inner()
    }

    /// Next decoded byte, or `None` once the end-of-stream marker was read.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.finished {
            return Ok(None);
        }
        let symbol = decode_symbol(&mut self.coder, &self.model, self.history.as_slice())?;
        self.model.increment_contexts(self.history.as_slice(), symbol)?;
        self.history.push(symbol);

        if symbol == EOF_SYMBOL {
            self.finished = true;
            debug!(
                missing_bits = self.coder.missing_bits(),
                nodes = self.model.node_count(),
                "decoder reached end of stream"
            );
            return Ok(None);
        }
        Ok(Some(symbol as u8))
    }
}

/// Sizes reported by the streaming entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// Compress everything `reader` yields into `writer`.
pub fn compress_to<R: Read, W: Write>(
    reader: R,
    writer: W,
    config: &CodecConfig,
) -> Result<StreamSummary> {
    debug!(model_order = config.model_order, "compressing stream");
    let mut encoder = PpmEncoder::new(StreamBitWriter::new(BufWriter::new(writer)), config)?;
    let mut bytes_in = 0u64;
    for byte in BufReader::new(reader).bytes() {
        encoder.write_byte(byte?)?;
        bytes_in += 1;
    }
    let sink = encoder.finish()?;
    let summary = StreamSummary {
        bytes_in,
        bytes_out: sink.bits_written().div_ceil(8),
    };
    debug!(bytes_in, bytes_out = summary.bytes_out, "compression finished");
    Ok(summary)
}

/// Decompress a stream produced by [`compress_to`] with the same configuration.
pub fn decompress_from<R: Read, W: Write>(
    reader: R,
    writer: W,
    config: &CodecConfig,
) -> Result<StreamSummary> {
    debug!(model_order = config.model_order, "decompressing stream");
    let mut decoder = PpmDecoder::new(StreamBitReader::new(BufReader::new(reader)), config)?;
    let mut out = BufWriter::new(writer);
    let mut bytes_out = 0u64;
    while let Some(byte) = decoder.read_byte()? {
        out.write_all(&[byte])?;
        bytes_out += 1;
    }
    out.flush()?;
    let bytes_in = decoder.into_inner().bits_read().div_ceil(8);
    debug!(bytes_in, bytes_out, "decompression finished");
    Ok(StreamSummary {
        bytes_in,
        bytes_out,
    })
}

/// Compress an in-memory buffer.
pub fn compress(data: &[u8], config: &CodecConfig) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    compress_to(data, &mut output, config)?;
    Ok(output)
}

/// Decompress an in-memory buffer.
pub fn decompress(data: &[u8], config: &CodecConfig) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    decompress_from(data, &mut output, config)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_io::BitBuffer;
    use crate::error::CodecError;

    fn config(order: i32) -> CodecConfig {
        CodecConfig::with_order(order).unwrap()
    }

    #[test]
    fn test_history_keeps_newest_first() {
        let mut history = History::new(3);
        for s in [1, 2, 3, 4] {
            history.push(s);
        }
        assert_eq!(history.as_slice(), &[4, 3, 2]);

        let mut empty = History::new(0);
        empty.push(9);
        assert!(empty.as_slice().is_empty());
    }

    #[test]
    fn test_roundtrip_every_order() {
        let data = b"abracadabra, abracadabra! the cat sat on the mat";
        for order in -1..=4 {
            let compressed = compress(data, &config(order)).unwrap();
            let decompressed = decompress(&compressed, &config(order)).unwrap();
            assert_eq!(decompressed, data, "order {order}");
        }
    }

    #[test]
    fn test_empty_input() {
        let compressed = compress(b"", &config(3)).unwrap();
        assert!(!compressed.is_empty());
        assert!(decompress(&compressed, &config(3)).unwrap().is_empty());
    }

    #[test]
    fn test_abab_scenario() {
        let mut encoder = PpmEncoder::new(BitBuffer::new(), &config(3)).unwrap();
        encoder.write_all(b"ABABA").unwrap();
        let model = encoder.model().clone();
        let bits = encoder.finish().unwrap();

        let after_a = model.table_for(&[b'A' as u16]).unwrap();
        assert_eq!(after_a.get(b'B' as u16), 2);
        assert_eq!(after_a.get(ESCAPE_SYMBOL), 1);

        let mut decoder = PpmDecoder::new(bits, &config(3)).unwrap();
        let mut out = Vec::new();
        while let Some(b) = decoder.read_byte().unwrap() {
            out.push(b);
        }
        assert_eq!(out, b"ABABA");

        // the end-of-stream update adds one more escape in every context on the path
        let after_a = decoder.model().table_for(&[b'A' as u16]).unwrap();
        assert_eq!(after_a.get(b'B' as u16), 2);
        assert_eq!(after_a.get(ESCAPE_SYMBOL), 2);
    }

    #[test]
    fn test_models_stay_symmetric() {
        let data = b"she sells sea shells by the sea shore";
        let mut encoder = PpmEncoder::new(BitBuffer::new(), &config(2)).unwrap();
        let mut snapshots = Vec::new();
        for &b in data {
            encoder.write_byte(b).unwrap();
            snapshots.push(encoder.model().clone());
        }
        let bits = encoder.finish().unwrap();

        let mut decoder = PpmDecoder::new(bits, &config(2)).unwrap();
        for (i, snapshot) in snapshots.iter().enumerate() {
            assert_eq!(decoder.read_byte().unwrap(), Some(data[i]));
            assert_eq!(decoder.model(), snapshot, "models diverged at symbol {i}");
        }
        assert_eq!(decoder.read_byte().unwrap(), None);
        assert!(decoder.is_finished());
        assert_eq!(decoder.read_byte().unwrap(), None);
    }

    #[test]
    fn test_input_of_order_plus_one_escapes_every_level() {
        let data = b"wxyz";
        let compressed = compress(data, &config(3)).unwrap();
        assert_eq!(decompress(&compressed, &config(3)).unwrap(), data);
    }

    #[test]
    fn test_truncated_stream_is_corrupt() {
        let data = b"It was the best of times, it was the worst of times.";
        let compressed = compress(data, &config(3)).unwrap();
        let truncated = &compressed[..compressed.len() - 1];
        assert!(matches!(
            decompress(truncated, &config(3)),
            Err(CodecError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_empty_stream_is_corrupt() {
        assert!(matches!(
            decompress(&[], &config(3)),
            Err(CodecError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_deterministic_output() {
        let data = b"determinism determinism determinism";
        assert_eq!(
            compress(data, &config(2)).unwrap(),
            compress(data, &config(2)).unwrap()
        );
    }

    #[test]
    fn test_summary_counts() {
        let data = vec![b'z'; 500];
        let mut output = Vec::new();
        let summary = compress_to(&data[..], &mut output, &config(1)).unwrap();
        assert_eq!(summary.bytes_in, 500);
        assert_eq!(summary.bytes_out, output.len() as u64);
        assert!(output.len() < 100);
    }
}
