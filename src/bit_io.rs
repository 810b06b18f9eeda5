//! Bit transport between the arithmetic coder and a byte stream
//!
//! The coder only ever moves single bits. Byte packing (most significant bit
//! first) and end-of-stream padding are handled here with `bitstream-io`.

use std::io::{self, ErrorKind, Read, Write};

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use crate::error::Result;

/// Consumer side of the transport: the encoder writes bits into it.
pub trait BitSink {
    fn write_bit(&mut self, bit: bool) -> Result<()>;

    /// Pad the final partial byte with zero bits and push everything out.
    fn flush(&mut self) -> Result<()>;
}

/// Producer side of the transport: the decoder pulls bits from it.
pub trait BitSource {
    /// Next bit, or `None` once the underlying stream is exhausted.
    fn read_bit(&mut self) -> Result<Option<bool>>;
}

pub struct StreamBitWriter<W: Write> {
    inner: BitWriter<W, BigEndian>,
    bits_written: u64,
}

impl<W: Write> StreamBitWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: BitWriter::endian(writer, BigEndian),
            bits_written: 0,
        }
    }

    /// Number of bits written so far, padding excluded.
    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Returns the wrapped writer. Call `flush` first or the last partial byte is lost.
    pub fn into_inner(self) -> W {
        self.inner.into_writer()
    }
}

impl<W: Write> BitSink for StreamBitWriter<W> {
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.inner.write_bit(bit)?;
        self.bits_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.byte_align()?;
        self.inner.flush()?;
        Ok(())
    }
}

pub struct StreamBitReader<R: Read> {
    inner: BitReader<R, BigEndian>,
    bits_read: u64,
    exhausted: bool,
}

impl<R: Read> StreamBitReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: BitReader::endian(reader, BigEndian),
            bits_read: 0,
            exhausted: false,
        }
    }

    /// Number of bits actually taken from the stream.
    pub fn bits_read(&self) -> u64 {
        self.bits_read
    }
}

impl<R: Read> BitSource for StreamBitReader<R> {
    fn read_bit(&mut self) -> Result<Option<bool>> {
        if self.exhausted {
            return Ok(None);
        }
        match self.inner.read_bit() {
            Ok(bit) => {
                self.bits_read += 1;
                Ok(Some(bit))
            }
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                self.exhausted = true;
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory transport, one `bool` per bit. Reading starts at the first bit written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitBuffer {
    bits: Vec<bool>,
    pos: usize,
}

impl BitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self { bits, pos: 0 }
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Pack the bits into bytes the same way `StreamBitWriter` does.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut writer = BitWriter::endian(Vec::new(), BigEndian);
        for &bit in &self.bits {
            writer.write_bit(bit)?;
        }
        writer.byte_align()?;
        Ok(writer.into_writer())
    }
}

impl BitSink for BitBuffer {
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.bits.push(bit);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl BitSource for BitBuffer {
    fn read_bit(&mut self) -> Result<Option<bool>> {
        let bit = self.bits.get(self.pos).copied();
        if bit.is_some() {
            self.pos += 1;
        }
        Ok(bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_packs_msb_first_and_pads() {
        let mut writer = StreamBitWriter::new(Vec::new());
        for bit in [true, false, true, true, false, false, false, true, true] {
            writer.write_bit(bit).unwrap();
        }
        writer.flush().unwrap();
        assert_eq!(writer.bits_written(), 9);
        assert_eq!(writer.into_inner(), vec![0b1011_0001, 0b1000_0000]);
    }

    #[test]
    fn test_reader_signals_end_of_stream() {
        let data = [0b1100_0000u8];
        let mut reader = StreamBitReader::new(&data[..]);
        let mut bits = Vec::new();
        while let Some(bit) = reader.read_bit().unwrap() {
            bits.push(bit);
        }
        assert_eq!(bits, vec![true, true, false, false, false, false, false, false]);
        assert_eq!(reader.read_bit().unwrap(), None);
        assert_eq!(reader.bits_read(), 8);
    }

    #[test]
    fn test_bit_buffer_matches_stream_writer() {
        let pattern = [false, true, true, false, true];
        let mut buffer = BitBuffer::new();
        let mut writer = StreamBitWriter::new(Vec::new());
        for bit in pattern {
            buffer.write_bit(bit).unwrap();
            writer.write_bit(bit).unwrap();
        }
        writer.flush().unwrap();
        assert_eq!(buffer.to_bytes().unwrap(), writer.into_inner());

        let mut reader = BitBuffer::from_bits(pattern.to_vec());
        for bit in pattern {
            assert_eq!(reader.read_bit().unwrap(), Some(bit));
        }
        assert_eq!(reader.read_bit().unwrap(), None);
    }
}
