//! 32-bit binary arithmetic coder
//!
//! Encoder and decoder share one interval state and one renormalization
//! schedule. The scheme is the carry-less one: fixed leading bits are shifted
//! out as soon as they agree, and an interval straddling the midpoint too
//! tightly is expanded around it while the encoder counts pending bits.

use crate::bit_io::{BitSink, BitSource};
use crate::error::{CodecError, Result};
use crate::frequency::{FrequencyTable, MAX_TOTAL};

pub const STATE_BITS: u32 = 32;
pub const TOP_BIT: u32 = 1 << (STATE_BITS - 1); // 0x80000000
pub const SECOND_BIT: u32 = 1 << (STATE_BITS - 2); // 0x40000000
pub const MIN_RANGE: u64 = SECOND_BIT as u64 + 2;

/// How many bits past the physical end of input the decoder may invent.
///
/// The decoder keeps a full register of lookahead while the encoder's flush
/// only emits a single terminating bit, so a well-formed stream never needs
/// more than `STATE_BITS - 1` zero bits of padding.
pub const FLUSH_MARGIN_BITS: u32 = STATE_BITS - 1;

const _: () = assert!(MAX_TOTAL as u64 <= MIN_RANGE);

/// One renormalization step, applied identically to `low`, `high` and the
/// decoder's `code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Renorm {
    /// The leading bit of the interval is settled.
    Shift(bool),
    /// The interval straddles the midpoint inside the middle half.
    Underflow,
}

/// The closed interval `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoderState {
    low: u32,
    high: u32,
}

impl Default for CoderState {
    fn default() -> Self {
        Self {
            low: 0,
            high: u32::MAX,
        }
    }
}

impl CoderState {
    pub fn low(&self) -> u32 {
        self.low
    }

    pub fn high(&self) -> u32 {
        self.high
    }

    fn range(&self) -> u64 {
        u64::from(self.high - self.low) + 1
    }

    /// Shrink the interval to the sub-range `table` assigns to `symbol`.
    fn narrow(&mut self, table: &FrequencyTable, symbol: u16) -> Result<()> {
        let total = u64::from(table.total());
        let sym_low = u64::from(table.low(symbol));
        let sym_high = u64::from(table.high(symbol));
        if sym_low == sym_high {
            return Err(CodecError::Model { symbol });
        }
        debug_assert!(total <= MIN_RANGE && total <= self.range());

        let range = self.range();
        let low = u64::from(self.low);
        self.high = (low + range * sym_high / total - 1) as u32;
        self.low = (low + range * sym_low / total) as u32;
        Ok(())
    }

    fn next_step(&self) -> Option<Renorm> {
        if self.high < TOP_BIT {
            Some(Renorm::Shift(false))
        } else if self.low >= TOP_BIT {
            Some(Renorm::Shift(true))
        } else if self.low >= SECOND_BIT && self.high < TOP_BIT + SECOND_BIT {
            Some(Renorm::Underflow)
        } else {
            None
        }
    }

    fn apply(&mut self, step: Renorm) {
        let offset = step_offset(step);
        self.low = (self.low - offset) << 1;
        self.high = ((self.high - offset) << 1) | 1;
    }
}

fn step_offset(step: Renorm) -> u32 {
    match step {
        Renorm::Shift(false) => 0,
        Renorm::Shift(true) => TOP_BIT,
        Renorm::Underflow => SECOND_BIT,
    }
}

pub struct ArithmeticEncoder<S: BitSink> {
    state: CoderState,
    pending_bits: u64,
    sink: S,
}

impl<S: BitSink> ArithmeticEncoder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            state: CoderState::default(),
            pending_bits: 0,
            sink,
        }
    }

    pub fn state(&self) -> CoderState {
        self.state
    }

    pub fn pending_bits(&self) -> u64 {
        self.pending_bits
    }

    pub fn encode_symbol(&mut self, table: &FrequencyTable, symbol: u16) -> Result<()> {
        self.state.narrow(table, symbol)?;
        while let Some(step) = self.state.next_step() {
            match step {
                Renorm::Shift(bit) => self.emit(bit)?,
                Renorm::Underflow => self.pending_bits += 1,
            }
            self.state.apply(step);
        }
        Ok(())
    }

    /// Terminate the stream and hand back the flushed sink.
    ///
    /// A single 1 bit selects the interval midpoint, which the last interval
    /// always contains; the pending bits that follow are all 0.
    pub fn finish(mut self) -> Result<S> {
        self.emit(true)?;
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn emit(&mut self, bit: bool) -> Result<()> {
        self.sink.write_bit(bit)?;
        while self.pending_bits > 0 {
            self.sink.write_bit(!bit)?;
            self.pending_bits -= 1;
        }
        Ok(())
    }
}

pub struct ArithmeticDecoder<S: BitSource> {
    state: CoderState,
    code: u32,
    missing_bits: u32,
    source: S,
}

impl<S: BitSource> ArithmeticDecoder<S> {
    /// Fill the code register with the first `STATE_BITS` bits of input.
    pub fn new(source: S) -> Result<Self> {
        let mut decoder = Self {
            state: CoderState::default(),
            code: 0,
            missing_bits: 0,
            source,
        };
        for _ in 0..STATE_BITS {
            decoder.code = (decoder.code << 1) | u32::from(decoder.next_bit()?);
        }
        Ok(decoder)
    }

    pub fn state(&self) -> CoderState {
        self.state
    }

    /// Bits synthesized past the end of input so far.
    pub fn missing_bits(&self) -> u32 {
        self.missing_bits
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    pub fn decode_symbol(&mut self, table: &FrequencyTable) -> Result<u16> {
        let total = u64::from(table.total());
        if total == 0 {
            return Err(CodecError::Model { symbol: 0 });
        }
        debug_assert!(self.state.low <= self.code && self.code <= self.state.high);

        let range = self.state.range();
        let offset = u64::from(self.code - self.state.low);
        let value = (((offset + 1) * total - 1) / range).min(total - 1);
        let symbol = table.symbol_for(value as u32).ok_or_else(|| {
            CodecError::CorruptStream(format!("no symbol owns cumulative value {value}"))
        })?;

        self.state.narrow(table, symbol)?;
        while let Some(step) = self.state.next_step() {
            let bit = self.next_bit()?;
            self.code = ((self.code - step_offset(step)) << 1) | u32::from(bit);
            self.state.apply(step);
        }
        Ok(symbol)
    }

    fn next_bit(&mut self) -> Result<bool> {
        match self.source.read_bit()? {
            Some(bit) => Ok(bit),
            None if self.missing_bits < FLUSH_MARGIN_BITS => {
                self.missing_bits += 1;
                Ok(false)
            }
            None => Err(CodecError::CorruptStream(format!(
                "input ended more than {FLUSH_MARGIN_BITS} bits early"
            ))),
        }
    }
}
