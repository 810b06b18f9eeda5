//! Adaptive frequency tables over the 257-symbol alphabet
//!
//! Slots 0..=255 hold literal bytes, slot 256 is shared by the escape symbol
//! and, in the order -1 table only, the end-of-stream marker.

use tracing::trace;

use crate::error::{CodecError, Result};

/// Literal bytes plus the escape / end-of-stream slot.
pub const SYMBOL_LIMIT: usize = 257;
pub const ESCAPE_SYMBOL: u16 = 256;
/// Largest total a table may reach before it is rescaled.
pub const MAX_TOTAL: u32 = 1 << 16;

/// Per-symbol counts with an eagerly maintained prefix sum.
///
/// `cumulative[s]` is the sum of all counts below `s`, so
/// `cumulative[SYMBOL_LIMIT]` is the total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: Vec<u32>,
    cumulative: Vec<u32>,
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FrequencyTable {
    /// Table with every count at zero.
    pub fn new() -> Self {
        Self {
            counts: vec![0; SYMBOL_LIMIT],
            cumulative: vec![0; SYMBOL_LIMIT + 1],
        }
    }

    /// Table giving every symbol, end-of-stream included, a count of one.
    pub fn uniform() -> Self {
        let mut table = Self {
            counts: vec![1; SYMBOL_LIMIT],
            cumulative: vec![0; SYMBOL_LIMIT + 1],
        };
        table.rebuild_cumulative();
        table
    }

    pub fn get(&self, symbol: u16) -> u32 {
        self.counts.get(symbol as usize).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.cumulative[SYMBOL_LIMIT]
    }

    /// Sum of the counts of every symbol below `symbol`.
    pub fn low(&self, symbol: u16) -> u32 {
        self.cumulative[symbol as usize]
    }

    /// `low(symbol) + get(symbol)`
    pub fn high(&self, symbol: u16) -> u32 {
        self.cumulative[symbol as usize + 1]
    }

    /// Number of literal symbols that currently have a nonzero count.
    pub fn distinct_symbols(&self) -> usize {
        self.counts[..ESCAPE_SYMBOL as usize]
            .iter()
            .filter(|&&c| c > 0)
            .count()
    }

    /// Symbol whose `[low, high)` range contains `value`.
    pub fn symbol_for(&self, value: u32) -> Option<u16> {
        if value >= self.total() {
            return None;
        }
        // first index whose prefix sum exceeds value, cumulative[0] == 0 <= value
        let idx = self.cumulative.partition_point(|&c| c <= value);
        Some((idx - 1) as u16)
    }

    /// Record one occurrence of `symbol`.
    ///
    /// A literal seen here for the first time gets a count of one and raises
    /// the escape count by one, so the escape mass tracks the number of
    /// distinct literals. Returns whether the table had to be rescaled.
    pub fn increment(&mut self, symbol: u16) -> Result<bool> {
        let idx = symbol as usize;
        if idx >= SYMBOL_LIMIT {
            return Err(CodecError::InvalidSymbol(symbol));
        }

        if symbol != ESCAPE_SYMBOL && self.counts[idx] == 0 {
            self.counts[idx] = 1;
            self.counts[ESCAPE_SYMBOL as usize] += 1;
            for c in &mut self.cumulative[idx + 1..] {
                *c += 1;
            }
            // escape is the last slot, only the total moves
            self.cumulative[SYMBOL_LIMIT] += 1;
        } else {
            self.counts[idx] += 1;
            for c in &mut self.cumulative[idx + 1..] {
                *c += 1;
            }
        }

        if self.total() > MAX_TOTAL {
            self.rescale()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Halve every nonzero count (keeping it at least one) until the total fits.
    pub fn rescale(&mut self) -> Result<()> {
        let observed = self.counts.iter().filter(|&&c| c > 0).count();
        let before = self.total();

        while self.total() > MAX_TOTAL {
            let previous = self.total();
            for c in self.counts.iter_mut().filter(|c| **c > 0) {
                *c = (*c / 2).max(1);
            }
            self.rebuild_cumulative();
            if self.total() == previous {
                break;
            }
        }

        if observed > 0 && self.total() == 0 {
            return Err(CodecError::RescaleInvariant { observed });
        }
        trace!(before, after = self.total(), "rescaled frequency table");
        Ok(())
    }

    fn rebuild_cumulative(&mut self) {
        let mut sum = 0;
        for (i, &c) in self.counts.iter().enumerate() {
            self.cumulative[i] = sum;
            sum += c;
        }
        self.cumulative[SYMBOL_LIMIT] = sum;
    }
}
