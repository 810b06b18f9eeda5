//! Error types for ppm-compress

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Error, Debug)]
pub enum CodecError {
    /// A frequency table was asked to code a symbol it gives no probability mass.
    #[error("model error: symbol {symbol} has zero frequency in the active table")]
    Model { symbol: u16 },

    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    #[error("rescale left table with zero total after {observed} observed symbols")]
    RescaleInvariant { observed: usize },

    #[error("invalid model order {0}: must be at least -1")]
    InvalidOrder(i32),

    #[error("symbol {0} is outside the model alphabet")]
    InvalidSymbol(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}
