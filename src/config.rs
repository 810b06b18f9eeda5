//! Configuration for ppm-compress
//!
//! Nothing here is written into the compressed stream, so the compressing and
//! decompressing side must agree on the configuration out of band.

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Context order used when nothing else is configured.
pub const DEFAULT_MODEL_ORDER: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Longest context length, -1 disables the context tree entirely.
    /// Memory grows as O(257^n) in the worst case.
    pub model_order: i32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            model_order: DEFAULT_MODEL_ORDER,
        }
    }
}

impl CodecConfig {
    pub fn with_order(model_order: i32) -> Result<Self> {
        let config = Self { model_order };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document such as `{"model_order": 2}`
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_order < -1 {
            return Err(CodecError::InvalidOrder(self.model_order));
        }
        Ok(())
    }

    /// Maximum number of history symbols kept between symbols.
    pub fn history_len(&self) -> usize {
        self.model_order.max(0) as usize
    }
}
