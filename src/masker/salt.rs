//! Per-run salt for the `Hashed` operation.

use crate::error::{MaskError, Result};
use std::fmt;

/// bcrypt takes exactly 16 bytes of salt
pub const SALT_LEN: usize = 16;

/// Random salt shared by every masking call of one run.
///
/// Generated once before the first line is read, never regenerated and never
/// persisted. `Debug` does not print the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Draw a fresh salt from the operating system CSPRNG.
    ///
    /// There is no fallback source: failure aborts the run.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; SALT_LEN];
        getrandom::fill(&mut bytes).map_err(|e| MaskError::Salt(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }

    /// Lowercase hex, as exposed to templates through `.Salt`
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(..)")
    }
}
