//! bcrypt hashing for the `Hashed` operation.

use super::salt::Salt;
use crate::error::{MaskError, Result};
use ahash::AHashMap;

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Entries kept before the memo is reset
const HASH_CACHE_CAPACITY: usize = 64 * 1024;

/// bcrypt work factor, validated against [`MIN_COST`]..=[`MAX_COST`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost(u32);

impl HashCost {
    pub fn new(cost: u32) -> Result<Self> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(MaskError::InvalidCost {
                cost,
                min: MIN_COST,
                max: MAX_COST,
            });
        }
        Ok(Self(cost))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for HashCost {
    fn default() -> Self {
        Self(DEFAULT_COST)
    }
}

/// bcrypt `$2b$` hash of the exact bytes of `raw` with the run salt.
pub fn hash_value(raw: &[u8], salt: &Salt, cost: HashCost) -> Result<String> {
    let parts = bcrypt::hash_with_salt(raw, cost.get(), *salt.as_bytes())?;
    Ok(parts.format_for_version(bcrypt::Version::TwoB))
}

/// Memo of `raw -> hash` for one run.
///
/// Hashes are a pure function of raw value, salt and cost, all fixed for the
/// run, so repeated values (foreign keys, common emails) skip the bcrypt work.
#[derive(Debug, Default)]
pub struct HashCache {
    entries: AHashMap<Vec<u8>, String>,
    hits: u64,
}

impl HashCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_hash(&mut self, raw: &[u8], salt: &Salt, cost: HashCost) -> Result<String> {
        if let Some(hashed) = self.entries.get(raw) {
            self.hits += 1;
            return Ok(hashed.clone());
        }

        let hashed = hash_value(raw, salt, cost)?;
        if self.entries.len() >= HASH_CACHE_CAPACITY {
            self.entries.clear();
        }
        self.entries.insert(raw.to_vec(), hashed.clone());
        Ok(hashed)
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
