//! Engine configuration, loaded from a JSON file.

use crate::error::EngineResult;
use crate::matching::AddressStrictness;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_DIMENSION_RETRY_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How aggressively stored addresses are held against connecting
    /// identities in applicability checks.
    pub address_strictness: AddressStrictness,
    /// Retry budget for the dimension get-or-create race.
    pub dimension_retry_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            address_strictness: AddressStrictness::Normal,
            dimension_retry_attempts: DEFAULT_DIMENSION_RETRY_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
