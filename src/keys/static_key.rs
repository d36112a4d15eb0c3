// src/keys/static_key.rs
use crate::aliases::{data_key_from_slice, DataKey};
use crate::error::{KeySourceError, Result, SopsError};
use crate::metadata::Metadata;

use super::KeySource;

/// A data key the caller already holds
pub struct StaticKeySource {
    key: DataKey,
}

impl StaticKeySource {
    pub fn new(key: DataKey) -> Self {
        Self { key }
    }

    /// Parse a 64-character hex data key.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| SopsError::KeyResolution(format!("invalid hex data key: {e}")))?;
        let key = data_key_from_slice(&bytes)
            .ok_or_else(|| SopsError::KeyResolution("data key must be 32 bytes".into()))?;
        Ok(Self::new(key))
    }
}

impl KeySource for StaticKeySource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn resolve(&self, _metadata: &Metadata) -> std::result::Result<DataKey, KeySourceError> {
        Ok(DataKey::new(*self.key.expose_secret()))
    }
}
