// src/keys/mod.rs
//! Data key resolution
//!
//! A `KeyChain` asks each configured `KeySource` in turn; the first one
//! that unwraps the data key wins.

pub mod age_key;
pub mod static_key;

pub use age_key::AgeKeySource;
pub use static_key::StaticKeySource;

use tracing::debug;

use crate::aliases::DataKey;
use crate::error::{KeySourceError, Result, SopsError};
use crate::metadata::Metadata;

/// Something that can recover the data key of an envelope
pub trait KeySource: Send + Sync {
    /// Short label used in error messages.
    fn name(&self) -> &'static str;

    fn resolve(&self, metadata: &Metadata) -> std::result::Result<DataKey, KeySourceError>;
}

/// Ordered list of key sources
#[derive(Default)]
pub struct KeyChain {
    sources: Vec<Box<dyn KeySource>>,
}

impl KeyChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: KeySource + 'static>(mut self, source: S) -> Self {
        self.push(source);
        self
    }

    pub fn push<S: KeySource + 'static>(&mut self, source: S) {
        self.sources.push(Box::new(source));
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn resolve(&self, metadata: &Metadata) -> Result<DataKey> {
        // Each group wraps only a share of the data key once there is more
        // than one, whatever the threshold says.
        let groups = metadata.key_groups.as_ref().map_or(0, Vec::len);
        if groups > 1 {
            let threshold = metadata.shamir_threshold.unwrap_or(groups);
            return Err(SopsError::KeyResolution(format!(
                "shamir secret sharing ({threshold} of {groups} key groups) is not supported"
            )));
        }
        if self.sources.is_empty() {
            return Err(SopsError::KeyResolution("no key sources configured".into()));
        }

        let mut failures = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source.resolve(metadata) {
                Ok(key) => {
                    debug!(source = source.name(), "data key resolved");
                    return Ok(key);
                }
                Err(e) => {
                    debug!(source = source.name(), error = %e, "key source failed");
                    failures.push(format!("{}: {e}", source.name()));
                }
            }
        }
        Err(SopsError::KeyResolution(failures.join("; ")))
    }
}
