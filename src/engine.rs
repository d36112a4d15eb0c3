// src/engine.rs
//! Decrypt-and-verify pipeline
//!
//! `decrypt` runs: parse → resolve data key → decrypt leaves while
//! hashing → verify MAC → emit cleartext. Every step is fatal on error and
//! nothing is retried. `encrypt` is the mirror image, used to seal
//! envelopes.

use chrono::Utc;
use tracing::{debug, warn};

use crate::aliases::{Cleartext, DataKey};
use crate::config::Config;
use crate::consts::{DEFAULT_UNENCRYPTED_SUFFIX, ENVELOPE_VERSION};
use crate::crypto::{decrypt_tree, encrypt_tree, seal_mac, verify_mac, AesGcmCipher, CipherAdapter};
use crate::enums::Format;
use crate::error::Result;
use crate::keys::{AgeKeySource, KeyChain};
use crate::metadata::Metadata;
use crate::stores::StoreRegistry;
use crate::tree::Tree;

/// Per-call switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecryptOptions {
    /// Skip MAC verification entirely. Logged as a warning on every use.
    pub ignore_mac_mismatch: bool,
}

impl DecryptOptions {
    pub fn verified() -> Self {
        Self {
            ignore_mac_mismatch: false,
        }
    }

    pub fn ignoring_mac() -> Self {
        Self {
            ignore_mac_mismatch: true,
        }
    }
}

pub struct DecryptionEngine {
    stores: StoreRegistry,
    keys: KeyChain,
    cipher: Box<dyn CipherAdapter>,
}

impl DecryptionEngine {
    pub fn new(stores: StoreRegistry, keys: KeyChain) -> Self {
        Self {
            stores,
            keys,
            cipher: Box::new(AesGcmCipher::new()),
        }
    }

    /// Stores from config, age identities from the configured locations.
    pub fn from_config(config: &Config) -> Self {
        let keys = KeyChain::new().with(AgeKeySource::new(config.keys.clone()));
        Self::new(StoreRegistry::new(&config.stores), keys)
    }

    pub fn with_cipher<C: CipherAdapter + 'static>(mut self, cipher: C) -> Self {
        self.cipher = Box::new(cipher);
        self
    }

    pub fn stores(&self) -> &StoreRegistry {
        &self.stores
    }

    pub fn decrypt(
        &self,
        envelope: &[u8],
        format: Format,
        options: &DecryptOptions,
    ) -> Result<Cleartext> {
        debug!(%format, "decrypting envelope");
        let store = self.stores.store_for(format);
        let mut tree = store.load_encrypted(envelope)?;

        let key = self.keys.resolve(&tree.metadata)?;
        let computed = decrypt_tree(&mut tree, &key, self.cipher.as_ref())?;

        if options.ignore_mac_mismatch {
            warn!(%format, "MAC verification skipped (ignore_mac_mismatch)");
        } else {
            verify_mac(&tree.metadata, &computed, &key, self.cipher.as_ref())?;
        }

        let cleartext = store.emit_plain(&tree.branches)?;
        Ok(Cleartext::new(cleartext))
    }

    /// Seal `plaintext` under `key`. `template` supplies the key
    /// descriptors and encryption rule; its timestamp and MAC are replaced.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        format: Format,
        key: &DataKey,
        template: Metadata,
    ) -> Result<Vec<u8>> {
        debug!(%format, "encrypting document");
        let store = self.stores.store_for(format);
        let branches = store.load_plain(plaintext)?;

        let mut metadata = template;
        metadata.stamp(Utc::now());
        if metadata.version.is_empty() {
            metadata.version = ENVELOPE_VERSION.to_owned();
        }
        if !metadata.has_encryption_rule() {
            metadata.unencrypted_suffix = Some(DEFAULT_UNENCRYPTED_SUFFIX.to_owned());
        }

        let mut tree = Tree { branches, metadata };
        let mac = encrypt_tree(&mut tree, key, self.cipher.as_ref())?;
        seal_mac(&mut tree.metadata, &mac, key, self.cipher.as_ref())?;
        store.emit_encrypted(&tree)
    }
}
