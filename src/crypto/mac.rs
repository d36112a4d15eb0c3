// src/crypto/mac.rs
//! Running SHA-512 over leaf plaintexts, rendered as uppercase hex

use sha2::{Digest, Sha512};

#[derive(Clone, Default)]
pub struct MacAccumulator {
    hasher: Sha512,
}

impl MacAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, fragment: &[u8]) {
        self.hasher.update(fragment);
    }

    pub fn finish(self) -> String {
        hex::encode_upper(self.hasher.finalize())
    }
}
