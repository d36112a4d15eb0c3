// tests/support.rs
//! Fixture builders: seal plaintext documents under a fixed data key

#![allow(dead_code)] // each test binary uses a different subset

use std::fs;
use std::path::PathBuf;

use sops_envelope::{
    DataKey, DecryptionEngine, Format, KeyChain, Metadata, StaticKeySource, StoreRegistry,
};
use tempfile::TempDir;

pub const TEST_KEY: [u8; 32] = [0x42; 32];
pub const OTHER_KEY: [u8; 32] = [0x17; 32];

pub fn data_key() -> DataKey {
    DataKey::new(TEST_KEY)
}

/// Engine that resolves every envelope to `key`.
pub fn engine_with_key(key: [u8; 32]) -> DecryptionEngine {
    DecryptionEngine::new(
        StoreRegistry::default(),
        KeyChain::new().with(StaticKeySource::new(DataKey::new(key))),
    )
}

pub fn engine() -> DecryptionEngine {
    engine_with_key(TEST_KEY)
}

/// Seal `plaintext` with default metadata.
pub fn seal(plaintext: &str, format: Format) -> Vec<u8> {
    seal_with(plaintext, format, Metadata::default())
}

pub fn seal_with(plaintext: &str, format: Format, metadata: Metadata) -> Vec<u8> {
    engine()
        .encrypt(plaintext.as_bytes(), format, &data_key(), metadata)
        .expect("sealing fixture")
}

pub fn seal_str(plaintext: &str, format: Format) -> String {
    String::from_utf8(seal(plaintext, format)).expect("envelope is UTF-8")
}

/// Write `bytes` to `name` inside `dir`.
pub fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).expect("write fixture");
    path
}

/// Flip the first ciphertext character of an `ENC[...]` value.
pub fn tamper_ciphertext(enc: &str) -> String {
    let start = enc.find("data:").expect("data field") + "data:".len();
    let mut out = enc.to_owned();
    let replacement = if &enc[start..start + 1] == "A" { "B" } else { "A" };
    out.replace_range(start..start + 1, replacement);
    out
}
