// src/aliases.rs
//! Secret holders for key material and decrypted documents
//!
//! Both wipe their bytes on drop and never print them. Callers reach the
//! bytes only through `expose_secret`.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::consts::DATA_KEY_LEN;

/// 256-bit AES-GCM data key
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DataKey([u8; DATA_KEY_LEN]);

impl DataKey {
    pub fn new(bytes: [u8; DATA_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn expose_secret(&self) -> &[u8; DATA_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DataKey([REDACTED])")
    }
}

/// Decrypted native-syntax document
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Cleartext(Vec<u8>);

impl Cleartext {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn expose_secret(&self) -> &Vec<u8> {
        &self.0
    }
}

impl fmt::Debug for Cleartext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cleartext([REDACTED; {} bytes])", self.0.len())
    }
}

/// Build a data key from unwrapped key material.
///
/// Returns `None` unless `bytes` is exactly 32 bytes long.
pub fn data_key_from_slice(bytes: &[u8]) -> Option<DataKey> {
    let array: [u8; DATA_KEY_LEN] = bytes.try_into().ok()?;
    Some(DataKey::new(array))
}

/// Generate a fresh random data key.
pub fn generate_data_key() -> DataKey {
    DataKey::new(rand::random::<[u8; DATA_KEY_LEN]>())
}
