// src/crypto/mod.rs
//! Pure cryptographic operations: no I/O, no stores
//!
//! The leaf cipher, the MAC accumulator, and the two tree walks that use
//! them. Decryption and encryption share `Tree::walk_leaves`, so both hash
//! leaves in exactly the same order.

mod cipher;
mod decrypt;
mod encrypt;
mod mac;

pub use cipher::{AesGcmCipher, CipherAdapter, DecryptedLeaf, EncryptedValue};
pub use decrypt::{decrypt_tree, verify_mac};
pub use encrypt::{encrypt_tree, seal_mac};
pub use mac::MacAccumulator;
