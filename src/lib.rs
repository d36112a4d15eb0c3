// src/lib.rs
//! sops-envelope: decrypt and verify SOPS-style encrypted documents
//!
//! Features:
//! - AES256_GCM leaf decryption with per-path additional data
//! - SHA-512 MAC verification (with an audited bypass)
//! - YAML, JSON, dotenv, INI and binary envelopes
//! - age-wrapped data keys, or any custom `KeySource`
//! - Schema-less typed value trees from the decrypted content
//! - Data keys and cleartext are zeroized on drop

pub mod aliases;
pub mod config;
pub mod consts;
pub mod crypto;
pub mod engine;
pub mod enums;
pub mod error;
pub mod formats;
pub mod functions;
pub mod inference;
pub mod keys;
pub mod metadata;
pub mod stores;
pub mod tree;

// Re-export everything users need at the crate root
pub use aliases::{Cleartext, DataKey};
pub use config::{load as load_config, Config};
pub use engine::{DecryptOptions, DecryptionEngine};
pub use enums::Format;
pub use error::{FunctionError, KeySourceError, Result, SopsError};
pub use formats::to_canonical_json;
pub use functions::{Decrypted, SopsFunctions};
pub use inference::{infer, DynamicValue, TypeDescriptor, ValueNode};
pub use keys::{AgeKeySource, KeyChain, KeySource, StaticKeySource};
pub use metadata::Metadata;
pub use stores::{EnvelopeStore, StoreRegistry};
