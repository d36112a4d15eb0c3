// src/stores/mod.rs
//! Envelope stores: native syntax ⇄ `Tree`
//!
//! One store per `Format`. Stores only move data between syntax and the
//! tree; they never touch keys or ciphertext.

pub mod binary;
pub mod dotenv;
pub mod flatten;
pub mod ini;
pub mod json;
pub mod yaml;

pub use binary::BinaryStore;
pub use dotenv::DotenvStore;
pub use ini::IniStore;
pub use json::JsonStore;
pub use yaml::YamlStore;

use crate::config::StoresConfig;
use crate::enums::Format;
use crate::error::Result;
use crate::tree::{Branch, Tree};

/// Parse and serialize one native envelope syntax
pub trait EnvelopeStore: Send + Sync {
    /// Parse an encrypted envelope. Missing metadata is a parse error.
    fn load_encrypted(&self, bytes: &[u8]) -> Result<Tree>;

    /// Parse a plaintext document (no metadata) into branches.
    fn load_plain(&self, bytes: &[u8]) -> Result<Vec<Branch>>;

    /// Serialize decrypted branches back to native syntax.
    fn emit_plain(&self, branches: &[Branch]) -> Result<Vec<u8>>;

    /// Serialize an encrypted tree, metadata included.
    fn emit_encrypted(&self, tree: &Tree) -> Result<Vec<u8>>;
}

/// Format → store lookup, built once from config
pub struct StoreRegistry {
    yaml: YamlStore,
    json: JsonStore,
    dotenv: DotenvStore,
    ini: IniStore,
    binary: BinaryStore,
}

impl StoreRegistry {
    pub fn new(config: &StoresConfig) -> Self {
        Self {
            yaml: YamlStore::new(),
            json: JsonStore::new(config.json.indent),
            dotenv: DotenvStore::new(),
            ini: IniStore::new(),
            binary: BinaryStore::new(config.json.indent),
        }
    }

    pub fn store_for(&self, format: Format) -> &dyn EnvelopeStore {
        match format {
            Format::Yaml => &self.yaml,
            Format::Json => &self.json,
            Format::Dotenv => &self.dotenv,
            Format::Ini => &self.ini,
            Format::Binary => &self.binary,
        }
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new(&StoresConfig::default())
    }
}
