// src/stores/binary.rs
//! Binary envelopes: arbitrary bytes kept in a single `data` leaf of a
//! JSON envelope

use super::json::JsonStore;
use super::EnvelopeStore;
use crate::consts::BINARY_DATA_KEY;
use crate::error::{Result, SopsError};
use crate::tree::{Branch, Tree, TreeItem, TreeValue};

#[derive(Debug, Clone, Default)]
pub struct BinaryStore {
    json: JsonStore,
}

impl BinaryStore {
    pub fn new(indent: Option<usize>) -> Self {
        Self {
            json: JsonStore::new(indent),
        }
    }
}

impl EnvelopeStore for BinaryStore {
    fn load_encrypted(&self, bytes: &[u8]) -> Result<Tree> {
        self.json.load_encrypted(bytes)
    }

    fn load_plain(&self, bytes: &[u8]) -> Result<Vec<Branch>> {
        let value = match std::str::from_utf8(bytes) {
            Ok(text) => TreeValue::Str(text.to_owned()),
            Err(_) => TreeValue::Bytes(bytes.to_vec()),
        };
        Ok(vec![vec![TreeItem::entry(BINARY_DATA_KEY, value)]])
    }

    fn emit_plain(&self, branches: &[Branch]) -> Result<Vec<u8>> {
        let data = branches
            .iter()
            .flatten()
            .find_map(|item| match item {
                TreeItem::Entry { key, value } if key == BINARY_DATA_KEY => Some(value),
                _ => None,
            })
            .ok_or_else(|| SopsError::Emit("no binary data found in tree".into()))?;

        match data {
            TreeValue::Str(text) => Ok(text.as_bytes().to_vec()),
            TreeValue::Bytes(bytes) => Ok(bytes.clone()),
            _ => Err(SopsError::Emit("binary data must be a string".into())),
        }
    }

    fn emit_encrypted(&self, tree: &Tree) -> Result<Vec<u8>> {
        self.json.emit_encrypted(tree)
    }
}
