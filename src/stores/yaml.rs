// src/stores/yaml.rs
//! YAML envelopes
//!
//! Every document of a multi-document stream is one branch. Metadata is
//! read from the first document carrying a `sops` key and written into
//! each document on emit.
//!
//! Known gap: comments do not survive parsing. An encrypted `#ENC[...]`
//! comment is never decrypted and is absent from the emitted cleartext.
//! The MAC never covers comments, so verification is unaffected.

use serde::Deserialize;
use serde_yaml::{Mapping, Number, Value};

use super::EnvelopeStore;
use crate::consts::METADATA_KEY;
use crate::error::{Result, SopsError};
use crate::metadata::Metadata;
use crate::tree::{Branch, Tree, TreeItem, TreeValue};

const DOCUMENT_SEPARATOR: &str = "---\n";

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlStore;

impl YamlStore {
    pub fn new() -> Self {
        Self
    }
}

impl EnvelopeStore for YamlStore {
    fn load_encrypted(&self, bytes: &[u8]) -> Result<Tree> {
        let mut metadata = None;
        let mut branches = Vec::new();
        for mut document in parse_documents(bytes)? {
            if let Some(found) = document.shift_remove(METADATA_KEY) {
                if metadata.is_none() {
                    let json = serde_json::to_value(found)
                        .map_err(|e| SopsError::Parse(format!("invalid sops metadata: {e}")))?;
                    metadata = Some(Metadata::from_value(json)?);
                }
            }
            branches.push(mapping_to_branch(document)?);
        }

        let metadata =
            metadata.ok_or_else(|| SopsError::Parse("sops metadata not found".into()))?;
        Ok(Tree { branches, metadata })
    }

    fn load_plain(&self, bytes: &[u8]) -> Result<Vec<Branch>> {
        parse_documents(bytes)?
            .into_iter()
            .map(mapping_to_branch)
            .collect()
    }

    fn emit_plain(&self, branches: &[Branch]) -> Result<Vec<u8>> {
        let documents = branches
            .iter()
            .map(branch_to_mapping)
            .collect::<Result<Vec<_>>>()?;
        render(documents)
    }

    fn emit_encrypted(&self, tree: &Tree) -> Result<Vec<u8>> {
        let metadata = serde_yaml::to_value(&tree.metadata)
            .map_err(|e| SopsError::Emit(format!("sops metadata: {e}")))?;
        let mut documents = Vec::with_capacity(tree.branches.len().max(1));
        for branch in &tree.branches {
            let mut mapping = branch_to_mapping(branch)?;
            mapping.insert(Value::String(METADATA_KEY.to_owned()), metadata.clone());
            documents.push(mapping);
        }
        if documents.is_empty() {
            let mut mapping = Mapping::new();
            mapping.insert(Value::String(METADATA_KEY.to_owned()), metadata);
            documents.push(mapping);
        }
        render(documents)
    }
}

fn parse_documents(bytes: &[u8]) -> Result<Vec<Mapping>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_slice(bytes) {
        let value =
            Value::deserialize(document).map_err(|e| SopsError::Parse(format!("invalid yaml: {e}")))?;
        match value {
            Value::Mapping(mapping) => documents.push(mapping),
            Value::Null => documents.push(Mapping::new()),
            _ => {
                return Err(SopsError::Parse(
                    "yaml document must be a mapping".into(),
                ))
            }
        }
    }
    Ok(documents)
}

fn render(documents: Vec<Mapping>) -> Result<Vec<u8>> {
    let mut out = String::new();
    for (index, document) in documents.into_iter().enumerate() {
        if index > 0 {
            out.push_str(DOCUMENT_SEPARATOR);
        }
        let text = serde_yaml::to_string(&Value::Mapping(document))
            .map_err(|e| SopsError::Emit(e.to_string()))?;
        out.push_str(&text);
    }
    Ok(out.into_bytes())
}

fn mapping_to_branch(mapping: Mapping) -> Result<Branch> {
    mapping
        .into_iter()
        .map(|(key, value)| Ok(TreeItem::entry(key_to_string(key)?, value_to_tree(value)?)))
        .collect()
}

fn key_to_string(key: Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_owned()),
        Value::Tagged(tagged) => key_to_string(tagged.value),
        _ => Err(SopsError::Parse("yaml mapping keys must be scalars".into())),
    }
}

fn value_to_tree(value: Value) -> Result<TreeValue> {
    Ok(match value {
        Value::Null => TreeValue::Null,
        Value::Bool(b) => TreeValue::Bool(b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => TreeValue::Int(i),
            (None, Some(f)) => TreeValue::Float(f),
            (None, None) => {
                return Err(SopsError::Parse(format!("number {n} is out of range")))
            }
        },
        Value::String(s) => TreeValue::Str(s),
        Value::Sequence(items) => TreeValue::Sequence(
            items
                .into_iter()
                .map(value_to_tree)
                .collect::<Result<_>>()?,
        ),
        Value::Mapping(mapping) => TreeValue::Branch(mapping_to_branch(mapping)?),
        Value::Tagged(tagged) => value_to_tree(tagged.value)?,
    })
}

fn branch_to_mapping(branch: &Branch) -> Result<Mapping> {
    let mut mapping = Mapping::new();
    for item in branch {
        if let TreeItem::Entry { key, value } = item {
            if let Some(value) = tree_to_value(value)? {
                mapping.insert(Value::String(key.clone()), value);
            }
        }
    }
    Ok(mapping)
}

fn tree_to_value(value: &TreeValue) -> Result<Option<Value>> {
    Ok(Some(match value {
        TreeValue::Null => Value::Null,
        TreeValue::Bool(b) => Value::Bool(*b),
        TreeValue::Int(i) => Value::Number(Number::from(*i)),
        TreeValue::Float(f) => Value::Number(Number::from(*f)),
        TreeValue::Str(s) => Value::String(s.clone()),
        TreeValue::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
        TreeValue::Comment(_) => return Ok(None),
        TreeValue::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some(value) = tree_to_value(item)? {
                    out.push(value);
                }
            }
            Value::Sequence(out)
        }
        TreeValue::Branch(branch) => Value::Mapping(branch_to_mapping(branch)?),
    }))
}
