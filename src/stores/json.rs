// src/stores/json.rs
//! JSON envelopes: one top-level object, metadata under `sops`

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Number, Serializer, Value};

use super::EnvelopeStore;
use crate::consts::METADATA_KEY;
use crate::error::{Result, SopsError};
use crate::metadata::Metadata;
use crate::tree::{Branch, Tree, TreeItem, TreeValue};

#[derive(Debug, Clone, Default)]
pub struct JsonStore {
    indent: Option<usize>,
}

impl JsonStore {
    /// `indent` spaces per level, or tabs when `None`.
    pub fn new(indent: Option<usize>) -> Self {
        Self { indent }
    }

    pub(crate) fn render(&self, value: &Value) -> Result<Vec<u8>> {
        let indent = match self.indent {
            Some(width) => vec![b' '; width],
            None => b"\t".to_vec(),
        };
        let mut out = Vec::new();
        let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&indent));
        value
            .serialize(&mut ser)
            .map_err(|e| SopsError::Emit(e.to_string()))?;
        out.push(b'\n');
        Ok(out)
    }
}

impl EnvelopeStore for JsonStore {
    fn load_encrypted(&self, bytes: &[u8]) -> Result<Tree> {
        let mut document = parse_object(bytes)?;
        let metadata = document
            .shift_remove(METADATA_KEY)
            .ok_or_else(|| SopsError::Parse("sops metadata not found".into()))?;
        Ok(Tree {
            branches: vec![object_to_branch(document)?],
            metadata: Metadata::from_value(metadata)?,
        })
    }

    fn load_plain(&self, bytes: &[u8]) -> Result<Vec<Branch>> {
        let document = parse_object(bytes)?;
        if document.contains_key(METADATA_KEY) {
            return Err(SopsError::Parse("document is already encrypted".into()));
        }
        Ok(vec![object_to_branch(document)?])
    }

    fn emit_plain(&self, branches: &[Branch]) -> Result<Vec<u8>> {
        let mut document = Map::new();
        for branch in branches {
            document.extend(branch_to_map(branch)?);
        }
        self.render(&Value::Object(document))
    }

    fn emit_encrypted(&self, tree: &Tree) -> Result<Vec<u8>> {
        let mut document = Map::new();
        for branch in &tree.branches {
            document.extend(branch_to_map(branch)?);
        }
        document.insert(METADATA_KEY.to_owned(), tree.metadata.to_value()?);
        self.render(&Value::Object(document))
    }
}

fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SopsError::Parse("json document must be an object".into())),
        Err(e) => Err(SopsError::Parse(format!("invalid json: {e}"))),
    }
}

pub(crate) fn object_to_branch(map: Map<String, Value>) -> Result<Branch> {
    map.into_iter()
        .map(|(key, value)| Ok(TreeItem::entry(key, value_to_tree(value)?)))
        .collect()
}

pub(crate) fn value_to_tree(value: Value) -> Result<TreeValue> {
    Ok(match value {
        Value::Null => TreeValue::Null,
        Value::Bool(b) => TreeValue::Bool(b),
        Value::Number(n) => number_to_tree(&n)?,
        Value::String(s) => TreeValue::Str(s),
        Value::Array(items) => TreeValue::Sequence(
            items
                .into_iter()
                .map(value_to_tree)
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => TreeValue::Branch(object_to_branch(map)?),
    })
}

fn number_to_tree(n: &Number) -> Result<TreeValue> {
    if let Some(i) = n.as_i64() {
        return Ok(TreeValue::Int(i));
    }
    n.as_f64()
        .map(TreeValue::Float)
        .ok_or_else(|| SopsError::Parse(format!("number {n} is out of range")))
}

pub(crate) fn branch_to_map(branch: &Branch) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for item in branch {
        if let TreeItem::Entry { key, value } = item {
            if let Some(value) = tree_to_value(value)? {
                map.insert(key.clone(), value);
            }
        }
    }
    Ok(map)
}

/// `None` for comments, which JSON cannot hold.
pub(crate) fn tree_to_value(value: &TreeValue) -> Result<Option<Value>> {
    Ok(Some(match value {
        TreeValue::Null => Value::Null,
        TreeValue::Bool(b) => Value::Bool(*b),
        TreeValue::Int(i) => Value::Number((*i).into()),
        TreeValue::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| SopsError::Emit(format!("{f} has no json representation")))?,
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
            Value::Array(out)
        }
        TreeValue::Branch(branch) => Value::Object(branch_to_map(branch)?),
    }))
}
