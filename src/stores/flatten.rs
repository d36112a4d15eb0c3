// src/stores/flatten.rs
//! Metadata ⇄ flat key/value pairs for formats without nesting
//!
//! `{"age": [{"enc": "x"}]}` flattens to `age__list_0__map_enc = x`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{Result, SopsError};
use crate::metadata::Metadata;

const MAP_SEPARATOR: &str = "__map_";
const LIST_SEPARATOR: &str = "__list_";

/// Flatten metadata into sorted key/value pairs.
pub fn flatten_metadata(metadata: &Metadata) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    if let Value::Object(map) = metadata.to_value()? {
        for (key, value) in map {
            flatten_into(&key, &value, &mut out);
        }
    }
    Ok(out)
}

fn flatten_into(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&format!("{prefix}{MAP_SEPARATOR}{key}"), child, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(&format!("{prefix}{LIST_SEPARATOR}{index}"), child, out);
            }
        }
        Value::Null => {}
        Value::String(s) => {
            out.insert(prefix.to_owned(), s.clone());
        }
        other => {
            out.insert(prefix.to_owned(), other.to_string());
        }
    }
}

/// Rebuild metadata from flat pairs (prefix already stripped).
pub fn unflatten_metadata<I, K, V>(pairs: I) -> Result<Metadata>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut root = Value::Object(Map::new());
    for (key, value) in pairs {
        let segments = parse_segments(key.as_ref())?;
        insert(&mut root, &segments, Value::String(value.into()))?;
    }

    if let Value::Object(map) = &mut root {
        retype(map, "shamir_threshold", |s| {
            s.parse::<u64>().ok().map(Value::from)
        });
        retype(map, "mac_only_encrypted", |s| {
            s.parse::<bool>().ok().map(Value::Bool)
        });
    }
    Metadata::from_value(root)
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

fn parse_segments(flat: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = flat;

    let head_end = next_separator(rest).unwrap_or(rest.len());
    segments.push(Segment::Key(rest[..head_end].to_owned()));
    rest = &rest[head_end..];

    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix(MAP_SEPARATOR) {
            let end = next_separator(tail).unwrap_or(tail.len());
            segments.push(Segment::Key(tail[..end].to_owned()));
            rest = &tail[end..];
        } else if let Some(tail) = rest.strip_prefix(LIST_SEPARATOR) {
            let end = next_separator(tail).unwrap_or(tail.len());
            let index = tail[..end].parse().map_err(|_| {
                SopsError::Parse(format!("invalid list index in metadata key {flat:?}"))
            })?;
            segments.push(Segment::Index(index));
            rest = &tail[end..];
        } else {
            return Err(SopsError::Parse(format!("malformed metadata key {flat:?}")));
        }
    }
    Ok(segments)
}

fn next_separator(s: &str) -> Option<usize> {
    [s.find(MAP_SEPARATOR), s.find(LIST_SEPARATOR)]
        .into_iter()
        .flatten()
        .min()
}

fn insert(node: &mut Value, segments: &[Segment], leaf: Value) -> Result<()> {
    let Some((head, tail)) = segments.split_first() else {
        *node = leaf;
        return Ok(());
    };

    match head {
        Segment::Key(key) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            let map = node
                .as_object_mut()
                .ok_or_else(|| SopsError::Parse("metadata key clash".into()))?;
            let child = map.entry(key.clone()).or_insert(Value::Null);
            insert(child, tail, leaf)
        }
        Segment::Index(index) => {
            if !node.is_array() {
                *node = Value::Array(Vec::new());
            }
            let items = node
                .as_array_mut()
                .ok_or_else(|| SopsError::Parse("metadata list clash".into()))?;
            if items.len() <= *index {
                items.resize(*index + 1, Value::Null);
            }
            insert(&mut items[*index], tail, leaf)
        }
    }
}

fn retype(map: &mut Map<String, Value>, key: &str, convert: impl Fn(&str) -> Option<Value>) {
    let converted = match map.get(key) {
        Some(Value::String(s)) => convert(s),
        _ => None,
    };
    if let Some(value) = converted {
        map.insert(key.to_owned(), value);
    }
}
