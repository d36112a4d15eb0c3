// src/formats.rs
//! Decrypted native syntax → canonical JSON
//!
//! Values keep the types their format gives them: YAML and JSON are fully
//! typed, dotenv and INI values are always strings. Binary has no
//! structure and yields no bytes. dotenv values are never expanded.

use ini::Ini;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::enums::Format;
use crate::error::{Result, SopsError};
use crate::stores::dotenv;
use crate::tree::TreeItem;

/// Normalize decrypted bytes of `format` into canonical JSON.
pub fn to_canonical_json(bytes: &[u8], format: Format) -> Result<Vec<u8>> {
    let value = match format {
        Format::Yaml => read_yaml(bytes)?,
        Format::Json => read_json(bytes)?,
        Format::Ini => read_ini(bytes)?,
        Format::Dotenv => read_dotenv(bytes)?,
        Format::Binary => return Ok(Vec::new()),
    };
    serde_json::to_vec(&value).map_err(|e| SopsError::Unmarshal(e.to_string()))
}

/// First document only; an empty stream is null.
fn read_yaml(bytes: &[u8]) -> Result<Value> {
    let Some(document) = serde_yaml::Deserializer::from_slice(bytes).next() else {
        return Ok(Value::Null);
    };
    let yaml =
        serde_yaml::Value::deserialize(document).map_err(|e| SopsError::Unmarshal(e.to_string()))?;
    serde_json::to_value(yaml).map_err(|e| SopsError::Unmarshal(e.to_string()))
}

fn read_json(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(|e| SopsError::Unmarshal(e.to_string()))
}

/// Keys outside any section are top-level fields; each section is an
/// object of strings.
fn read_ini(bytes: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| SopsError::Unmarshal("ini data is not valid UTF-8".into()))?;
    let document = Ini::load_from_str(text).map_err(|e| SopsError::Unmarshal(e.to_string()))?;

    let mut root = Map::new();
    for (section, props) in document.iter() {
        let fields: Map<String, Value> = props
            .iter()
            .map(|(key, value)| (key.to_owned(), Value::String(value.to_owned())))
            .collect();
        match section {
            None => root.extend(fields),
            Some(name) => {
                root.insert(name.to_owned(), Value::Object(fields));
            }
        }
    }
    Ok(Value::Object(root))
}

/// Values stay literal: `$VAR` references are never expanded, from the
/// process environment or from the document itself. One pair of matching
/// surrounding quotes is removed.
fn read_dotenv(bytes: &[u8]) -> Result<Value> {
    let branch = dotenv::parse(bytes).map_err(|e| match e {
        SopsError::Parse(message) => SopsError::Unmarshal(message),
        other => other,
    })?;

    let mut root = Map::new();
    for item in branch {
        if let TreeItem::Entry { key, value } = item {
            let text = value.to_plain_string();
            root.insert(key, Value::String(unquote(&text).to_owned()));
        }
    }
    Ok(Value::Object(root))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
