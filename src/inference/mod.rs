// src/inference/mod.rs
//! Canonical JSON → `DynamicValue`
//!
//! The first significant byte decides how a document is decoded: `{` as an
//! object of raw fields, `[` as a tuple of raw elements, anything else as a
//! scalar. Containers recurse on their raw children, so every node keeps
//! its own type. Decode errors never quote the input.

mod classify;
mod value;

pub use classify::{classify, Shape};
pub use value::{DynamicValue, TypeDescriptor, ValueNode};

use std::collections::BTreeMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::value::RawValue;
use serde_json::Value;

use crate::error::{Result, SopsError};

/// Infer a typed value tree from canonical JSON. Empty input is null.
pub fn infer(bytes: &[u8]) -> Result<DynamicValue> {
    infer_node(bytes).map(DynamicValue::from)
}

fn infer_node(bytes: &[u8]) -> Result<ValueNode> {
    match classify(bytes) {
        Shape::Empty => Ok(ValueNode::Null),
        Shape::Object => {
            let fields: BTreeMap<String, Box<RawValue>> =
                serde_json::from_slice(bytes).map_err(|e| decode_error("object", &e))?;
            let mut object = BTreeMap::new();
            for (name, raw) in fields {
                let node = infer_node(raw.get().as_bytes())?;
                object.insert(name, node);
            }
            Ok(ValueNode::Object(object))
        }
        Shape::Tuple => {
            let elements: Vec<Box<RawValue>> =
                serde_json::from_slice(bytes).map_err(|e| decode_error("tuple", &e))?;
            elements
                .iter()
                .map(|raw| infer_node(raw.get().as_bytes()))
                .collect::<Result<Vec<_>>>()
                .map(ValueNode::Tuple)
        }
        Shape::Scalar => {
            let scalar: Value =
                serde_json::from_slice(bytes).map_err(|e| decode_error("scalar", &e))?;
            scalar_node(scalar)
        }
    }
}

fn scalar_node(scalar: Value) -> Result<ValueNode> {
    match scalar {
        Value::Null => Ok(ValueNode::Null),
        Value::Bool(b) => Ok(ValueNode::Bool(b)),
        Value::String(s) => Ok(ValueNode::String(s)),
        Value::Number(n) => BigDecimal::from_str(&n.to_string())
            .map(ValueNode::Number)
            .map_err(|e| SopsError::Decode(format!("failed to decode number: {e}"))),
        Value::Array(_) | Value::Object(_) => Err(SopsError::Decode(
            "failed to decode scalar: unexpected container".into(),
        )),
    }
}

fn decode_error(shape: &str, e: &serde_json::Error) -> SopsError {
    SopsError::Decode(format!(
        "failed to decode {shape}: {:?} error at line {} column {}",
        e.classify(),
        e.line(),
        e.column()
    ))
}
