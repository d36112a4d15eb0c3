// src/inference/value.rs
//! Schema-less value tree and its type descriptor

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;

/// A decoded JSON value. Numbers keep their full decimal precision.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueNode {
    Null,
    Bool(bool),
    Number(BigDecimal),
    String(String),
    Tuple(Vec<ValueNode>),
    Object(BTreeMap<String, ValueNode>),
}

/// Shape-for-shape type of a `ValueNode`; `Dynamic` is the type of null
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Dynamic,
    Bool,
    Number,
    String,
    Tuple(Vec<TypeDescriptor>),
    Object(BTreeMap<String, TypeDescriptor>),
}

impl ValueNode {
    pub fn type_descriptor(&self) -> TypeDescriptor {
        match self {
            ValueNode::Null => TypeDescriptor::Dynamic,
            ValueNode::Bool(_) => TypeDescriptor::Bool,
            ValueNode::Number(_) => TypeDescriptor::Number,
            ValueNode::String(_) => TypeDescriptor::String,
            ValueNode::Tuple(items) => {
                TypeDescriptor::Tuple(items.iter().map(ValueNode::type_descriptor).collect())
            }
            ValueNode::Object(fields) => TypeDescriptor::Object(
                fields
                    .iter()
                    .map(|(name, node)| (name.clone(), node.type_descriptor()))
                    .collect(),
            ),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ValueNode::Null)
    }

    /// Field lookup on objects; `None` for everything else.
    pub fn get(&self, name: &str) -> Option<&ValueNode> {
        match self {
            ValueNode::Object(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Render as compact canonical JSON. Object keys come out sorted.
    pub fn to_canonical_json(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out);
        out
    }

    fn write_json(&self, out: &mut String) {
        match self {
            ValueNode::Null => out.push_str("null"),
            ValueNode::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            ValueNode::Number(n) => out.push_str(&n.to_string()),
            ValueNode::String(s) => write_string(s, out),
            ValueNode::Tuple(items) => {
                out.push('[');
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    item.write_json(out);
                }
                out.push(']');
            }
            ValueNode::Object(fields) => {
                out.push('{');
                for (index, (name, node)) in fields.iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    write_string(name, out);
                    out.push(':');
                    node.write_json(out);
                }
                out.push('}');
            }
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if u32::from(c) < 0x20 => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// A value paired with its type, as handed to the host
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub ty: TypeDescriptor,
    pub value: ValueNode,
}

impl DynamicValue {
    pub fn null() -> Self {
        ValueNode::Null.into()
    }

    pub fn to_canonical_json(&self) -> String {
        self.value.to_canonical_json()
    }
}

impl From<ValueNode> for DynamicValue {
    fn from(value: ValueNode) -> Self {
        Self {
            ty: value.type_descriptor(),
            value,
        }
    }
}
