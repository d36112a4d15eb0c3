// src/tree.rs
//! In-memory envelope tree and the leaf walk shared by encrypt and decrypt
//!
//! Stores turn native syntax into `Branch`es; the walk visits leaves in
//! document order, depth first. Mapping keys extend the path, sequence
//! elements share their parent's path. The MAC depends on this order, so
//! every store must preserve the order of its source document.

use crate::error::Result;
use crate::metadata::Metadata;

/// Ordered list of items at one nesting level
pub type Branch = Vec<TreeItem>;

#[derive(Debug, Clone, PartialEq)]
pub enum TreeItem {
    Entry { key: String, value: TreeValue },
    /// A comment line at this level; holds a `TreeValue::Comment`
    Comment(TreeValue),
}

impl TreeItem {
    pub fn entry(key: impl Into<String>, value: TreeValue) -> Self {
        TreeItem::Entry {
            key: key.into(),
            value,
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        TreeItem::Comment(TreeValue::Comment(text.into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Comment(String),
    Sequence(Vec<TreeValue>),
    Branch(Branch),
}

impl TreeValue {
    pub fn is_comment(&self) -> bool {
        matches!(self, TreeValue::Comment(_))
    }

    /// Bytes this leaf contributes to the MAC. `None` for comments and
    /// non-leaf values.
    pub fn mac_bytes(&self) -> Option<Vec<u8>> {
        match self {
            TreeValue::Null => Some(Vec::new()),
            TreeValue::Bool(true) => Some(b"True".to_vec()),
            TreeValue::Bool(false) => Some(b"False".to_vec()),
            TreeValue::Int(i) => Some(i.to_string().into_bytes()),
            TreeValue::Float(f) => Some(format_float(*f).into_bytes()),
            TreeValue::Str(s) => Some(s.as_bytes().to_vec()),
            TreeValue::Bytes(b) => Some(b.clone()),
            TreeValue::Comment(_) | TreeValue::Sequence(_) | TreeValue::Branch(_) => None,
        }
    }

    /// Text form of a leaf for formats without typed scalars.
    pub fn to_plain_string(&self) -> String {
        match self {
            TreeValue::Null => String::new(),
            TreeValue::Bool(b) => b.to_string(),
            TreeValue::Int(i) => i.to_string(),
            TreeValue::Float(f) => format_float(*f),
            TreeValue::Str(s) | TreeValue::Comment(s) => s.clone(),
            TreeValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            TreeValue::Sequence(_) | TreeValue::Branch(_) => String::new(),
        }
    }
}

/// Shortest round-trip decimal without exponent, e.g. `0.000000000314`.
pub fn format_float(f: f64) -> String {
    format!("{f}")
}

/// An envelope: branches plus metadata
#[derive(Debug, Clone)]
pub struct Tree {
    pub branches: Vec<Branch>,
    pub metadata: Metadata,
}

impl Tree {
    /// Visit every leaf in document order, replacing it with the visitor's
    /// result. The visitor gets the leaf and its key path.
    pub fn walk_leaves<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(TreeValue, &[String]) -> Result<TreeValue>,
    {
        let mut path = Vec::new();
        for branch in &mut self.branches {
            walk_branch(branch, &mut path, &mut visit)?;
        }
        Ok(())
    }
}

fn walk_branch<F>(branch: &mut Branch, path: &mut Vec<String>, visit: &mut F) -> Result<()>
where
    F: FnMut(TreeValue, &[String]) -> Result<TreeValue>,
{
    for item in branch.iter_mut() {
        match item {
            TreeItem::Comment(value) => {
                let taken = std::mem::replace(value, TreeValue::Null);
                *value = match visit(taken, path)? {
                    comment @ TreeValue::Comment(_) => comment,
                    other => TreeValue::Comment(other.to_plain_string()),
                };
            }
            TreeItem::Entry { key, value } => {
                path.push(key.clone());
                let result = walk_value(value, path, visit);
                path.pop();
                result?;
            }
        }
    }
    Ok(())
}

fn walk_value<F>(value: &mut TreeValue, path: &mut Vec<String>, visit: &mut F) -> Result<()>
where
    F: FnMut(TreeValue, &[String]) -> Result<TreeValue>,
{
    match value {
        TreeValue::Branch(branch) => walk_branch(branch, path, visit),
        TreeValue::Sequence(items) => {
            for item in items.iter_mut() {
                walk_value(item, path, visit)?;
            }
            Ok(())
        }
        leaf => {
            let taken = std::mem::replace(leaf, TreeValue::Null);
            *leaf = visit(taken, path)?;
            Ok(())
        }
    }
}

/// Additional data binding a leaf to its position: `a:b:c:`
pub fn path_additional_data(path: &[String]) -> String {
    let mut out = path.join(":");
    out.push(':');
    out
}
