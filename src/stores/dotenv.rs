// src/stores/dotenv.rs
//! Dotenv envelopes: `KEY=VALUE` lines
//!
//! Lines starting with `#` become comment items. Values are always
//! strings; embedded newlines are written as `\n`. Metadata lives in
//! flattened `sops_*` keys.

use super::flatten::{flatten_metadata, unflatten_metadata};
use super::EnvelopeStore;
use crate::consts::DOTENV_METADATA_PREFIX;
use crate::error::{Result, SopsError};
use crate::tree::{Branch, Tree, TreeItem, TreeValue};

#[derive(Debug, Clone, Copy, Default)]
pub struct DotenvStore;

impl DotenvStore {
    pub fn new() -> Self {
        Self
    }
}

impl EnvelopeStore for DotenvStore {
    fn load_encrypted(&self, bytes: &[u8]) -> Result<Tree> {
        let mut branch = Branch::new();
        let mut metadata = Vec::new();
        for item in parse(bytes)? {
            match item {
                TreeItem::Entry { key, value } => match key.strip_prefix(DOTENV_METADATA_PREFIX) {
                    Some(flat) => metadata.push((flat.to_owned(), value.to_plain_string())),
                    None => branch.push(TreeItem::Entry { key, value }),
                },
                comment => branch.push(comment),
            }
        }

        if metadata.is_empty() {
            return Err(SopsError::Parse("sops metadata not found".into()));
        }
        Ok(Tree {
            branches: vec![branch],
            metadata: unflatten_metadata(metadata)?,
        })
    }

    fn load_plain(&self, bytes: &[u8]) -> Result<Vec<Branch>> {
        Ok(vec![parse(bytes)?])
    }

    fn emit_plain(&self, branches: &[Branch]) -> Result<Vec<u8>> {
        let mut out = String::new();
        for branch in branches {
            write_branch(branch, &mut out)?;
        }
        Ok(out.into_bytes())
    }

    fn emit_encrypted(&self, tree: &Tree) -> Result<Vec<u8>> {
        let mut out = String::new();
        for branch in &tree.branches {
            write_branch(branch, &mut out)?;
        }
        for (key, value) in flatten_metadata(&tree.metadata)? {
            write_line(&format!("{DOTENV_METADATA_PREFIX}{key}"), &value, &mut out);
        }
        Ok(out.into_bytes())
    }
}

/// Literal `KEY=VALUE` parse. Nothing is expanded or unquoted, and errors
/// name the line number only.
pub(crate) fn parse(bytes: &[u8]) -> Result<Branch> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| SopsError::Parse("dotenv input is not valid UTF-8".into()))?;

    let mut branch = Branch::new();
    for (index, line) in text.split('\n').enumerate() {
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            branch.push(TreeItem::comment(comment));
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| {
                SopsError::Parse(format!("invalid dotenv input at line {}", index + 1))
            })?;
        branch.push(TreeItem::entry(key, TreeValue::Str(value.replace("\\n", "\n"))));
    }
    Ok(branch)
}

fn write_branch(branch: &Branch, out: &mut String) -> Result<()> {
    for item in branch {
        match item {
            TreeItem::Comment(comment) => {
                out.push('#');
                out.push_str(&comment.to_plain_string());
                out.push('\n');
            }
            TreeItem::Entry { key, value } => match value {
                TreeValue::Sequence(_) | TreeValue::Branch(_) => {
                    return Err(SopsError::Emit(format!(
                        "dotenv value for {key:?} must be a scalar"
                    )))
                }
                scalar => write_line(key, &scalar.to_plain_string(), out),
            },
        }
    }
    Ok(())
}

fn write_line(key: &str, value: &str, out: &mut String) {
    out.push_str(key);
    out.push('=');
    out.push_str(&value.replace('\n', "\\n"));
    out.push('\n');
}
