// src/stores/ini.rs
//! INI envelopes
//!
//! The tree is a single branch with one entry per section. Keys outside
//! any section form the `DEFAULT` section. Metadata is kept flattened in
//! `[sops]`.
//!
//! Known gap: `;` and `#` comment lines are dropped by the parser, so they
//! are missing from the emitted cleartext. The MAC never covers comments.

use ini::Ini;

use super::flatten::{flatten_metadata, unflatten_metadata};
use super::EnvelopeStore;
use crate::consts::{INI_DEFAULT_SECTION, INI_METADATA_SECTION};
use crate::error::{Result, SopsError};
use crate::tree::{Branch, Tree, TreeItem, TreeValue};

#[derive(Debug, Clone, Copy, Default)]
pub struct IniStore;

impl IniStore {
    pub fn new() -> Self {
        Self
    }
}

impl EnvelopeStore for IniStore {
    fn load_encrypted(&self, bytes: &[u8]) -> Result<Tree> {
        let document = parse(bytes)?;

        let mut metadata = None;
        let mut branch = Branch::new();
        for (section, props) in document.iter() {
            if section == Some(INI_METADATA_SECTION) {
                metadata = Some(unflatten_metadata(props.iter())?);
                continue;
            }
            if let Some(item) = section_item(section, props) {
                branch.push(item);
            }
        }

        let metadata =
            metadata.ok_or_else(|| SopsError::Parse("sops metadata not found".into()))?;
        Ok(Tree {
            branches: vec![branch],
            metadata,
        })
    }

    fn load_plain(&self, bytes: &[u8]) -> Result<Vec<Branch>> {
        let document = parse(bytes)?;
        let branch = document
            .iter()
            .filter_map(|(section, props)| section_item(section, props))
            .collect();
        Ok(vec![branch])
    }

    fn emit_plain(&self, branches: &[Branch]) -> Result<Vec<u8>> {
        let mut document = Ini::new();
        for branch in branches {
            write_branch(branch, &mut document)?;
        }
        render(&document)
    }

    fn emit_encrypted(&self, tree: &Tree) -> Result<Vec<u8>> {
        let mut document = Ini::new();
        for branch in &tree.branches {
            write_branch(branch, &mut document)?;
        }
        for (key, value) in flatten_metadata(&tree.metadata)? {
            document.with_section(Some(INI_METADATA_SECTION)).set(key, value);
        }
        render(&document)
    }
}

fn parse(bytes: &[u8]) -> Result<Ini> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| SopsError::Parse("ini input is not valid UTF-8".into()))?;
    Ini::load_from_str(text).map_err(|e| SopsError::Parse(format!("invalid ini: {e}")))
}

fn section_item(section: Option<&str>, props: &ini::Properties) -> Option<TreeItem> {
    if section.is_none() && props.iter().next().is_none() {
        return None;
    }
    let entries = props
        .iter()
        .map(|(key, value)| TreeItem::entry(key, TreeValue::Str(value.to_owned())))
        .collect();
    Some(TreeItem::entry(
        section.unwrap_or(INI_DEFAULT_SECTION),
        TreeValue::Branch(entries),
    ))
}

fn write_branch(branch: &Branch, document: &mut Ini) -> Result<()> {
    for item in branch {
        let TreeItem::Entry { key, value } = item else {
            continue;
        };
        match value {
            TreeValue::Branch(entries) => {
                let section = (key != INI_DEFAULT_SECTION).then_some(key.as_str());
                for entry in entries {
                    if let TreeItem::Entry { key, value } = entry {
                        let value = scalar(key, value)?;
                        document.with_section(section).set(key.as_str(), value);
                    }
                }
            }
            other => {
                let value = scalar(key, other)?;
                document.with_general_section().set(key.as_str(), value);
            }
        }
    }
    Ok(())
}

fn scalar(key: &str, value: &TreeValue) -> Result<String> {
    match value {
        TreeValue::Sequence(_) | TreeValue::Branch(_) => Err(SopsError::Emit(format!(
            "ini value for {key:?} must be a scalar"
        ))),
        other => Ok(other.to_plain_string()),
    }
}

fn render(document: &Ini) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    document
        .write_to(&mut out)
        .map_err(|e| SopsError::Emit(e.to_string()))?;
    Ok(out)
}
