// src/enums.rs
//! Public enum types used throughout the crate
//!
//! Central location for the user-visible choices: document formats and the
//! value types an encrypted leaf can carry.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SopsError;

/// Native syntax of an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Yaml,
    Json,
    Dotenv,
    Ini,
    Binary,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Yaml,
        Format::Json,
        Format::Dotenv,
        Format::Ini,
        Format::Binary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Yaml => "yaml",
            Format::Json => "json",
            Format::Dotenv => "dotenv",
            Format::Ini => "ini",
            Format::Binary => "binary",
        }
    }

    /// Infer a format from the path suffix. Unknown suffixes are binary.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Format {
        let path = path.as_ref().to_string_lossy();
        if path.ends_with(".yaml") || path.ends_with(".yml") {
            Format::Yaml
        } else if path.ends_with(".json") {
            Format::Json
        } else if path.ends_with(".env") {
            Format::Dotenv
        } else if path.ends_with(".ini") {
            Format::Ini
        } else {
            Format::Binary
        }
    }

    /// True for every format that carries structured data.
    pub fn is_structured(self) -> bool {
        !matches!(self, Format::Binary)
    }
}

impl FromStr for Format {
    type Err = SopsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| SopsError::InvalidFormat(s.to_owned()))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `type:` field of an encrypted leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafType {
    Str,
    Int,
    Float,
    Bool,
    Bytes,
    Comment,
}

impl LeafType {
    pub fn as_str(self) -> &'static str {
        match self {
            LeafType::Str => "str",
            LeafType::Int => "int",
            LeafType::Float => "float",
            LeafType::Bool => "bool",
            LeafType::Bytes => "bytes",
            LeafType::Comment => "comment",
        }
    }
}

impl FromStr for LeafType {
    type Err = SopsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" => Ok(LeafType::Str),
            "int" => Ok(LeafType::Int),
            "float" => Ok(LeafType::Float),
            "bool" => Ok(LeafType::Bool),
            "bytes" => Ok(LeafType::Bytes),
            "comment" => Ok(LeafType::Comment),
            other => Err(SopsError::Cipher(format!("unknown leaf type {other:?}"))),
        }
    }
}
