// src/metadata.rs
//! The `sops` metadata block carried by every envelope
//!
//! Wrapped data-key descriptors are kept as loose JSON objects: the only
//! fields this crate needs from them are an identifier and the `enc` blob,
//! and everything else must survive a load/emit cycle untouched.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts::DEFAULT_UNENCRYPTED_SUFFIX;
use crate::error::{Result, SopsError};

/// One wrapped data key, e.g. `{"recipient": "age1...", "enc": "..."}`
pub type KeyEntry = Map<String, Value>;

/// Backend that wrapped a data key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Age,
    Pgp,
    Kms,
    GcpKms,
    AzureKv,
    HcVault,
}

impl KeyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyKind::Age => "age",
            KeyKind::Pgp => "pgp",
            KeyKind::Kms => "kms",
            KeyKind::GcpKms => "gcp_kms",
            KeyKind::AzureKv => "azure_kv",
            KeyKind::HcVault => "hc_vault",
        }
    }

    fn identifier_field(self) -> &'static str {
        match self {
            KeyKind::Age => "recipient",
            KeyKind::Pgp => "fp",
            KeyKind::Kms => "arn",
            KeyKind::GcpKms => "resource_id",
            KeyKind::AzureKv => "vault_url",
            KeyKind::HcVault => "vault_address",
        }
    }
}

/// Borrowed view of one wrapped data key
#[derive(Debug, Clone, Copy)]
pub struct KeyDescriptor<'a> {
    pub kind: KeyKind,
    pub entry: &'a KeyEntry,
}

impl<'a> KeyDescriptor<'a> {
    pub fn identifier(&self) -> &'a str {
        self.field(self.kind.identifier_field()).unwrap_or("")
    }

    /// The wrapped data key blob.
    pub fn enc(&self) -> Option<&'a str> {
        self.field("enc")
    }

    fn field(&self, name: &str) -> Option<&'a str> {
        self.entry.get(name).and_then(Value::as_str)
    }
}

/// A set of master keys, any one of which can unwrap the data key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms: Option<Vec<KeyEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp_kms: Option<Vec<KeyEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_kv: Option<Vec<KeyEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hc_vault: Option<Vec<KeyEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Vec<KeyEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pgp: Option<Vec<KeyEntry>>,
}

impl KeyGroup {
    pub fn descriptors(&self) -> Vec<KeyDescriptor<'_>> {
        collect_descriptors([
            (KeyKind::Kms, &self.kms),
            (KeyKind::GcpKms, &self.gcp_kms),
            (KeyKind::AzureKv, &self.azure_kv),
            (KeyKind::HcVault, &self.hc_vault),
            (KeyKind::Age, &self.age),
            (KeyKind::Pgp, &self.pgp),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shamir_threshold: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_groups: Option<Vec<KeyGroup>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms: Option<Vec<KeyEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp_kms: Option<Vec<KeyEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_kv: Option<Vec<KeyEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hc_vault: Option<Vec<KeyEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Vec<KeyEntry>>,
    #[serde(default)]
    pub lastmodified: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pgp: Option<Vec<KeyEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unencrypted_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unencrypted_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_only_encrypted: Option<bool>,
    #[serde(default)]
    pub version: String,
}

impl Metadata {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| SopsError::Parse(format!("invalid sops metadata: {e}")))
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| SopsError::Emit(format!("sops metadata: {e}")))
    }

    /// Key groups in unwrap order. Top-level key lists form an implicit
    /// single group.
    pub fn key_groups(&self) -> Vec<Vec<KeyDescriptor<'_>>> {
        match &self.key_groups {
            Some(groups) if !groups.is_empty() => groups.iter().map(KeyGroup::descriptors).collect(),
            _ => vec![collect_descriptors([
                (KeyKind::Kms, &self.kms),
                (KeyKind::GcpKms, &self.gcp_kms),
                (KeyKind::AzureKv, &self.azure_kv),
                (KeyKind::HcVault, &self.hc_vault),
                (KeyKind::Age, &self.age),
                (KeyKind::Pgp, &self.pgp),
            ])],
        }
    }

    /// Every descriptor of `kind`, across all groups.
    pub fn descriptors_of(&self, kind: KeyKind) -> Vec<KeyDescriptor<'_>> {
        self.key_groups()
            .into_iter()
            .flatten()
            .filter(|d| d.kind == kind)
            .collect()
    }

    pub fn last_modified(&self) -> Result<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.lastmodified).map_err(|e| {
            SopsError::Parse(format!("invalid lastmodified {:?}: {e}", self.lastmodified))
        })
    }

    /// Additional data the MAC is sealed with: the last-modified timestamp
    /// rendered as RFC 3339 with whole seconds and `Z` for UTC.
    pub fn mac_context(&self) -> Result<String> {
        Ok(self
            .last_modified()?
            .to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn stamp(&mut self, now: DateTime<Utc>) {
        self.lastmodified = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    }

    pub fn mac_only_encrypted(&self) -> bool {
        self.mac_only_encrypted.unwrap_or(false)
    }

    pub fn has_encryption_rule(&self) -> bool {
        self.unencrypted_suffix.is_some()
            || self.encrypted_suffix.is_some()
            || self.unencrypted_regex.is_some()
            || self.encrypted_regex.is_some()
    }

    /// The rule selecting which leaves are encrypted.
    pub fn encryption_rule(&self) -> Result<EncryptionRule> {
        let declared = [
            self.unencrypted_suffix.is_some(),
            self.encrypted_suffix.is_some(),
            self.unencrypted_regex.is_some(),
            self.encrypted_regex.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();
        if declared > 1 {
            return Err(SopsError::Parse(
                "cannot use more than one of encrypted_suffix, unencrypted_suffix, \
                 encrypted_regex or unencrypted_regex in the same document"
                    .into(),
            ));
        }

        if let Some(suffix) = &self.unencrypted_suffix {
            return Ok(EncryptionRule::UnencryptedSuffix(suffix.clone()));
        }
        if let Some(suffix) = &self.encrypted_suffix {
            return Ok(EncryptionRule::EncryptedSuffix(suffix.clone()));
        }
        if let Some(pattern) = &self.unencrypted_regex {
            return Ok(EncryptionRule::UnencryptedRegex(compile(pattern)?));
        }
        if let Some(pattern) = &self.encrypted_regex {
            return Ok(EncryptionRule::EncryptedRegex(compile(pattern)?));
        }
        Ok(EncryptionRule::UnencryptedSuffix(
            DEFAULT_UNENCRYPTED_SUFFIX.to_owned(),
        ))
    }
}

/// Decides per leaf path whether the leaf is encrypted
#[derive(Debug, Clone)]
pub enum EncryptionRule {
    UnencryptedSuffix(String),
    EncryptedSuffix(String),
    UnencryptedRegex(Regex),
    EncryptedRegex(Regex),
}

impl EncryptionRule {
    pub fn should_encrypt(&self, path: &[String]) -> bool {
        match self {
            EncryptionRule::UnencryptedSuffix(s) => !path.iter().any(|k| k.ends_with(s.as_str())),
            EncryptionRule::EncryptedSuffix(s) => path.iter().any(|k| k.ends_with(s.as_str())),
            EncryptionRule::UnencryptedRegex(re) => !path.iter().any(|k| re.is_match(k)),
            EncryptionRule::EncryptedRegex(re) => path.iter().any(|k| re.is_match(k)),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| SopsError::Parse(format!("invalid regex {pattern:?}: {e}")))
}

fn collect_descriptors<'a, const N: usize>(
    lists: [(KeyKind, &'a Option<Vec<KeyEntry>>); N],
) -> Vec<KeyDescriptor<'a>> {
    lists
        .into_iter()
        .flat_map(|(kind, entries)| {
            entries
                .iter()
                .flatten()
                .map(move |entry| KeyDescriptor { kind, entry })
        })
        .collect()
}
