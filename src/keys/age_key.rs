// src/keys/age_key.rs
//! age (x25519) wrapped data keys
//!
//! Identities are read on every call from, in order: the inline key env
//! var, the file named by the key-file env var, the configured key file and
//! the default `<config dir>/sops/age/keys.txt`. Nothing is cached.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ::age::armor::{ArmoredReader, ArmoredWriter, Format};
use ::age::x25519;
use serde_json::Value;
use tracing::debug;

use super::KeySource;
use crate::aliases::{data_key_from_slice, DataKey};
use crate::config::KeysConfig;
use crate::consts::AGE_DEFAULT_KEY_FILE;
use crate::error::KeySourceError;
use crate::metadata::{KeyEntry, KeyKind, Metadata};

type KeyResult<T> = std::result::Result<T, KeySourceError>;

const SECRET_KEY_PREFIX: &str = "AGE-SECRET-KEY-";

pub struct AgeKeySource {
    config: Option<KeysConfig>,
    identities: Vec<x25519::Identity>,
}

impl AgeKeySource {
    /// Look identities up in the environment and key files on each call.
    pub fn new(config: KeysConfig) -> Self {
        Self {
            config: Some(config),
            identities: Vec::new(),
        }
    }

    /// Use exactly these identities and nothing else.
    pub fn with_identities(identities: Vec<x25519::Identity>) -> Self {
        Self {
            config: None,
            identities,
        }
    }

    /// Wrap `key` for `recipient`, producing a metadata entry
    /// `{"recipient": ..., "enc": <armored age file>}`.
    pub fn wrap_data_key(key: &DataKey, recipient: &x25519::Recipient) -> KeyResult<KeyEntry> {
        let recipients: Vec<Box<dyn ::age::Recipient + Send>> = vec![Box::new(recipient.clone())];
        let encryptor = ::age::Encryptor::with_recipients(recipients)
            .ok_or_else(|| KeySourceError::Unwrap("no age recipients".into()))?;

        let mut armored = Vec::new();
        let armor = ArmoredWriter::wrap_output(&mut armored, Format::AsciiArmor)?;
        let mut writer = encryptor
            .wrap_output(armor)
            .map_err(|e| KeySourceError::Unwrap(e.to_string()))?;
        writer.write_all(key.expose_secret())?;
        writer.finish().and_then(|armor| armor.finish())?;

        let enc = String::from_utf8(armored)
            .map_err(|_| KeySourceError::Unwrap("age armor is not valid UTF-8".into()))?;

        let mut entry = KeyEntry::new();
        entry.insert("recipient".into(), Value::String(recipient.to_string()));
        entry.insert("enc".into(), Value::String(enc));
        Ok(entry)
    }

    fn load_identities(&self) -> KeyResult<Vec<x25519::Identity>> {
        let Some(config) = &self.config else {
            return Ok(self.identities.clone());
        };

        let mut identities = self.identities.clone();
        if let Ok(inline) = std::env::var(&config.age_key_env) {
            identities.extend(parse_identities(&inline)?);
        }
        if let Ok(path) = std::env::var(&config.age_key_file_env) {
            identities.extend(read_identity_file(Path::new(&path))?);
        }
        if let Some(path) = &config.age_key_file {
            identities.extend(read_identity_file(path)?);
        }
        if let Some(path) = default_key_file() {
            if path.exists() {
                identities.extend(read_identity_file(&path)?);
            }
        }
        Ok(identities)
    }
}

impl KeySource for AgeKeySource {
    fn name(&self) -> &'static str {
        KeyKind::Age.as_str()
    }

    fn resolve(&self, metadata: &Metadata) -> KeyResult<DataKey> {
        let descriptors = metadata.descriptors_of(KeyKind::Age);
        if descriptors.is_empty() {
            return Err(KeySourceError::NotApplicable(KeyKind::Age.as_str()));
        }

        let identities = self.load_identities()?;
        if identities.is_empty() {
            return Err(KeySourceError::NoIdentities);
        }

        let mut failures = Vec::new();
        for descriptor in descriptors {
            let recipient = descriptor.identifier();
            let Some(enc) = descriptor.enc() else {
                failures.push(format!("{recipient}: missing enc"));
                continue;
            };
            match unwrap(enc, &identities) {
                Ok(key) => {
                    debug!(recipient, "unwrapped data key with age");
                    return Ok(key);
                }
                Err(e) => failures.push(format!("{recipient}: {e}")),
            }
        }
        Err(KeySourceError::Unwrap(failures.join(", ")))
    }
}

fn unwrap(enc: &str, identities: &[x25519::Identity]) -> KeyResult<DataKey> {
    let decryptor = ::age::Decryptor::new(ArmoredReader::new(enc.as_bytes()))
        .map_err(|e| KeySourceError::Unwrap(e.to_string()))?;
    let decryptor = match decryptor {
        ::age::Decryptor::Recipients(d) => d,
        _ => {
            return Err(KeySourceError::Unwrap(
                "passphrase-wrapped keys are not supported".into(),
            ))
        }
    };

    let mut reader = decryptor
        .decrypt(identities.iter().map(|i| i as &dyn ::age::Identity))
        .map_err(|e| KeySourceError::Unwrap(e.to_string()))?;
    let mut plaintext = Vec::new();
    reader.read_to_end(&mut plaintext)?;

    data_key_from_slice(&plaintext)
        .ok_or_else(|| KeySourceError::Unwrap("unwrapped data key must be 32 bytes".into()))
}

/// Parse identity lines; blank lines and `#` comments are skipped.
pub fn parse_identities(text: &str) -> KeyResult<Vec<x25519::Identity>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            if !line.starts_with(SECRET_KEY_PREFIX) {
                return Err(KeySourceError::Unwrap("malformed age identity".into()));
            }
            x25519::Identity::from_str(line)
                .map_err(|e| KeySourceError::Unwrap(format!("malformed age identity: {e}")))
        })
        .collect()
}

fn read_identity_file(path: &Path) -> KeyResult<Vec<x25519::Identity>> {
    let text = std::fs::read_to_string(path)?;
    parse_identities(&text)
}

fn default_key_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(AGE_DEFAULT_KEY_FILE))
}
