// src/crypto/cipher.rs
//! AES256_GCM leaf cipher
//!
//! Encrypted leaves are self-describing strings:
//! `ENC[AES256_GCM,data:<b64>,iv:<b64>,tag:<b64>,type:<str|int|float|bool|bytes|comment>]`
//! The IV is 32 bytes and the tag is stored apart from the ciphertext.
//! Everything here works on in-memory buffers; no I/O.

use aes_gcm::aead::consts::U32;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::aliases::DataKey;
use crate::consts::{CIPHER_NAME, IV_LEN, TAG_LEN};
use crate::enums::LeafType;
use crate::error::{Result, SopsError};
use crate::tree::{format_float, TreeValue};

type Aes256Gcm32 = AesGcm<Aes256, U32>;

/// A decrypted leaf plus the bytes it contributes to the MAC
#[derive(Debug, Clone, PartialEq)]
pub struct DecryptedLeaf {
    pub value: TreeValue,
    /// `None` for comments, which are never authenticated
    pub auth_fragment: Option<Vec<u8>>,
}

impl DecryptedLeaf {
    fn new(value: TreeValue) -> Self {
        let auth_fragment = value.mac_bytes();
        Self {
            value,
            auth_fragment,
        }
    }
}

/// Symmetric authenticated encryption of individual leaves
pub trait CipherAdapter: Send + Sync {
    fn decrypt_leaf(
        &self,
        ciphertext: &str,
        key: &DataKey,
        additional_data: &str,
    ) -> Result<DecryptedLeaf>;

    /// Decrypt a stored authentication tag (the sealed MAC). The plaintext
    /// must be a string.
    fn decrypt_tag(&self, tag: &str, key: &DataKey, context: &str) -> Result<String> {
        match self.decrypt_leaf(tag, key, context)?.value {
            TreeValue::Str(s) => Ok(s),
            other => Err(SopsError::Cipher(format!(
                "stored mac has unexpected type {}",
                type_name(&other)
            ))),
        }
    }

    fn encrypt_leaf(&self, value: &TreeValue, key: &DataKey, additional_data: &str)
        -> Result<String>;
}

/// The envelope format's only cipher
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCipher;

impl AesGcmCipher {
    pub fn new() -> Self {
        Self
    }

    fn aead(key: &DataKey) -> Result<Aes256Gcm32> {
        Aes256Gcm32::new_from_slice(key.expose_secret())
            .map_err(|_| SopsError::Cipher("data key must be 32 bytes".into()))
    }
}

impl CipherAdapter for AesGcmCipher {
    fn decrypt_leaf(
        &self,
        ciphertext: &str,
        key: &DataKey,
        additional_data: &str,
    ) -> Result<DecryptedLeaf> {
        if ciphertext.is_empty() {
            return Ok(DecryptedLeaf::new(TreeValue::Str(String::new())));
        }

        let encrypted = EncryptedValue::parse(ciphertext)?;
        let mut sealed = encrypted.data;
        sealed.extend_from_slice(&encrypted.tag);

        let plaintext = Self::aead(key)?
            .decrypt(
                Nonce::<U32>::from_slice(&encrypted.iv),
                Payload {
                    msg: &sealed,
                    aad: additional_data.as_bytes(),
                },
            )
            .map_err(|_| SopsError::Cipher("authentication failed (wrong key or tampered data)".into()))?;

        let value = match encrypted.leaf_type {
            LeafType::Str => TreeValue::Str(utf8(plaintext)?),
            LeafType::Comment => TreeValue::Comment(utf8(plaintext)?),
            LeafType::Bytes => TreeValue::Bytes(plaintext),
            LeafType::Int => {
                let text = utf8(plaintext)?;
                TreeValue::Int(
                    text.parse()
                        .map_err(|e| SopsError::Cipher(format!("invalid int plaintext: {e}")))?,
                )
            }
            LeafType::Float => {
                let text = utf8(plaintext)?;
                TreeValue::Float(
                    text.parse()
                        .map_err(|e| SopsError::Cipher(format!("invalid float plaintext: {e}")))?,
                )
            }
            LeafType::Bool => TreeValue::Bool(parse_bool(&utf8(plaintext)?)?),
        };
        Ok(DecryptedLeaf::new(value))
    }

    fn encrypt_leaf(
        &self,
        value: &TreeValue,
        key: &DataKey,
        additional_data: &str,
    ) -> Result<String> {
        let (plaintext, leaf_type) = match value {
            TreeValue::Str(s) if s.is_empty() => return Ok(String::new()),
            TreeValue::Str(s) => (s.as_bytes().to_vec(), LeafType::Str),
            TreeValue::Comment(c) => (c.as_bytes().to_vec(), LeafType::Comment),
            TreeValue::Int(i) => (i.to_string().into_bytes(), LeafType::Int),
            TreeValue::Float(f) => (format_float(*f).into_bytes(), LeafType::Float),
            TreeValue::Bool(b) => (b.to_string().into_bytes(), LeafType::Bool),
            TreeValue::Bytes(b) => (b.clone(), LeafType::Bytes),
            other => {
                return Err(SopsError::Cipher(format!(
                    "cannot encrypt a {} value",
                    type_name(other)
                )))
            }
        };

        let iv: [u8; IV_LEN] = rand::random();
        let mut sealed = Self::aead(key)?
            .encrypt(
                Nonce::<U32>::from_slice(&iv),
                Payload {
                    msg: &plaintext,
                    aad: additional_data.as_bytes(),
                },
            )
            .map_err(|_| SopsError::Cipher("encryption failed".into()))?;
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(format!(
            "ENC[{CIPHER_NAME},data:{},iv:{},tag:{},type:{}]",
            STANDARD.encode(&sealed),
            STANDARD.encode(iv),
            STANDARD.encode(&tag),
            leaf_type.as_str()
        ))
    }
}

/// Parsed fields of an `ENC[...]` string
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptedValue {
    pub data: Vec<u8>,
    pub iv: Vec<u8>,
    pub tag: Vec<u8>,
    pub leaf_type: LeafType,
}

impl EncryptedValue {
    pub fn parse(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix("ENC[")
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| SopsError::Cipher("input string is not an encrypted value".into()))?;

        let mut fields = body.split(',');
        let cipher = fields.next().unwrap_or_default();
        if cipher != CIPHER_NAME {
            return Err(SopsError::Cipher(format!("unsupported cipher {cipher:?}")));
        }

        let data = field(fields.next(), "data")?;
        let iv = field(fields.next(), "iv")?;
        let tag = field(fields.next(), "tag")?;
        let leaf_type: LeafType = field_str(fields.next(), "type")?.parse()?;
        if fields.next().is_some() {
            return Err(SopsError::Cipher("trailing fields in encrypted value".into()));
        }

        if iv.len() != IV_LEN {
            return Err(SopsError::Cipher(format!(
                "iv must be {IV_LEN} bytes, got {}",
                iv.len()
            )));
        }
        if tag.len() != TAG_LEN {
            return Err(SopsError::Cipher(format!(
                "tag must be {TAG_LEN} bytes, got {}",
                tag.len()
            )));
        }

        Ok(Self {
            data,
            iv,
            tag,
            leaf_type,
        })
    }
}

fn field_str<'a>(raw: Option<&'a str>, name: &str) -> Result<&'a str> {
    raw.and_then(|f| f.strip_prefix(name))
        .and_then(|f| f.strip_prefix(':'))
        .ok_or_else(|| SopsError::Cipher(format!("missing {name} field in encrypted value")))
}

fn field(raw: Option<&str>, name: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(field_str(raw, name)?)
        .map_err(|e| SopsError::Cipher(format!("invalid base64 in {name}: {e}")))
}

fn utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| SopsError::Cipher("plaintext is not valid UTF-8".into()))
}

/// Accepts the same spellings as the encryption tool's bool parser.
fn parse_bool(s: &str) -> Result<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        other => Err(SopsError::Cipher(format!("invalid bool plaintext {other:?}"))),
    }
}

fn type_name(value: &TreeValue) -> &'static str {
    match value {
        TreeValue::Null => "null",
        TreeValue::Bool(_) => "bool",
        TreeValue::Int(_) => "int",
        TreeValue::Float(_) => "float",
        TreeValue::Str(_) => "str",
        TreeValue::Bytes(_) => "bytes",
        TreeValue::Comment(_) => "comment",
        TreeValue::Sequence(_) => "sequence",
        TreeValue::Branch(_) => "branch",
    }
}
