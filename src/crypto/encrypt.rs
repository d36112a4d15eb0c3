// src/crypto/encrypt.rs
use tracing::debug;

use super::cipher::CipherAdapter;
use super::mac::MacAccumulator;
use crate::aliases::DataKey;
use crate::error::Result;
use crate::metadata::Metadata;
use crate::tree::{path_additional_data, Tree, TreeValue};

/// Encrypt every selected leaf in place and return the MAC of the plaintext
/// tree. Mirror image of `decrypt_tree`.
pub fn encrypt_tree<C>(tree: &mut Tree, key: &DataKey, cipher: &C) -> Result<String>
where
    C: CipherAdapter + ?Sized,
{
    debug!("encrypting tree");
    let rule = tree.metadata.encryption_rule()?;
    let mac_only_encrypted = tree.metadata.mac_only_encrypted();
    let mut mac = MacAccumulator::new();

    tree.walk_leaves(|leaf, path| {
        let encrypted = rule.should_encrypt(path);
        if encrypted || !mac_only_encrypted {
            if let Some(bytes) = leaf.mac_bytes() {
                mac.update(&bytes);
            }
        }
        if !encrypted {
            return Ok(leaf);
        }

        let additional_data = path_additional_data(path);
        Ok(match leaf {
            TreeValue::Null => TreeValue::Null,
            TreeValue::Comment(_) => {
                TreeValue::Comment(cipher.encrypt_leaf(&leaf, key, &additional_data)?)
            }
            _ => TreeValue::Str(cipher.encrypt_leaf(&leaf, key, &additional_data)?),
        })
    })?;

    Ok(mac.finish())
}

/// Seal `mac` into the metadata, bound to its last-modified timestamp.
pub fn seal_mac<C>(metadata: &mut Metadata, mac: &str, key: &DataKey, cipher: &C) -> Result<()>
where
    C: CipherAdapter + ?Sized,
{
    let context = metadata.mac_context()?;
    metadata.mac = cipher.encrypt_leaf(&TreeValue::Str(mac.to_owned()), key, &context)?;
    Ok(())
}
