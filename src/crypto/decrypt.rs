// src/crypto/decrypt.rs
use tracing::{debug, warn};

use super::cipher::CipherAdapter;
use super::mac::MacAccumulator;
use crate::aliases::DataKey;
use crate::error::{Result, SopsError};
use crate::metadata::Metadata;
use crate::tree::{path_additional_data, Tree, TreeValue};

/// Decrypt every selected leaf in place and return the MAC of the cleartext
/// tree (uppercase hex SHA-512).
pub fn decrypt_tree<C>(tree: &mut Tree, key: &DataKey, cipher: &C) -> Result<String>
where
    C: CipherAdapter + ?Sized,
{
    debug!("decrypting tree");
    let rule = tree.metadata.encryption_rule()?;
    let mac_only_encrypted = tree.metadata.mac_only_encrypted();
    let mut mac = MacAccumulator::new();

    tree.walk_leaves(|leaf, path| {
        let encrypted = rule.should_encrypt(path);
        let (value, fragment) = if encrypted {
            decrypt_leaf(cipher, leaf, key, path)?
        } else {
            let fragment = leaf.mac_bytes();
            (leaf, fragment)
        };

        if encrypted || !mac_only_encrypted {
            if let Some(bytes) = fragment {
                mac.update(&bytes);
            }
        }
        Ok(value)
    })?;

    Ok(mac.finish())
}

fn decrypt_leaf<C>(
    cipher: &C,
    leaf: TreeValue,
    key: &DataKey,
    path: &[String],
) -> Result<(TreeValue, Option<Vec<u8>>)>
where
    C: CipherAdapter + ?Sized,
{
    let additional_data = path_additional_data(path);
    match leaf {
        TreeValue::Comment(text) => match cipher.decrypt_leaf(&text, key, &additional_data) {
            Ok(decrypted) => Ok((decrypted.value, None)),
            Err(_) => {
                // Older envelopes left comments in the clear.
                warn!(
                    path = %additional_data,
                    "found possibly unencrypted comment; keeping it unchanged"
                );
                Ok((TreeValue::Comment(text), None))
            }
        },
        TreeValue::Str(text) => {
            let decrypted = cipher
                .decrypt_leaf(&text, key, &additional_data)
                .map_err(|e| SopsError::Cipher(format!("{additional_data} {e}")))?;
            Ok((decrypted.value, decrypted.auth_fragment))
        }
        TreeValue::Null => Ok((TreeValue::Null, Some(Vec::new()))),
        _ => Err(SopsError::Cipher(format!(
            "{additional_data} expected an encrypted string"
        ))),
    }
}

/// Compare the computed MAC against the one sealed in the metadata.
pub fn verify_mac<C>(metadata: &Metadata, computed: &str, key: &DataKey, cipher: &C) -> Result<()>
where
    C: CipherAdapter + ?Sized,
{
    debug!("verifying mac");
    let context = metadata.mac_context()?;
    let expected = cipher
        .decrypt_tag(&metadata.mac, key, &context)
        .map_err(|e| SopsError::Cipher(format!("failed to decrypt original mac: {e}")))?;

    if expected != computed {
        return Err(SopsError::Integrity {
            expected,
            computed: computed.to_owned(),
        });
    }
    Ok(())
}
