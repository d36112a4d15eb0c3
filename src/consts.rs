// src/consts.rs
//! Shared constants: wire format, metadata keys and defaults

/// Cipher tag inside every encrypted leaf: `ENC[AES256_GCM,...]`
pub const CIPHER_NAME: &str = "AES256_GCM";

/// AES-256 key length in bytes
pub const DATA_KEY_LEN: usize = 32;

/// IV length used by the envelope format (not the usual 12)
pub const IV_LEN: usize = 32;

/// GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Top-level key (json/yaml/binary) holding the metadata block
pub const METADATA_KEY: &str = "sops";

/// Prefix for flattened metadata keys in dotenv files
pub const DOTENV_METADATA_PREFIX: &str = "sops_";

/// INI section holding flattened metadata
pub const INI_METADATA_SECTION: &str = "sops";

/// Branch name for INI keys that live outside any section
pub const INI_DEFAULT_SECTION: &str = "DEFAULT";

/// Only leaf in a binary envelope
pub const BINARY_DATA_KEY: &str = "data";

/// Suffix rule applied when a document declares no encryption rule
pub const DEFAULT_UNENCRYPTED_SUFFIX: &str = "_unencrypted";

/// Environment variable naming the TOML config file
pub const CONFIG_PATH_ENV: &str = "SOPS_ENVELOPE_CONFIG";

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "sops-envelope.toml";

/// Environment variable holding age identities inline
pub const AGE_KEY_ENV: &str = "SOPS_AGE_KEY";

/// Environment variable naming an age identity file
pub const AGE_KEY_FILE_ENV: &str = "SOPS_AGE_KEY_FILE";

/// Default age identity file, relative to the user config directory
pub const AGE_DEFAULT_KEY_FILE: &str = "sops/age/keys.txt";

/// Version stamped into newly sealed envelopes when the template has none
pub const ENVELOPE_VERSION: &str = "3.9.0";
