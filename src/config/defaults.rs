// src/config/defaults.rs
use crate::config::app::{DecryptDefaults, JsonStoreConfig, KeysConfig, StoresConfig};
use crate::consts::{AGE_KEY_ENV, AGE_KEY_FILE_ENV};

pub fn default_stores() -> StoresConfig {
    StoresConfig {
        json: JsonStoreConfig { indent: None },
    }
}

pub fn default_keys() -> KeysConfig {
    KeysConfig {
        age_key_file: None,
        age_key_env: default_age_key_env(),
        age_key_file_env: default_age_key_file_env(),
    }
}

pub fn default_decrypt() -> DecryptDefaults {
    DecryptDefaults {
        ignore_mac_mismatch: false,
    }
}

pub fn default_age_key_env() -> String {
    AGE_KEY_ENV.into()
}

pub fn default_age_key_file_env() -> String {
    AGE_KEY_FILE_ENV.into()
}
