// src/config/mod.rs
//! Configuration system for sops-envelope
//!
//! TOML file + built-in defaults. The loaded `Config` is passed explicitly
//! to whatever needs it; nothing is cached globally.

pub use app::{load, Config, DecryptDefaults, JsonStoreConfig, KeysConfig, StoresConfig};

mod app;
mod defaults;
