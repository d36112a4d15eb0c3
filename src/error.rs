// src/error.rs
//! Public error types for the entire crate
//!
//! `SopsError` covers every pipeline stage. `FunctionError` is what the
//! host-facing functions return: it adds the user-visible stage prefix and
//! its Display output is the message a host surfaces verbatim.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SopsError>;

#[derive(Error, Debug)]
pub enum SopsError {
    /// Unsupported or unknown format tag.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The envelope could not be parsed into a tree and metadata.
    #[error("failed to load encrypted document: {0}")]
    Parse(String),

    /// No configured key source could unwrap the data key.
    #[error("failed to get the data key: {0}")]
    KeyResolution(String),

    /// A leaf (or the stored MAC) failed to decrypt.
    #[error("could not decrypt value: {0}")]
    Cipher(String),

    /// The recomputed MAC does not match the stored one.
    #[error("failed to verify data integrity. expected mac {expected:?}, got {computed:?}")]
    Integrity { expected: String, computed: String },

    /// Canonical JSON that could not be classified.
    #[error("{0}")]
    Decode(String),

    /// Decrypted bytes that the format adapter could not normalize.
    #[error("{0}")]
    Unmarshal(String),

    /// A tree that could not be written back to its native syntax.
    #[error("failed to emit document: {0}")]
    Emit(String),

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Why a single key source could not produce the data key.
#[derive(Error, Debug)]
pub enum KeySourceError {
    /// The envelope carries no descriptor this source understands.
    #[error("no {0} key in metadata")]
    NotApplicable(&'static str),

    #[error("no identities available")]
    NoIdentities,

    #[error("{0}")]
    Unwrap(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Errors rendered by the host-facing decrypt functions.
#[derive(Error, Debug)]
pub enum FunctionError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("failed to decrypt file: {0}")]
    Decrypt(#[source] SopsError),

    #[error("failed to unmarshal decrypted data: {0}")]
    Unmarshal(#[source] SopsError),

    #[error("failed to convert decrypted data to dynamic data: {0}")]
    Convert(#[source] SopsError),
}

impl FunctionError {
    /// The underlying pipeline error, if any.
    pub fn pipeline_error(&self) -> Option<&SopsError> {
        match self {
            FunctionError::InvalidFormat(_) => None,
            FunctionError::Decrypt(e) | FunctionError::Unmarshal(e) | FunctionError::Convert(e) => {
                Some(e)
            }
        }
    }
}
