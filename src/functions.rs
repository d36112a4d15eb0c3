// src/functions.rs
//! Host-facing decrypt functions
//!
//! `file`, `file_ignore_mac`, `string` and `string_ignore_mac` each return
//! the raw cleartext plus its inferred value tree. Failures carry the stage
//! they happened in; their Display text is what a host shows the user.

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::aliases::Cleartext;
use crate::config::Config;
use crate::engine::{DecryptOptions, DecryptionEngine};
use crate::enums::Format;
use crate::error::{FunctionError, SopsError};
use crate::formats::to_canonical_json;
use crate::inference::{infer, DynamicValue};

type FunctionResult<T> = std::result::Result<T, FunctionError>;

/// Result of a successful decrypt call
pub struct Decrypted {
    pub raw: Cleartext,
    /// `Null` for binary documents
    pub data: DynamicValue,
}

impl fmt::Debug for Decrypted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decrypted")
            .field("raw", &"[REDACTED]")
            .field("ty", &self.data.ty)
            .finish_non_exhaustive()
    }
}

pub struct SopsFunctions {
    engine: DecryptionEngine,
}

impl SopsFunctions {
    pub fn new(engine: DecryptionEngine) -> Self {
        Self { engine }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(DecryptionEngine::from_config(config))
    }

    pub fn engine(&self) -> &DecryptionEngine {
        &self.engine
    }

    /// Decrypt a file. Without a format, it is inferred from the path.
    pub fn file<P: AsRef<Path>>(&self, path: P, format: Option<&str>) -> FunctionResult<Decrypted> {
        self.run_file(path.as_ref(), format, DecryptOptions::verified())
    }

    pub fn file_ignore_mac<P: AsRef<Path>>(
        &self,
        path: P,
        format: Option<&str>,
    ) -> FunctionResult<Decrypted> {
        self.run_file(path.as_ref(), format, DecryptOptions::ignoring_mac())
    }

    /// Decrypt an inline envelope. Without a format, it is binary.
    pub fn string(&self, data: &str, format: Option<&str>) -> FunctionResult<Decrypted> {
        let format = resolve_format(format, || Format::Binary)?;
        self.run(data.as_bytes(), format, DecryptOptions::verified())
    }

    pub fn string_ignore_mac(&self, data: &str, format: Option<&str>) -> FunctionResult<Decrypted> {
        let format = resolve_format(format, || Format::Binary)?;
        self.run(data.as_bytes(), format, DecryptOptions::ignoring_mac())
    }

    fn run_file(
        &self,
        path: &Path,
        format: Option<&str>,
        options: DecryptOptions,
    ) -> FunctionResult<Decrypted> {
        let format = resolve_format(format, || Format::from_path(path))?;
        let envelope = std::fs::read(path).map_err(|source| {
            FunctionError::Decrypt(SopsError::Read {
                path: path.to_path_buf(),
                source,
            })
        })?;
        self.run(&envelope, format, options)
    }

    fn run(
        &self,
        envelope: &[u8],
        format: Format,
        options: DecryptOptions,
    ) -> FunctionResult<Decrypted> {
        let raw = self
            .engine
            .decrypt(envelope, format, &options)
            .map_err(FunctionError::Decrypt)?;

        let canonical =
            to_canonical_json(raw.expose_secret(), format).map_err(FunctionError::Unmarshal)?;
        let data = infer(&canonical).map_err(FunctionError::Convert)?;

        debug!(%format, "decrypted document");
        Ok(Decrypted { raw, data })
    }
}

/// An explicit format wins; `None` or an empty string falls back.
/// Unknown names are rejected before anything is read.
pub fn resolve_format<F>(explicit: Option<&str>, fallback: F) -> FunctionResult<Format>
where
    F: FnOnce() -> Format,
{
    match explicit {
        Some(name) if !name.is_empty() => name
            .parse()
            .map_err(|_| FunctionError::InvalidFormat(name.to_owned())),
        _ => Ok(fallback()),
    }
}
