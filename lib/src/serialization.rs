//! Serialization of fitted parameters.
//!
//! Fitted artifacts (the boosted model, the category encoder) are reduced to
//! plain data structures and written with bincode. Saving always replaces the
//! previous file as a whole.

use crate::error::{ErrorKind, PipelineError, Result};
use std::error::Error;
use std::path::Path;

/// A parameter representation that can be serialized to and from bytes.
///
/// Implementors should contain only plain data (vectors, scalars, strings).
pub trait SerializableParams: Sized {
    /// The error type returned during (de)serialization.
    type Error: Error + Send + Sync + 'static;

    fn to_bytes(&self) -> std::result::Result<Vec<u8>, Self::Error>;

    fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, Self::Error>;
}

impl<T> SerializableParams for T
where
    T: serde::Serialize + for<'de> serde::Deserialize<'de>,
{
    type Error = bincode::Error;

    fn to_bytes(&self) -> std::result::Result<Vec<u8>, Self::Error> {
        bincode::serialize(self)
    }

    fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, Self::Error> {
        bincode::deserialize(bytes)
    }
}

/// Write parameters to `path`, creating parent directories and replacing any
/// existing file.
pub fn save_params<T: SerializableParams, P: AsRef<Path>>(params: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            PipelineError::with_source(
                ErrorKind::Io,
                format!("cannot create directory {}", parent.display()),
                e,
            )
        })?;
    }
    let bytes = params
        .to_bytes()
        .map_err(|e| PipelineError::with_source(ErrorKind::Io, "cannot serialize parameters", e))?;
    std::fs::write(path, bytes).map_err(|e| {
        PipelineError::with_source(
            ErrorKind::Io,
            format!("cannot write {}", path.display()),
            e,
        )
    })
}

pub fn load_params<T: SerializableParams, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        PipelineError::with_source(
            ErrorKind::Io,
            format!("cannot read {}", path.display()),
            e,
        )
    })?;
    T::from_bytes(&bytes).map_err(|e| {
        PipelineError::with_source(
            ErrorKind::Io,
            format!("cannot deserialize {}", path.display()),
            e,
        )
    })
}
