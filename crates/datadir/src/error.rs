use std::path::PathBuf;

use thiserror::Error;

use atlas_catalog::CatalogError;

/// Errors produced by the data-directory loader, persisters and codec.
#[derive(Debug, Error)]
pub enum DataDirError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The loader requires direct filesystem access; anything else is a
    /// structural misconfiguration and fails fast at construction.
    #[error("data directory root '{0}' does not exist or is not a directory")]
    NotADirectory(PathBuf),

    #[error(
        "all rename targets between {base}1.{extension} and {base}{attempts}.{extension} \
         are in use already, giving up"
    )]
    RenameExhausted {
        base: String,
        extension: String,
        attempts: u32,
    },

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("service loader '{0}' failed: {1}")]
    Service(String, String),
}

impl DataDirError {
    /// Wrap into a [`CatalogError`] for re-raising out of a listener, so a
    /// disk failure surfaces to whoever triggered the catalog mutation.
    pub fn into_catalog(self) -> CatalogError {
        match self {
            DataDirError::Catalog(e) => e,
            other => CatalogError::Persist(other.to_string()),
        }
    }
}
