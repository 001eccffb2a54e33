//! Connection-password decryption seam.
//!
//! Store connection parameters may carry encrypted passwords, written as
//! `crypt1:<payload>`. Decryption is deferred until after the parallel load
//! completes because decryptor backends are not guaranteed to be thread-safe;
//! the orchestrator walks the loaded stores on a single thread.

use std::collections::BTreeMap;

use crate::error::DataDirError;

/// Prefix marking an encrypted connection-parameter value.
pub const ENCRYPTED_PREFIX: &str = "crypt1:";

pub trait Decryptor: Send + Sync {
    /// Decrypt one `crypt1:`-prefixed value (prefix included).
    fn decrypt(&self, value: &str) -> Result<String, DataDirError>;
}

/// Decryptor used when no security subsystem is wired in: strips the prefix
/// and returns the payload as-is.
#[derive(Debug, Default)]
pub struct PassthroughDecryptor;

impl Decryptor for PassthroughDecryptor {
    fn decrypt(&self, value: &str) -> Result<String, DataDirError> {
        Ok(value.strip_prefix(ENCRYPTED_PREFIX).unwrap_or(value).to_string())
    }
}

/// Decrypt every encrypted value in a store's connection parameters in
/// place. Returns whether anything changed, so callers skip the in-memory
/// refresh for stores with plaintext parameters.
pub fn decrypt_parameters(
    params: &mut BTreeMap<String, String>,
    decryptor: &dyn Decryptor,
) -> Result<bool, DataDirError> {
    let mut changed = false;
    for value in params.values_mut() {
        if value.starts_with(ENCRYPTED_PREFIX) {
            *value = decryptor.decrypt(value)?;
            changed = true;
        }
    }
    Ok(changed)
}
