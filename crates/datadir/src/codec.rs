//! Serialization of catalog and config entities to their on-disk files.
//!
//! Decoding is read-only and safe to run concurrently; the parallel loader
//! parses through plain shared references. Writes are another matter: codecs
//! grow configuration (alias tables, format migrations) that mutates on
//! save, so everything that encodes shares a single instance behind a mutex
//! and callers should not bake in the assumption that saving is lock-free.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DataDirError;
use crate::resource::Resource;

#[derive(Debug, Default, Clone)]
pub struct Codec;

impl Codec {
    pub fn new() -> Self {
        Self
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, DataDirError> {
        let mut bytes = serde_json::to_vec_pretty(value)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DataDirError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Decode the contents of `resource`.
    pub fn load<T: DeserializeOwned>(&self, resource: &Resource) -> Result<T, DataDirError> {
        self.decode(&resource.read()?)
    }

    /// Encode `value` and write it to `resource`, creating parents.
    pub fn save<T: Serialize>(&self, resource: &Resource, value: &T) -> Result<(), DataDirError> {
        resource.write(&self.encode(value)?)
    }
}
