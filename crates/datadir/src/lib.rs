//! Data-directory persistence: loads a hierarchical on-disk configuration
//! tree into the in-memory catalog/config at startup, and mirrors every
//! subsequent mutation back to the same tree.

pub mod async_iter;
pub mod codec;
pub mod crs;
pub mod env;
pub mod error;
pub mod layout;
pub mod loader;
pub mod orchestrator;
pub mod persister;
pub mod resource;
pub mod security;
pub mod service;

pub use async_iter::AsyncResourceIterator;
pub use codec::Codec;
pub use error::DataDirError;
pub use loader::{DataDirectoryLoader, NoopProbe, StoreProbe};
pub use orchestrator::{Initializer, LoadState, ServerLoader, ServerLoaderBuilder};
pub use persister::{ConfigPersister, ResourcePersister};
pub use resource::{Resource, ResourceKindOnDisk, ResourceTree};
pub use security::{Decryptor, PassthroughDecryptor, ENCRYPTED_PREFIX};
pub use service::{FileServiceLoader, ServiceLoader};
