//! Pluggable per-service-type configuration loaders.
//!
//! Each OGC service type registers a loader; the bootstrap asks every loader
//! for its global config and again per workspace, and the persister routes
//! service saves back through the matching loader.

use std::sync::{Arc, Mutex};

use atlas_core::ServiceInfo;

use crate::codec::Codec;
use crate::error::DataDirError;
use crate::layout;
use crate::resource::ResourceTree;

pub trait ServiceLoader: Send + Sync {
    /// Service type identifier, e.g. `wms`. Doubles as the config file stem.
    fn service_type(&self) -> &str;

    /// Load the config for this service type, globally (`workspace: None`)
    /// or for one workspace. `Ok(None)` means no config file exists there.
    fn load(
        &self,
        tree: &ResourceTree,
        workspace: Option<&str>,
    ) -> Result<Option<ServiceInfo>, DataDirError>;

    fn save(&self, service: &ServiceInfo, tree: &ResourceTree) -> Result<(), DataDirError>;
}

/// The standard loader: one `<type>.xml` per scope, encoded with the shared
/// codec.
pub struct FileServiceLoader {
    service_type: String,
    codec: Arc<Mutex<Codec>>,
}

impl FileServiceLoader {
    pub fn new(service_type: impl Into<String>, codec: Arc<Mutex<Codec>>) -> Self {
        Self {
            service_type: service_type.into(),
            codec,
        }
    }

    fn codec(&self) -> std::sync::MutexGuard<'_, Codec> {
        self.codec.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ServiceLoader for FileServiceLoader {
    fn service_type(&self) -> &str {
        &self.service_type
    }

    fn load(
        &self,
        tree: &ResourceTree,
        workspace: Option<&str>,
    ) -> Result<Option<ServiceInfo>, DataDirError> {
        let file = tree.get(&layout::service_file(workspace, &self.service_type));
        if !file.exists() {
            return Ok(None);
        }
        let mut service: ServiceInfo = self.codec().load(&file)?;
        // The scope comes from where the file sits, not from the payload.
        service.workspace = workspace.map(str::to_string);
        Ok(Some(service))
    }

    fn save(&self, service: &ServiceInfo, tree: &ResourceTree) -> Result<(), DataDirError> {
        let file = tree.get(&layout::service_file(
            service.workspace.as_deref(),
            &self.service_type,
        ));
        self.codec().save(&file, service)
    }
}
