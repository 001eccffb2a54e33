//! Startup orchestration: drives the two-phase load, attaches the
//! persistence and bookkeeping listeners once the catalog is authoritative,
//! decrypts store passwords, back-fills the built-in styles, and runs
//! registered initializers. Also owns the readiness flag that gates incoming
//! traffic during a reload.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use atlas_catalog::{
    Catalog, CatalogListener, Config, ConfigListener, TimestampListener, UpdateSequenceListener,
};
use atlas_core::StyleInfo;

use crate::codec::Codec;
use crate::crs;
use crate::env;
use crate::error::DataDirError;
use crate::layout;
use crate::loader::{DataDirectoryLoader, NoopProbe, StoreProbe};
use crate::persister::{ConfigPersister, ResourcePersister};
use crate::resource::ResourceTree;
use crate::security::{self, Decryptor, PassthroughDecryptor};
use crate::service::ServiceLoader;

/// Where the bootstrap currently stands. Mostly diagnostic; readiness is the
/// [`ServerLoader::ready`] flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Uninitialized,
    LoadingCatalog,
    LoadingConfig,
    Initializing,
    Ready,
    Reloading,
}

/// One-shot startup hook run after the catalog and config are loaded and
/// persisting. Failures are logged and isolated; a broken extension must not
/// keep the server down.
pub trait Initializer: Send + Sync {
    fn name(&self) -> &str;

    fn initialize(&self, catalog: &Catalog, config: &Config) -> Result<(), DataDirError>;
}

/// Built-in styles guaranteed to exist after bootstrap.
const DEFAULT_STYLES: [(&str, &str); 5] = [
    ("point", "default_point.sld"),
    ("line", "default_line.sld"),
    ("polygon", "default_polygon.sld"),
    ("raster", "default_raster.sld"),
    ("generic", "default_generic.sld"),
];

pub struct ServerLoaderBuilder {
    tree: ResourceTree,
    probe: Arc<dyn StoreProbe>,
    decryptor: Arc<dyn Decryptor>,
    service_loaders: Vec<Arc<dyn ServiceLoader>>,
    initializers: Vec<Arc<dyn Initializer>>,
}

impl ServerLoaderBuilder {
    pub fn new(tree: ResourceTree) -> Self {
        Self {
            tree,
            probe: Arc::new(NoopProbe),
            decryptor: Arc::new(PassthroughDecryptor),
            service_loaders: Vec::new(),
            initializers: Vec::new(),
        }
    }

    pub fn probe(mut self, probe: Arc<dyn StoreProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn decryptor(mut self, decryptor: Arc<dyn Decryptor>) -> Self {
        self.decryptor = decryptor;
        self
    }

    pub fn service_loader(mut self, loader: Arc<dyn ServiceLoader>) -> Self {
        self.service_loaders.push(loader);
        self
    }

    pub fn initializer(mut self, initializer: Arc<dyn Initializer>) -> Self {
        self.initializers.push(initializer);
        self
    }

    pub fn build(self) -> ServerLoader {
        ServerLoader {
            catalog: Arc::new(Catalog::new()),
            config: Arc::new(Config::new()),
            tree: self.tree,
            codec: Arc::new(Mutex::new(Codec::new())),
            probe: self.probe,
            decryptor: self.decryptor,
            service_loaders: self.service_loaders,
            initializers: self.initializers,
            state: Mutex::new(LoadState::Uninitialized),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }
}

pub struct ServerLoader {
    catalog: Arc<Catalog>,
    config: Arc<Config>,
    tree: ResourceTree,
    codec: Arc<Mutex<Codec>>,
    probe: Arc<dyn StoreProbe>,
    decryptor: Arc<dyn Decryptor>,
    service_loaders: Vec<Arc<dyn ServiceLoader>>,
    initializers: Vec<Arc<dyn Initializer>>,
    state: Mutex<LoadState>,
    ready: Arc<AtomicBool>,
}

impl ServerLoader {
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn state(&self) -> LoadState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Shared readiness flag, for health endpoints and request gates.
    pub fn ready_flag(&self) -> Arc<AtomicBool> {
        self.ready.clone()
    }

    fn set_state(&self, state: LoadState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Full bootstrap. Idempotent in effect: a second call behaves like a
    /// reload of the same directory.
    pub fn load(&self) -> Result<(), DataDirError> {
        self.ready.store(false, Ordering::Release);
        self.set_state(LoadState::LoadingCatalog);

        // CRS setup is process-wide and lock-heavy; do it here so loader
        // workers never stampede on first use.
        crs::warm_up();

        if env::loader_enabled() {
            let loader = DataDirectoryLoader::new(
                self.tree.clone(),
                self.codec.clone(),
                self.probe.clone(),
            )?;
            loader.load_catalog(&self.catalog)?;

            self.set_state(LoadState::LoadingConfig);
            loader.load_config(&self.config, &self.catalog, &self.service_loaders)?;
        } else {
            info!("data directory loader disabled, starting from an empty catalog");
        }

        self.set_state(LoadState::Initializing);
        self.decrypt_store_passwords();
        self.attach_listeners();
        self.ensure_default_styles();
        self.run_initializers();

        self.set_state(LoadState::Ready);
        self.ready.store(true, Ordering::Release);
        info!("server configuration ready");
        Ok(())
    }

    /// Tear everything down and load the directory again. The readiness flag
    /// stays false for the duration.
    pub fn reload(&self) -> Result<(), DataDirError> {
        info!("reloading server configuration");
        self.ready.store(false, Ordering::Release);
        self.set_state(LoadState::Reloading);

        // Detach persisters before clearing, or the teardown would be
        // mirrored to disk.
        self.catalog.clear_listeners();
        self.config.clear_listeners();
        self.catalog.clear();
        self.config.clear();

        self.load()
    }

    /// Decryption backends are not guaranteed thread-safe, so this runs on
    /// the orchestrating thread after the parallel phases. The refresh is
    /// quiet: the encrypted form is what belongs on disk.
    fn decrypt_store_passwords(&self) {
        for mut store in self.catalog.stores() {
            match security::decrypt_parameters(
                &mut store.connection_parameters,
                self.decryptor.as_ref(),
            ) {
                Ok(true) => {
                    let name = store.name.clone();
                    if let Err(e) = self.catalog.replace_quietly(store) {
                        warn!("failed to refresh decrypted store '{name}': {e}");
                    }
                }
                Ok(false) => {}
                Err(e) => warn!("failed to decrypt parameters of store '{}': {e}", store.name),
            }
        }
    }

    /// Listener order: mutating pre-hooks (timestamps, style filename
    /// fix-ups) are registered before the config persister, though every
    /// pre-hook completes before any write regardless.
    fn attach_listeners(&self) {
        let persister = Arc::new(ConfigPersister::new(
            self.tree.clone(),
            self.codec.clone(),
            &self.catalog,
            self.service_loaders.clone(),
        ));
        self.catalog.add_listener(Arc::new(TimestampListener::new()));
        self.catalog
            .add_listener(Arc::new(ResourcePersister::new(self.tree.clone(), &self.catalog)));
        self.catalog.add_listener(persister.clone() as Arc<dyn CatalogListener>);
        self.config.add_listener(persister as Arc<dyn ConfigListener>);

        let sequence = Arc::new(UpdateSequenceListener::new(&self.config));
        self.catalog.add_listener(sequence.clone() as Arc<dyn CatalogListener>);
        self.config.add_listener(sequence as Arc<dyn ConfigListener>);
    }

    /// Make sure the built-in styles exist, creating both the config entry
    /// and a stub definition file for any that are missing. Runs with
    /// persisters attached so new entries land on disk.
    fn ensure_default_styles(&self) {
        for (name, filename) in DEFAULT_STYLES {
            if self.catalog.style_by_name(None, name).is_some() {
                continue;
            }
            let definition = self.tree.get(&layout::style_definition_file(None, filename));
            if !definition.exists() {
                if let Err(e) = definition.write(default_style_body(name).as_bytes()) {
                    warn!("failed to write default style definition '{filename}': {e}");
                    continue;
                }
            }
            if let Err(e) = self.catalog.add(StyleInfo::new(name, filename)) {
                warn!("failed to register default style '{name}': {e}");
            }
        }
    }

    fn run_initializers(&self) {
        for initializer in &self.initializers {
            let name = initializer.name().to_string();
            if let Err(e) = initializer.initialize(&self.catalog, &self.config) {
                warn!("initializer '{name}' failed: {e}");
            } else {
                info!("initializer '{name}' done");
            }
        }
    }
}

fn default_style_body(name: &str) -> String {
    format!(
        "<StyledLayerDescriptor version=\"1.0.0\">\n  <Name>{name}</Name>\n</StyledLayerDescriptor>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::{StoreInfo, StoreKind, WorkspaceInfo};
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    fn loader_for(dir: &TempDir) -> ServerLoader {
        ServerLoaderBuilder::new(ResourceTree::open(dir.path()).unwrap()).build()
    }

    #[test]
    fn empty_directory_boots_ready_with_defaults() {
        let dir = TempDir::new().unwrap();
        let server = loader_for(&dir);
        assert_eq!(server.state(), LoadState::Uninitialized);

        server.load().unwrap();
        assert_eq!(server.state(), LoadState::Ready);
        assert!(server.is_ready());

        // default styles were back-filled and persisted
        for (name, filename) in DEFAULT_STYLES {
            assert!(server.catalog().style_by_name(None, name).is_some());
            assert!(dir.path().join("styles").join(filename).exists());
        }
    }

    #[test]
    fn mutations_after_load_are_persisted() {
        let dir = TempDir::new().unwrap();
        let server = loader_for(&dir);
        server.load().unwrap();

        let ws_id = server.catalog().add(WorkspaceInfo::new("topp")).unwrap();
        assert!(dir.path().join("workspaces/topp/workspace.xml").exists());

        // bookkeeping listeners attached too
        assert!(server.config().global().update_sequence > 0);
        let ws = server.catalog().workspace(ws_id).unwrap();
        assert!(ws.metadata.date_created.is_some());
    }

    #[test]
    fn round_trip_reload_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let server = loader_for(&dir);
        server.load().unwrap();

        let ws_id = server.catalog().add(WorkspaceInfo::new("topp")).unwrap();
        let mut store = StoreInfo::new("shp", StoreKind::Data, ws_id);
        store
            .connection_parameters
            .insert("url".into(), "file:data/shp".into());
        server.catalog().add(store).unwrap();

        let before = server.catalog().stats();
        server.reload().unwrap();
        assert_eq!(server.catalog().stats(), before);
        assert!(server.is_ready());
        assert_eq!(
            server.catalog().workspace_by_name("topp").unwrap().id,
            ws_id
        );
    }

    #[test]
    fn encrypted_passwords_decrypted_in_memory_only() {
        let dir = TempDir::new().unwrap();
        {
            let server = loader_for(&dir);
            server.load().unwrap();
            let ws_id = server.catalog().add(WorkspaceInfo::new("topp")).unwrap();
            let mut store = StoreInfo::new("pg", StoreKind::Data, ws_id);
            store
                .connection_parameters
                .insert("passwd".into(), "crypt1:hunter2".into());
            server.catalog().add(store).unwrap();
        }

        let server = loader_for(&dir);
        server.load().unwrap();
        let ws = server.catalog().workspace_by_name("topp").unwrap();
        let store = server.catalog().store_by_name(ws.id, "pg").unwrap();
        assert_eq!(store.connection_parameters["passwd"], "hunter2");

        // the on-disk copy keeps the encrypted form
        let raw =
            std::fs::read_to_string(dir.path().join("workspaces/topp/pg/datastore.xml")).unwrap();
        assert!(raw.contains("crypt1:hunter2"));
    }

    #[test]
    fn initializer_failure_is_isolated() {
        struct Broken;
        impl Initializer for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn initialize(&self, _: &Catalog, _: &Config) -> Result<(), DataDirError> {
                Err(DataDirError::Service("broken".into(), "boom".into()))
            }
        }
        struct Counts(AtomicUsize);
        impl Initializer for Counts {
            fn name(&self) -> &str {
                "counts"
            }
            fn initialize(&self, _: &Catalog, _: &Config) -> Result<(), DataDirError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let dir = TempDir::new().unwrap();
        let counts = Arc::new(Counts(AtomicUsize::new(0)));
        let server = ServerLoaderBuilder::new(ResourceTree::open(dir.path()).unwrap())
            .initializer(Arc::new(Broken))
            .initializer(counts.clone())
            .build();

        server.load().unwrap();
        assert!(server.is_ready());
        assert_eq!(counts.0.load(Ordering::SeqCst), 1);
    }
}
