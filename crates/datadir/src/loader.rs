//! Parallel data-directory loader.
//!
//! Loading happens in two phases against the same worker pool: the catalog
//! phase parses and inserts every catalog entity, the config phase follows
//! with settings and services. Parsing is fanned out per workspace over the
//! pool; insertion into the catalog is single-threaded so validation and
//! event ordering stay deterministic. Any entity that fails to parse or
//! validate is logged and skipped, never aborting the load.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, warn};

use atlas_catalog::{Catalog, Config};
use atlas_core::{
    GlobalInfo, LayerGroupInfo, LayerInfo, LoggingInfo, NamespaceInfo, ResourceErrorHandling,
    ResourceInfo, SettingsInfo, StoreInfo, StoreKind, StyleInfo, WorkspaceInfo,
};

use crate::async_iter::AsyncResourceIterator;
use crate::codec::Codec;
use crate::env;
use crate::error::DataDirError;
use crate::layout;
use crate::resource::{Resource, ResourceKindOnDisk, ResourceTree};
use crate::service::ServiceLoader;

/// Startup connectivity check for stores. Probing happens on the worker
/// pool, so implementations must be thread-safe.
pub trait StoreProbe: Send + Sync {
    /// `Err` carries a human-readable reason; the loader records it on the
    /// store and disables it.
    fn probe(&self, store: &StoreInfo) -> Result<(), String>;
}

/// Probe used when connectivity checking is disabled or not wired in.
#[derive(Debug, Default)]
pub struct NoopProbe;

impl StoreProbe for NoopProbe {
    fn probe(&self, _store: &StoreInfo) -> Result<(), String> {
        Ok(())
    }
}

/// Tracks the two load phases so the worker pool is released exactly once,
/// after whichever phase finishes last.
struct PhaseLatch {
    catalog_done: AtomicBool,
    config_done: AtomicBool,
}

impl PhaseLatch {
    fn new() -> Self {
        Self {
            catalog_done: AtomicBool::new(false),
            config_done: AtomicBool::new(false),
        }
    }

    fn both_done(&self) -> bool {
        self.catalog_done.load(Ordering::Acquire) && self.config_done.load(Ordering::Acquire)
    }
}

// Parse results carried from the pool back to the inserting thread.

struct StoreScan {
    store: StoreInfo,
    resources: Vec<(ResourceInfo, Option<LayerInfo>)>,
}

struct WorkspaceScan {
    workspace: WorkspaceInfo,
    namespace: Option<NamespaceInfo>,
    stores: Vec<StoreScan>,
    styles: Vec<StyleInfo>,
    layer_groups: Vec<LayerGroupInfo>,
    settings: Option<SettingsInfo>,
}

pub struct DataDirectoryLoader {
    tree: ResourceTree,
    /// Shared write-side codec; every save serializes on its mutex.
    codec: Arc<Mutex<Codec>>,
    /// Decoding is read-only, so the workers parse through this instance
    /// without taking the write lock.
    parser: Codec,
    probe: Arc<dyn StoreProbe>,
    pool: Mutex<Option<rayon::ThreadPool>>,
    latch: PhaseLatch,
    /// Global config read up front: it decides store probing and is reused
    /// by the config phase instead of a second parse.
    global: Mutex<Option<GlobalInfo>>,
    /// Per-workspace settings found during the catalog walk, stashed for the
    /// config phase.
    settings_stash: Mutex<Vec<SettingsInfo>>,
}

impl DataDirectoryLoader {
    /// Open the data directory and build the worker pool. Fails fast when
    /// the root is not a plain directory.
    pub fn new(
        tree: ResourceTree,
        codec: Arc<Mutex<Codec>>,
        probe: Arc<dyn StoreProbe>,
    ) -> Result<Self, DataDirError> {
        let pool = build_pool()?;
        info!(
            "data directory loader ready: root={}, workers={}",
            tree.root().display(),
            pool.current_num_threads()
        );
        Ok(Self {
            tree,
            codec,
            parser: Codec::new(),
            probe,
            pool: Mutex::new(Some(pool)),
            latch: PhaseLatch::new(),
            global: Mutex::new(None),
            settings_stash: Mutex::new(Vec::new()),
        })
    }

    pub fn tree(&self) -> &ResourceTree {
        &self.tree
    }

    // ── Catalog phase ───────────────────────────────────────────────

    /// Load every catalog entity from disk into `catalog`.
    pub fn load_catalog(&self, catalog: &Catalog) -> Result<(), DataDirError> {
        let started = std::time::Instant::now();

        // global.xml is read before any parallel work: it tells us whether
        // store probing is wanted, and the config phase reuses the parse.
        let check_stores = self.read_global_early();

        let ws_dirs = self.workspace_dirs()?;
        let scans = self.with_pool(|pool| {
            pool.install(|| {
                ws_dirs
                    .into_par_iter()
                    .filter_map(|dir| self.scan_workspace(dir, check_stores))
                    .collect::<Vec<WorkspaceScan>>()
            })
        })?;

        // Styles carry no references and load first; layer groups reference
        // layers by name and load last.
        self.insert_global_styles(catalog)?;
        let mut scans = scans;
        scans.sort_by(|a, b| a.workspace.name.cmp(&b.workspace.name));
        self.insert_scans(catalog, scans)?;
        self.apply_default_workspace(catalog)?;
        self.insert_global_layer_groups(catalog)?;

        let stats = catalog.stats();
        info!(
            "catalog loaded in {:?}: {} workspaces, {} stores, {} resources, {} layers, \
             {} styles, {} layer groups",
            started.elapsed(),
            stats.workspaces,
            stats.stores,
            stats.resources,
            stats.layers,
            stats.styles,
            stats.layer_groups
        );

        self.latch.catalog_done.store(true, Ordering::Release);
        self.maybe_release_pool();
        Ok(())
    }

    /// Whether stores should be probed, decided by the early global read.
    fn read_global_early(&self) -> bool {
        let file = self.tree.get(layout::GLOBAL_FILE);
        if !file.exists() {
            debug!("no global.xml, using defaults");
            return true;
        }
        match self.parser.load::<GlobalInfo>(&file) {
            Ok(global) => {
                let check = global.resource_error_handling
                    != ResourceErrorHandling::SkipMisconfiguredLayers;
                *self.global.lock().unwrap_or_else(|e| e.into_inner()) = Some(global);
                check
            }
            Err(e) => {
                warn!("failed to read global.xml, using defaults: {e}");
                true
            }
        }
    }

    fn workspace_dirs(&self) -> Result<Vec<Resource>, DataDirError> {
        let mut dirs = Vec::new();
        for child in self.tree.get(layout::WORKSPACES_DIR).list()? {
            if child.kind() == ResourceKindOnDisk::Directory {
                dirs.push(child);
            }
        }
        Ok(dirs)
    }

    /// Parse one workspace directory: workspace + namespace files, stores
    /// with their resources and layers, workspace styles and layer groups,
    /// and the settings stash. Runs on the pool.
    fn scan_workspace(&self, dir: Resource, check_stores: bool) -> Option<WorkspaceScan> {
        let ws_file = dir.child("workspace.xml");
        if !ws_file.exists() {
            warn!("ignoring {}: no workspace.xml", dir.path());
            return None;
        }
        let workspace: WorkspaceInfo = match self.parser.load(&ws_file) {
            Ok(ws) => ws,
            Err(e) => {
                warn!("skipping workspace at {}: {e}", dir.path());
                return None;
            }
        };

        let namespace = self.load_optional::<NamespaceInfo>(&dir.child("namespace.xml"));
        let settings = self.load_optional::<SettingsInfo>(&dir.child("settings.xml"));

        let mut stores = Vec::new();
        for child in self.list_or_warn(&dir) {
            if child.kind() != ResourceKindOnDisk::Directory {
                continue;
            }
            match child.name() {
                layout::STYLES_DIR | layout::LAYER_GROUPS_DIR => continue,
                _ => {}
            }
            if let Some(scan) = self.scan_store(&child, &workspace, check_stores) {
                stores.push(scan);
            }
        }

        let styles = self.scan_style_dir(&dir.child(layout::STYLES_DIR), Some(&workspace.name));
        let layer_groups =
            self.scan_layer_group_dir(&dir.child(layout::LAYER_GROUPS_DIR), Some(&workspace.name));

        Some(WorkspaceScan {
            workspace,
            namespace,
            stores,
            styles,
            layer_groups,
            settings,
        })
    }

    fn scan_store(
        &self,
        dir: &Resource,
        workspace: &WorkspaceInfo,
        check_stores: bool,
    ) -> Option<StoreScan> {
        let Some(marker) = self
            .list_or_warn(dir)
            .into_iter()
            .find(|c| layout::store_kind_for_marker(c.name()).is_some())
        else {
            debug!("ignoring {}: no store marker file", dir.path());
            return None;
        };

        let mut store: StoreInfo = match self.parser.load(&marker) {
            Ok(s) => s,
            Err(e) => {
                warn!("skipping store at {}: {e}", dir.path());
                return None;
            }
        };
        // The directory it sits in is authoritative for ownership.
        if store.workspace_id != workspace.id {
            warn!(
                "store '{}' claims a different workspace, reassigning to '{}'",
                store.name, workspace.name
            );
            store.workspace_id = workspace.id;
        }
        // Only data stores hold live connections worth probing at startup.
        if check_stores && store.enabled && store.kind == StoreKind::Data {
            if let Err(reason) = self.probe.probe(&store) {
                warn!("store '{}' failed its connection probe: {reason}", store.name);
                store.error = Some(reason);
                store.enabled = false;
            }
        }

        let mut resources = Vec::new();
        for child in self.list_or_warn(dir) {
            if child.kind() != ResourceKindOnDisk::Directory {
                continue;
            }
            let Some(marker) = self
                .list_or_warn(&child)
                .into_iter()
                .find(|c| layout::resource_kind_for_marker(c.name()).is_some())
            else {
                continue;
            };
            let mut resource: ResourceInfo = match self.parser.load(&marker) {
                Ok(r) => r,
                Err(e) => {
                    warn!("skipping resource at {}: {e}", child.path());
                    continue;
                }
            };
            if resource.store_id != store.id {
                warn!(
                    "resource '{}' claims a different store, reassigning to '{}'",
                    resource.name, store.name
                );
                resource.store_id = store.id;
            }

            let layer = self
                .load_optional::<LayerInfo>(&child.child(layout::LAYER_FILE))
                .map(|mut layer| {
                    if layer.resource_id != resource.id {
                        warn!(
                            "layer '{}' claims a different resource, reassigning to '{}'",
                            layer.name, resource.name
                        );
                        layer.resource_id = resource.id;
                    }
                    layer
                });
            resources.push((resource, layer));
        }

        Some(StoreScan { store, resources })
    }

    fn scan_style_dir(&self, dir: &Resource, workspace: Option<&str>) -> Vec<StyleInfo> {
        let mut styles = Vec::new();
        for child in self.list_or_warn(dir) {
            if child.kind() != ResourceKindOnDisk::File || !child.name().ends_with(".xml") {
                continue;
            }
            match self.parser.load::<StyleInfo>(&child) {
                Ok(mut style) => {
                    style.workspace = workspace.map(str::to_string);
                    styles.push(style);
                }
                // Style definition files share the directory; anything that
                // is not a config document lands here.
                Err(e) => debug!("not a style config, ignoring {}: {e}", child.path()),
            }
        }
        styles
    }

    fn scan_layer_group_dir(&self, dir: &Resource, workspace: Option<&str>) -> Vec<LayerGroupInfo> {
        let mut groups = Vec::new();
        for child in self.list_or_warn(dir) {
            if child.kind() != ResourceKindOnDisk::File || !child.name().ends_with(".xml") {
                continue;
            }
            match self.parser.load::<LayerGroupInfo>(&child) {
                Ok(mut group) => {
                    if group.layers.is_empty() {
                        warn!("skipping layer group '{}': no layers", group.name);
                        continue;
                    }
                    group.workspace = workspace.map(str::to_string);
                    groups.push(group);
                }
                Err(e) => warn!("skipping layer group at {}: {e}", child.path()),
            }
        }
        groups
    }

    /// Single-threaded insertion, in dependency order. Validation failures
    /// are logged and skipped like parse failures.
    fn insert_scans(
        &self,
        catalog: &Catalog,
        scans: Vec<WorkspaceScan>,
    ) -> Result<(), DataDirError> {
        let mut stash = Vec::new();
        for scan in scans {
            let ws_name = scan.workspace.name.clone();
            if let Err(e) = catalog.add(scan.workspace) {
                warn!("dropping workspace '{ws_name}': {e}");
                continue;
            }
            if let Some(ns) = scan.namespace {
                if let Err(e) = catalog.add(ns) {
                    warn!("dropping namespace for '{ws_name}': {e}");
                }
            }
            if let Some(settings) = scan.settings {
                stash.push(settings);
            }
            for store_scan in scan.stores {
                let store_name = store_scan.store.name.clone();
                if let Err(e) = catalog.add(store_scan.store) {
                    warn!("dropping store '{store_name}': {e}");
                    continue;
                }
                for (resource, layer) in store_scan.resources {
                    let res_name = resource.name.clone();
                    if let Err(e) = catalog.add(resource) {
                        warn!("dropping resource '{res_name}': {e}");
                        continue;
                    }
                    if let Some(layer) = layer {
                        let layer_name = layer.name.clone();
                        if let Err(e) = catalog.add(layer) {
                            warn!("dropping layer '{layer_name}': {e}");
                        }
                    }
                }
            }
            for style in scan.styles {
                let name = style.name.clone();
                if let Err(e) = catalog.add(style) {
                    warn!("dropping style '{name}': {e}");
                }
            }
            for group in scan.layer_groups {
                let name = group.name.clone();
                if let Err(e) = catalog.add(group) {
                    warn!("dropping layer group '{name}': {e}");
                }
            }
        }
        self.settings_stash.lock().unwrap_or_else(|e| e.into_inner()).extend(stash);
        Ok(())
    }

    /// Resolve the default-workspace sentinel, falling back to the first
    /// workspace by name when the sentinel is missing or stale.
    fn apply_default_workspace(&self, catalog: &Catalog) -> Result<(), DataDirError> {
        let sentinel = self.tree.get(&layout::default_workspace_file());
        let named = self
            .load_optional::<WorkspaceInfo>(&sentinel)
            .and_then(|ws| catalog.workspace_by_name(&ws.name));
        let chosen = match named {
            Some(ws) => Some(ws),
            None => {
                let mut all = catalog.workspaces();
                all.sort_by(|a, b| a.name.cmp(&b.name));
                let first = all.into_iter().next();
                if let Some(ws) = &first {
                    info!("no usable default-workspace sentinel, defaulting to '{}'", ws.name);
                    // Back-fill the sentinel so the choice is stable across
                    // restarts.
                    if let Err(e) = self.codec().save(&sentinel, ws) {
                        warn!("failed to back-fill default-workspace sentinel: {e}");
                    }
                }
                first
            }
        };
        if let Some(ws) = chosen {
            catalog.set_default_workspace(Some(ws.id))?;
        }
        Ok(())
    }

    /// Global styles are a flat list of independent files, so they go
    /// through the async iterator instead of the workspace fan-out.
    fn insert_global_styles(&self, catalog: &Catalog) -> Result<(), DataDirError> {
        let parser = self.parser.clone();
        let iter = AsyncResourceIterator::new(
            self.config_files_in(layout::STYLES_DIR),
            env::async_iterator_threads(),
            move |file| {
                match parser.load::<StyleInfo>(&file) {
                    Ok(mut style) => {
                        style.workspace = None;
                        Ok(Some(style))
                    }
                    // Style definition files share the directory; anything
                    // that is not a config document lands here.
                    Err(e) => {
                        debug!("not a style config, ignoring {}: {e}", file.path());
                        Ok(None)
                    }
                }
            },
        );
        for style in iter {
            let name = style.name.clone();
            if let Err(e) = catalog.add(style) {
                warn!("dropping style '{name}': {e}");
            }
        }
        Ok(())
    }

    fn insert_global_layer_groups(&self, catalog: &Catalog) -> Result<(), DataDirError> {
        let parser = self.parser.clone();
        let iter = AsyncResourceIterator::new(
            self.config_files_in(layout::LAYER_GROUPS_DIR),
            env::async_iterator_threads(),
            move |file| {
                let mut group: LayerGroupInfo = parser.load(&file)?;
                if group.layers.is_empty() {
                    warn!("skipping layer group '{}': no layers", group.name);
                    return Ok(None);
                }
                group.workspace = None;
                Ok(Some(group))
            },
        );
        for group in iter {
            let name = group.name.clone();
            if let Err(e) = catalog.add(group) {
                warn!("dropping layer group '{name}': {e}");
            }
        }
        Ok(())
    }

    /// `.xml` files directly under `dir`.
    fn config_files_in(&self, dir: &str) -> Vec<Resource> {
        self.list_or_warn(&self.tree.get(dir))
            .into_iter()
            .filter(|c| c.kind() == ResourceKindOnDisk::File && c.name().ends_with(".xml"))
            .collect()
    }

    // ── Config phase ────────────────────────────────────────────────

    /// Load global, logging, stashed settings and per-type services into
    /// `config`. Must run after [`load_catalog`](Self::load_catalog).
    pub fn load_config(
        &self,
        config: &Config,
        catalog: &Catalog,
        service_loaders: &[Arc<dyn ServiceLoader>],
    ) -> Result<(), DataDirError> {
        let global = self
            .global
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .unwrap_or_default();
        config.set_global(global)?;

        let logging_file = self.tree.get(layout::LOGGING_FILE);
        if let Some(logging) = self.load_optional::<LoggingInfo>(&logging_file) {
            config.set_logging(logging)?;
        }

        let stash = std::mem::take(
            &mut *self.settings_stash.lock().unwrap_or_else(|e| e.into_inner()),
        );
        for settings in stash {
            if let Err(e) = config.add_settings(settings) {
                warn!("dropping workspace settings: {e}");
            }
        }

        // Service configs fan out over the pool: one task per (loader,
        // scope) pair.
        let mut scopes = vec![None];
        scopes.extend(catalog.workspaces().into_iter().map(|ws| Some(ws.name)));
        let tasks: Vec<(Arc<dyn ServiceLoader>, Option<String>)> = service_loaders
            .iter()
            .flat_map(|loader| scopes.iter().map(move |s| (loader.clone(), s.clone())))
            .collect();

        let services = self.with_pool(|pool| {
            pool.install(|| {
                tasks
                    .into_par_iter()
                    .filter_map(|(loader, scope)| {
                        match loader.load(&self.tree, scope.as_deref()) {
                            Ok(found) => found,
                            Err(e) => {
                                warn!(
                                    "skipping {} config for scope {scope:?}: {e}",
                                    loader.service_type()
                                );
                                None
                            }
                        }
                    })
                    .collect::<Vec<_>>()
            })
        })?;
        let mut services = services;
        services.sort_by(|a, b| (&a.name, &a.workspace).cmp(&(&b.name, &b.workspace)));
        for service in services {
            let name = service.name.clone();
            if let Err(e) = config.add_service(service) {
                warn!("dropping service config '{name}': {e}");
            }
        }

        self.latch.config_done.store(true, Ordering::Release);
        self.maybe_release_pool();
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────

    fn codec(&self) -> std::sync::MutexGuard<'_, Codec> {
        self.codec.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Parse an optional file, warn-and-none on failure.
    fn load_optional<T: serde::de::DeserializeOwned>(&self, file: &Resource) -> Option<T> {
        if !file.exists() {
            return None;
        }
        match self.parser.load(file) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("skipping unreadable {}: {e}", file.path());
                None
            }
        }
    }

    fn list_or_warn(&self, dir: &Resource) -> Vec<Resource> {
        dir.list().unwrap_or_else(|e| {
            warn!("failed to list {}: {e}", dir.path());
            Vec::new()
        })
    }

    /// Run `f` against the pool, rebuilding it first if it was already
    /// released (the reload case).
    fn with_pool<R: Send>(
        &self,
        f: impl FnOnce(&rayon::ThreadPool) -> R + Send,
    ) -> Result<R, DataDirError> {
        let mut guard = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        let pool = match guard.take() {
            Some(pool) => pool,
            None => build_pool()?,
        };
        let result = f(&pool);
        *guard = Some(pool);
        Ok(result)
    }

    /// Release the worker pool once both phases have run.
    fn maybe_release_pool(&self) {
        if self.latch.both_done() {
            let mut guard = self.pool.lock().unwrap_or_else(|e| e.into_inner());
            if guard.take().is_some() {
                debug!("released loader worker pool");
            }
        }
    }
}

fn build_pool() -> Result<rayon::ThreadPool, DataDirError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(env::loader_threads())
        .thread_name(|i| format!("datadir-loader-{i}"))
        .build()
        .map_err(|e| {
            DataDirError::Service("loader".to_string(), format!("pool build failed: {e}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::{ResourceKind, StoreKind};
    use tempfile::TempDir;

    fn write(tree: &ResourceTree, path: &str, value: &impl serde::Serialize) {
        Codec::new().save(&tree.get(path), value).unwrap();
    }

    fn loader_for(tree: &ResourceTree) -> DataDirectoryLoader {
        DataDirectoryLoader::new(
            tree.clone(),
            Arc::new(Mutex::new(Codec::new())),
            Arc::new(NoopProbe),
        )
        .unwrap()
    }

    /// workspaces/ws1/shp/rivers with a layer, plus a global style.
    fn seed_basic(tree: &ResourceTree) -> (WorkspaceInfo, StoreInfo, ResourceInfo) {
        let ws = WorkspaceInfo::new("ws1");
        let ns = NamespaceInfo::new("ws1", "http://ws1.example.org");
        let store = StoreInfo::new("shp", StoreKind::Data, ws.id);
        let mut resource = ResourceInfo::new("rivers", ResourceKind::FeatureType, store.id);
        resource.namespace_prefix = Some("ws1".into());
        let layer = LayerInfo::new("rivers", resource.id);

        write(tree, "workspaces/ws1/workspace.xml", &ws);
        write(tree, "workspaces/ws1/namespace.xml", &ns);
        write(tree, "workspaces/ws1/shp/datastore.xml", &store);
        write(tree, "workspaces/ws1/shp/rivers/featuretype.xml", &resource);
        write(tree, "workspaces/ws1/shp/rivers/layer.xml", &layer);
        write(tree, "styles/default.xml", &StyleInfo::new("default", "default.sld"));
        (ws, store, resource)
    }

    #[test]
    fn loads_basic_tree() {
        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();
        let (ws, store, resource) = seed_basic(&tree);

        let catalog = Catalog::new();
        loader_for(&tree).load_catalog(&catalog).unwrap();

        assert_eq!(catalog.workspace_by_name("ws1").unwrap().id, ws.id);
        assert_eq!(catalog.store_by_name(ws.id, "shp").unwrap().id, store.id);
        assert_eq!(catalog.resource_by_name(store.id, "rivers").unwrap().id, resource.id);
        assert!(catalog.layer_for_resource(resource.id).is_some());
        assert!(catalog.style_by_name(None, "default").is_some());
        // no sentinel on disk: the only workspace becomes the default
        assert_eq!(catalog.default_workspace().unwrap().id, ws.id);
    }

    #[test]
    fn corrupt_resource_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();
        let (_, store, _) = seed_basic(&tree);
        tree.get("workspaces/ws1/shp/lakes/featuretype.xml")
            .write(b"garbage")
            .unwrap();

        let catalog = Catalog::new();
        loader_for(&tree).load_catalog(&catalog).unwrap();

        assert!(catalog.resource_by_name(store.id, "rivers").is_some());
        assert!(catalog.resource_by_name(store.id, "lakes").is_none());
    }

    #[test]
    fn empty_layer_group_is_skipped() {
        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();
        seed_basic(&tree);
        write(
            &tree,
            "layergroups/empty.xml",
            &LayerGroupInfo::new("empty", Vec::new()),
        );
        write(
            &tree,
            "layergroups/full.xml",
            &LayerGroupInfo::new("full", vec!["rivers".into()]),
        );

        let catalog = Catalog::new();
        loader_for(&tree).load_catalog(&catalog).unwrap();

        assert!(catalog.layer_group_by_name(None, "empty").is_none());
        assert!(catalog.layer_group_by_name(None, "full").is_some());
    }

    #[test]
    fn parent_ids_fixed_to_physical_location() {
        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();
        let ws = WorkspaceInfo::new("ws1");
        write(&tree, "workspaces/ws1/workspace.xml", &ws);
        // store file claims a workspace id that does not exist
        let store = StoreInfo::new("shp", StoreKind::Data, uuid::Uuid::new_v4());
        write(&tree, "workspaces/ws1/shp/datastore.xml", &store);

        let catalog = Catalog::new();
        loader_for(&tree).load_catalog(&catalog).unwrap();

        let loaded = catalog.store_by_name(ws.id, "shp").unwrap();
        assert_eq!(loaded.workspace_id, ws.id);
    }

    #[test]
    fn failing_probe_disables_store() {
        struct AlwaysFails;
        impl StoreProbe for AlwaysFails {
            fn probe(&self, _store: &StoreInfo) -> Result<(), String> {
                Err("connection refused".to_string())
            }
        }

        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();
        let (ws, _, _) = seed_basic(&tree);

        let loader = DataDirectoryLoader::new(
            tree.clone(),
            Arc::new(Mutex::new(Codec::new())),
            Arc::new(AlwaysFails),
        )
        .unwrap();
        let catalog = Catalog::new();
        loader.load_catalog(&catalog).unwrap();

        let store = catalog.store_by_name(ws.id, "shp").unwrap();
        assert!(!store.enabled);
        assert_eq!(store.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn skip_misconfigured_layers_disables_probing() {
        struct PanicProbe;
        impl StoreProbe for PanicProbe {
            fn probe(&self, _store: &StoreInfo) -> Result<(), String> {
                panic!("probe must not run");
            }
        }

        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();
        seed_basic(&tree);
        let global = GlobalInfo {
            resource_error_handling: ResourceErrorHandling::SkipMisconfiguredLayers,
            ..GlobalInfo::default()
        };
        write(&tree, "global.xml", &global);

        let loader = DataDirectoryLoader::new(
            tree.clone(),
            Arc::new(Mutex::new(Codec::new())),
            Arc::new(PanicProbe),
        )
        .unwrap();
        let catalog = Catalog::new();
        loader.load_catalog(&catalog).unwrap();
        assert_eq!(catalog.stats().stores, 1);
    }

    #[test]
    fn unmarked_directory_is_not_a_store() {
        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();
        seed_basic(&tree);
        tree.get("workspaces/ws1/scratch/notes.xml").write(b"{}").unwrap();

        let catalog = Catalog::new();
        loader_for(&tree).load_catalog(&catalog).unwrap();
        assert_eq!(catalog.stats().stores, 1);
        assert_eq!(catalog.stats().resources, 1);
    }

    #[test]
    fn probe_only_checks_data_stores() {
        struct AlwaysFails;
        impl StoreProbe for AlwaysFails {
            fn probe(&self, _store: &StoreInfo) -> Result<(), String> {
                Err("connection refused".to_string())
            }
        }

        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();
        let (ws, _, _) = seed_basic(&tree);
        let coverage = StoreInfo::new("tif", StoreKind::Coverage, ws.id);
        write(&tree, "workspaces/ws1/tif/coveragestore.xml", &coverage);

        let loader = DataDirectoryLoader::new(
            tree.clone(),
            Arc::new(Mutex::new(Codec::new())),
            Arc::new(AlwaysFails),
        )
        .unwrap();
        let catalog = Catalog::new();
        loader.load_catalog(&catalog).unwrap();

        assert!(!catalog.store_by_name(ws.id, "shp").unwrap().enabled);
        let coverage = catalog.store_by_name(ws.id, "tif").unwrap();
        assert!(coverage.enabled);
        assert!(coverage.error.is_none());
    }

    #[test]
    fn default_workspace_sentinel_honored() {
        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();
        seed_basic(&tree);
        let ws2 = WorkspaceInfo::new("ws2");
        write(&tree, "workspaces/ws2/workspace.xml", &ws2);
        write(&tree, "workspaces/default.xml", &ws2);

        let catalog = Catalog::new();
        loader_for(&tree).load_catalog(&catalog).unwrap();
        assert_eq!(catalog.default_workspace().unwrap().name, "ws2");
    }

    #[test]
    fn config_phase_loads_settings_and_services() {
        use crate::service::FileServiceLoader;

        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();
        seed_basic(&tree);
        write(&tree, "workspaces/ws1/settings.xml", &SettingsInfo::for_workspace("ws1"));
        write(&tree, "wms.xml", &atlas_core::ServiceInfo::new("wms"));
        let mut scoped = atlas_core::ServiceInfo::new("wms");
        scoped.workspace = Some("ws1".into());
        write(&tree, "workspaces/ws1/wms.xml", &scoped);

        let codec = Arc::new(Mutex::new(Codec::new()));
        let loader =
            DataDirectoryLoader::new(tree.clone(), codec.clone(), Arc::new(NoopProbe)).unwrap();
        let catalog = Catalog::new();
        let config = Config::new();
        loader.load_catalog(&catalog).unwrap();

        let loaders: Vec<Arc<dyn ServiceLoader>> =
            vec![Arc::new(FileServiceLoader::new("wms", codec))];
        loader.load_config(&config, &catalog, &loaders).unwrap();

        assert!(config.settings_for("ws1").is_some());
        assert!(config.service("wms", None).is_some());
        assert!(config.service("wms", Some("ws1")).is_some());
    }
}
