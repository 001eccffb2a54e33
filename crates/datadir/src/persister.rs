//! Listeners that mirror catalog and config mutations back to disk.
//!
//! [`ConfigPersister`] owns every config document: it writes them on add,
//! moves directories and drops stale files on rename or reassignment, and
//! deletes them on remove. [`ResourcePersister`] owns the style definition
//! files (SLD and friends) that sit next to the config documents.
//!
//! Both hold the catalog weakly: the catalog owns its listeners, and a
//! strong reference back would leak the pair.

use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;
use tracing::{debug, warn};

use atlas_catalog::{
    change, Catalog, CatalogAddEvent, CatalogError, CatalogListener, CatalogModifyEvent,
    CatalogPostModifyEvent, CatalogRemoveEvent, ConfigListener, ListenerResult, PropertyChange,
};
use atlas_core::{
    CatalogItem, GlobalInfo, InfoId, LoggingInfo, ResourceInfo, ServiceInfo, SettingsInfo,
    StoreInfo, StyleInfo, WorkspaceInfo,
};

use crate::codec::Codec;
use crate::env;
use crate::error::DataDirError;
use crate::layout;
use crate::resource::ResourceTree;
use crate::service::ServiceLoader;

fn upgrade(catalog: &Weak<Catalog>) -> Result<Arc<Catalog>, CatalogError> {
    catalog
        .upgrade()
        .ok_or_else(|| CatalogError::Persist("catalog no longer available".to_string()))
}

fn str_change(changes: &[PropertyChange], name: &str) -> Option<String> {
    match &change(changes, name)?.new {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn opt_str_change(changes: &[PropertyChange], name: &str) -> Option<Option<String>> {
    let value = &change(changes, name)?.new;
    match value {
        Value::String(s) => Some(Some(s.clone())),
        Value::Null => Some(None),
        _ => None,
    }
}

fn id_change(changes: &[PropertyChange], name: &str) -> Option<InfoId> {
    serde_json::from_value(change(changes, name)?.new.clone()).ok()
}

/// Mirrors every catalog and config mutation into the data directory.
pub struct ConfigPersister {
    tree: ResourceTree,
    codec: Arc<Mutex<Codec>>,
    catalog: Weak<Catalog>,
    service_loaders: Vec<Arc<dyn ServiceLoader>>,
}

impl ConfigPersister {
    pub fn new(
        tree: ResourceTree,
        codec: Arc<Mutex<Codec>>,
        catalog: &Arc<Catalog>,
        service_loaders: Vec<Arc<dyn ServiceLoader>>,
    ) -> Self {
        Self {
            tree,
            codec,
            catalog: Arc::downgrade(catalog),
            service_loaders,
        }
    }

    fn codec(&self) -> std::sync::MutexGuard<'_, Codec> {
        self.codec.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn save<T: serde::Serialize>(&self, path: &str, value: &T) -> ListenerResult {
        self.codec()
            .save(&self.tree.get(path), value)
            .map_err(DataDirError::into_catalog)
    }

    fn remove_path(&self, path: &str) -> ListenerResult {
        self.tree.remove(path).map_err(DataDirError::into_catalog)
    }

    fn move_path(&self, from: &str, to: &str) -> ListenerResult {
        self.tree
            .move_resource(from, to)
            .map_err(DataDirError::into_catalog)
    }

    // ── Path resolution against current catalog state ───────────────

    fn workspace_name(&self, id: InfoId) -> Result<String, CatalogError> {
        upgrade(&self.catalog)?
            .workspace(id)
            .map(|ws| ws.name)
            .ok_or(CatalogError::NotFound(id))
    }

    fn store_location(&self, store: &StoreInfo) -> Result<(String, String), CatalogError> {
        Ok((self.workspace_name(store.workspace_id)?, store.name.clone()))
    }

    fn resource_location(
        &self,
        resource: &ResourceInfo,
    ) -> Result<(String, String, String), CatalogError> {
        let catalog = upgrade(&self.catalog)?;
        let store = catalog
            .store(resource.store_id)
            .ok_or(CatalogError::NotFound(resource.store_id))?;
        let ws = self.workspace_name(store.workspace_id)?;
        Ok((ws, store.name, resource.name.clone()))
    }

    /// Config-file path for an item in its current position.
    fn config_path(&self, item: &CatalogItem) -> Result<String, CatalogError> {
        match item {
            CatalogItem::Workspace(ws) => Ok(layout::workspace_file(&ws.name)),
            CatalogItem::Namespace(ns) => Ok(layout::namespace_file(&ns.prefix)),
            CatalogItem::Store(s) => {
                let (ws, name) = self.store_location(s)?;
                Ok(layout::store_file(&ws, &name, s.kind))
            }
            CatalogItem::Resource(r) => {
                let (ws, store, name) = self.resource_location(r)?;
                Ok(layout::resource_file(&ws, &store, &name, r.kind))
            }
            CatalogItem::Layer(l) => {
                let catalog = upgrade(&self.catalog)?;
                let resource = catalog
                    .resource(l.resource_id)
                    .ok_or(CatalogError::NotFound(l.resource_id))?;
                let (ws, store, name) = self.resource_location(&resource)?;
                Ok(layout::layer_file(&ws, &store, &name))
            }
            CatalogItem::Style(s) => Ok(layout::style_config_file(
                s.workspace.as_deref(),
                &s.name,
                &s.filename,
            )),
            CatalogItem::LayerGroup(g) => {
                Ok(layout::layer_group_file(g.workspace.as_deref(), &g.name))
            }
        }
    }

    fn save_item(&self, item: &CatalogItem) -> ListenerResult {
        let path = self.config_path(item)?;
        debug!("persisting {item} to {path}");
        match item {
            CatalogItem::Workspace(ws) => self.save(&path, ws),
            CatalogItem::Namespace(ns) => self.save(&path, ns),
            CatalogItem::Store(s) => self.save(&path, s),
            CatalogItem::Resource(r) => self.save(&path, r),
            CatalogItem::Layer(l) => self.save(&path, l),
            CatalogItem::Style(s) => self.save(&path, s),
            CatalogItem::LayerGroup(g) => self.save(&path, g),
        }
    }

    fn service_loader(&self, service_type: &str) -> Option<&Arc<dyn ServiceLoader>> {
        self.service_loaders
            .iter()
            .find(|l| l.service_type() == service_type)
    }

    fn save_service(&self, service: &ServiceInfo) -> ListenerResult {
        match self.service_loader(&service.name) {
            Some(loader) => loader
                .save(service, &self.tree)
                .map_err(DataDirError::into_catalog),
            None => {
                // No registered loader for the type; fall back to the
                // standard single-file form.
                let path = layout::service_file(service.workspace.as_deref(), &service.name);
                self.save(&path, service)
            }
        }
    }
}

impl CatalogListener for ConfigPersister {
    fn handle_add(&self, event: &CatalogAddEvent) -> ListenerResult {
        self.save_item(&event.item)
    }

    /// Runs before the in-memory swap: the catalog still resolves parents to
    /// their pre-change names, which is exactly what the old disk paths need.
    fn handle_modify(&self, event: &CatalogModifyEvent) -> ListenerResult {
        let changes = &event.changes;
        match &event.item {
            CatalogItem::Workspace(old) => {
                if let Some(new_name) = str_change(changes, "name") {
                    self.move_path(
                        &layout::workspace_dir(&old.name),
                        &layout::workspace_dir(&new_name),
                    )?;
                }
            }
            CatalogItem::Store(old) => {
                let new_name = str_change(changes, "name");
                let new_ws_id = id_change(changes, "workspace");
                if new_name.is_some() || new_ws_id.is_some() {
                    let (old_ws, old_name) = self.store_location(old)?;
                    let to_ws = match new_ws_id {
                        Some(id) => self.workspace_name(id)?,
                        None => old_ws.clone(),
                    };
                    let to_name = new_name.unwrap_or_else(|| old_name.clone());
                    self.move_path(
                        &layout::store_dir(&old_ws, &old_name),
                        &layout::store_dir(&to_ws, &to_name),
                    )?;
                }
            }
            CatalogItem::Resource(old) => {
                let new_name = str_change(changes, "name");
                let new_store_id = id_change(changes, "store");
                if new_name.is_some() || new_store_id.is_some() {
                    let (old_ws, old_store, old_name) = self.resource_location(old)?;
                    let (to_ws, to_store) = match new_store_id {
                        Some(id) => {
                            let catalog = upgrade(&self.catalog)?;
                            let store =
                                catalog.store(id).ok_or(CatalogError::NotFound(id))?;
                            (self.workspace_name(store.workspace_id)?, store.name)
                        }
                        None => (old_ws.clone(), old_store.clone()),
                    };
                    let to_name = new_name.unwrap_or_else(|| old_name.clone());
                    self.move_path(
                        &layout::resource_dir(&old_ws, &old_store, &old_name),
                        &layout::resource_dir(&to_ws, &to_store, &to_name),
                    )?;
                }
            }
            // Single-file kinds: drop the stale config here, post-modify
            // rewrites it at the new location. Namespace renames follow the
            // already-renamed workspace directory.
            CatalogItem::Namespace(old) => {
                if str_change(changes, "name").is_some() {
                    self.remove_path(&layout::namespace_file(&old.prefix))?;
                }
            }
            CatalogItem::Style(old) => {
                if !changes.is_empty() {
                    self.remove_path(&layout::style_config_file(
                        old.workspace.as_deref(),
                        &old.name,
                        &old.filename,
                    ))?;
                }
            }
            CatalogItem::LayerGroup(old) => {
                if !changes.is_empty() {
                    self.remove_path(&layout::layer_group_file(
                        old.workspace.as_deref(),
                        &old.name,
                    ))?;
                }
            }
            // layer.xml travels with its resource directory
            CatalogItem::Layer(_) => {}
        }
        Ok(())
    }

    fn handle_post_modify(&self, event: &CatalogPostModifyEvent) -> ListenerResult {
        self.save_item(&event.item)
    }

    fn handle_remove(&self, event: &CatalogRemoveEvent) -> ListenerResult {
        match &event.item {
            CatalogItem::Workspace(ws) => self.remove_path(&layout::workspace_dir(&ws.name)),
            CatalogItem::Namespace(ns) => self.remove_path(&layout::namespace_file(&ns.prefix)),
            CatalogItem::Store(s) => {
                let (ws, name) = self.store_location(s)?;
                self.remove_path(&layout::store_dir(&ws, &name))
            }
            CatalogItem::Resource(r) => {
                let (ws, store, name) = self.resource_location(r)?;
                self.remove_path(&layout::resource_dir(&ws, &store, &name))
            }
            // Only the layer file: the resource directory stays.
            CatalogItem::Layer(_) => {
                let path = self.config_path(&event.item)?;
                self.remove_path(&path)
            }
            CatalogItem::Style(s) => self.remove_path(&layout::style_config_file(
                s.workspace.as_deref(),
                &s.name,
                &s.filename,
            )),
            CatalogItem::LayerGroup(g) => {
                self.remove_path(&layout::layer_group_file(g.workspace.as_deref(), &g.name))
            }
        }
    }

    /// The sentinel is written only while a default exists; clearing the
    /// default leaves the previous sentinel in place.
    fn handle_default_workspace_change(&self, new: Option<&WorkspaceInfo>) -> ListenerResult {
        match new {
            Some(ws) => self.save(&layout::default_workspace_file(), ws),
            None => {
                debug!("default workspace cleared, keeping previous sentinel file");
                Ok(())
            }
        }
    }
}

impl ConfigListener for ConfigPersister {
    fn handle_post_global_change(&self, global: &GlobalInfo) -> ListenerResult {
        self.save(layout::GLOBAL_FILE, global)
    }

    fn handle_post_logging_change(&self, logging: &LoggingInfo) -> ListenerResult {
        self.save(layout::LOGGING_FILE, logging)
    }

    fn handle_settings_added(&self, settings: &SettingsInfo) -> ListenerResult {
        if let Some(ws) = settings.workspace.as_deref() {
            self.save(&layout::settings_file(ws), settings)?;
        }
        Ok(())
    }

    fn handle_settings_modified(
        &self,
        settings: &SettingsInfo,
        changes: &[PropertyChange],
    ) -> ListenerResult {
        // A workspace reassignment strands the old file; drop it before the
        // post-modify write creates the new one.
        if opt_str_change(changes, "workspace").is_some() {
            if let Some(old_ws) = settings.workspace.as_deref() {
                self.remove_path(&layout::settings_file(old_ws))?;
            }
        }
        Ok(())
    }

    fn handle_settings_post_modified(&self, settings: &SettingsInfo) -> ListenerResult {
        self.handle_settings_added(settings)
    }

    fn handle_settings_removed(&self, settings: &SettingsInfo) -> ListenerResult {
        if let Some(ws) = settings.workspace.as_deref() {
            self.remove_path(&layout::settings_file(ws))?;
        }
        Ok(())
    }

    fn handle_service_added(&self, service: &ServiceInfo) -> ListenerResult {
        self.save_service(service)
    }

    fn handle_service_post_modified(&self, service: &ServiceInfo) -> ListenerResult {
        self.save_service(service)
    }

    fn handle_service_removed(&self, service: &ServiceInfo) -> ListenerResult {
        self.remove_path(&layout::service_file(
            service.workspace.as_deref(),
            &service.name,
        ))
    }
}

/// Keeps style definition files in step with their styles: renames follow
/// the style name (dodging existing files with a bounded numbered suffix),
/// workspace moves carry the file along, removal deletes it.
pub struct ResourcePersister {
    tree: ResourceTree,
    catalog: Weak<Catalog>,
}

impl ResourcePersister {
    pub fn new(tree: ResourceTree, catalog: &Arc<Catalog>) -> Self {
        Self {
            tree,
            catalog: Arc::downgrade(catalog),
        }
    }

    /// Rename the definition file to match the style's new name, probing
    /// `name.ext`, `name1.ext`, ... until a free slot is found or the
    /// attempt budget runs out.
    fn rename_definition(&self, old: &StyleInfo, new_name: &str) -> Result<String, DataDirError> {
        let ws = old.workspace.as_deref();
        let extension = old
            .filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_else(|| "sld".to_string());
        let from = layout::style_definition_file(ws, &old.filename);
        if !self.tree.get(&from).exists() {
            // Nothing on disk to rename; just retarget the filename.
            return Ok(format!("{new_name}.{extension}"));
        }

        let attempts = env::rename_attempts();
        let mut candidate = format!("{new_name}.{extension}");
        let mut i = 0u32;
        while self.tree.get(&layout::style_definition_file(ws, &candidate)).exists() {
            i += 1;
            if i > attempts {
                return Err(DataDirError::RenameExhausted {
                    base: new_name.to_string(),
                    extension,
                    attempts,
                });
            }
            candidate = format!("{new_name}{i}.{extension}");
        }
        self.tree
            .move_resource(&from, &layout::style_definition_file(ws, &candidate))?;
        Ok(candidate)
    }
}

impl CatalogListener for ResourcePersister {
    /// The only mutating hook: a style rename retargets `filename` before
    /// the diff-driven listeners and the in-memory swap see the item.
    fn handle_pre_modify(&self, item: &mut CatalogItem) -> ListenerResult {
        let CatalogItem::Style(new_style) = item else {
            return Ok(());
        };
        let catalog = upgrade(&self.catalog)?;
        let Some(CatalogItem::Style(old)) = catalog.get(new_style.id) else {
            return Ok(());
        };

        if old.name != new_style.name {
            let filename = self
                .rename_definition(&old, &new_style.name)
                .map_err(DataDirError::into_catalog)?;
            new_style.filename = filename;
        }
        if old.workspace != new_style.workspace {
            let from =
                layout::style_definition_file(old.workspace.as_deref(), &new_style.filename);
            let to = layout::style_definition_file(
                new_style.workspace.as_deref(),
                &new_style.filename,
            );
            self.tree.move_resource(&from, &to).map_err(DataDirError::into_catalog)?;
        }
        Ok(())
    }

    fn handle_remove(&self, event: &CatalogRemoveEvent) -> ListenerResult {
        if let CatalogItem::Style(style) = &event.item {
            let path = layout::style_definition_file(style.workspace.as_deref(), &style.filename);
            if let Err(e) = self.tree.remove(&path) {
                warn!("failed to remove style definition {path}: {e}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_catalog::Config;
    use atlas_core::{LayerGroupInfo, LayerInfo, NamespaceInfo, ResourceKind, StoreKind};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        tree: ResourceTree,
        catalog: Arc<Catalog>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();
        let catalog = Arc::new(Catalog::new());
        let codec = Arc::new(Mutex::new(Codec::new()));
        catalog.add_listener(Arc::new(ConfigPersister::new(
            tree.clone(),
            codec,
            &catalog,
            Vec::new(),
        )));
        catalog.add_listener(Arc::new(ResourcePersister::new(tree.clone(), &catalog)));
        Fixture {
            _dir: dir,
            tree,
            catalog,
        }
    }

    fn seed(f: &Fixture) -> (InfoId, InfoId, InfoId) {
        let ws_id = f.catalog.add(WorkspaceInfo::new("ws1")).unwrap();
        f.catalog
            .add(NamespaceInfo::new("ws1", "http://ws1.example.org"))
            .unwrap();
        let store_id = f
            .catalog
            .add(StoreInfo::new("shp", StoreKind::Data, ws_id))
            .unwrap();
        let res_id = f
            .catalog
            .add(ResourceInfo::new("rivers", ResourceKind::FeatureType, store_id))
            .unwrap();
        f.catalog.add(LayerInfo::new("rivers", res_id)).unwrap();
        (ws_id, store_id, res_id)
    }

    #[test]
    fn add_writes_expected_files() {
        let f = fixture();
        seed(&f);
        for path in [
            "workspaces/ws1/workspace.xml",
            "workspaces/ws1/namespace.xml",
            "workspaces/ws1/shp/datastore.xml",
            "workspaces/ws1/shp/rivers/featuretype.xml",
            "workspaces/ws1/shp/rivers/layer.xml",
        ] {
            assert!(f.tree.get(path).exists(), "missing {path}");
        }
    }

    #[test]
    fn workspace_rename_moves_subtree() {
        let f = fixture();
        let (ws_id, _, _) = seed(&f);

        let mut ws = f.catalog.workspace(ws_id).unwrap();
        ws.name = "ws2".to_string();
        f.catalog.update(ws).unwrap();

        assert!(!f.tree.get("workspaces/ws1").exists());
        assert!(f.tree.get("workspaces/ws2/shp/rivers/featuretype.xml").exists());
        assert!(f.tree.get("workspaces/ws2/workspace.xml").exists());
    }

    #[test]
    fn store_reassignment_moves_only_its_subtree() {
        let f = fixture();
        let (_, store_id, _) = seed(&f);
        let ws2_id = f.catalog.add(WorkspaceInfo::new("ws2")).unwrap();
        let other = f
            .catalog
            .add(StoreInfo::new("pg", StoreKind::Data, ws2_id))
            .unwrap();
        let _ = other;

        let mut store = f.catalog.store(store_id).unwrap();
        store.workspace_id = ws2_id;
        f.catalog.update(store).unwrap();

        assert!(!f.tree.get("workspaces/ws1/shp").exists());
        assert!(f.tree.get("workspaces/ws1/workspace.xml").exists());
        assert!(f.tree.get("workspaces/ws2/shp/rivers/featuretype.xml").exists());
    }

    #[test]
    fn remove_layer_keeps_resource_dir() {
        let f = fixture();
        let (_, _, res_id) = seed(&f);
        let layer = f.catalog.layer_for_resource(res_id).unwrap();
        f.catalog.remove(layer.id).unwrap();

        assert!(!f.tree.get("workspaces/ws1/shp/rivers/layer.xml").exists());
        assert!(f.tree.get("workspaces/ws1/shp/rivers/featuretype.xml").exists());
    }

    #[test]
    fn style_rename_renames_both_files() {
        let f = fixture();
        let style_id = f.catalog.add(StyleInfo::new("s1", "s1.sld")).unwrap();
        f.tree.get("styles/s1.sld").write(b"<sld/>").unwrap();

        let mut style = f.catalog.style_by_name(None, "s1").unwrap();
        style.name = "s2".to_string();
        f.catalog.update(style).unwrap();

        assert!(f.tree.get("styles/s2.xml").exists());
        assert!(f.tree.get("styles/s2.sld").exists());
        assert!(!f.tree.get("styles/s1.xml").exists());
        assert!(!f.tree.get("styles/s1.sld").exists());
        let updated = f.catalog.style_by_name(None, "s2").unwrap();
        assert_eq!(updated.id, style_id);
        assert_eq!(updated.filename, "s2.sld");
    }

    #[test]
    fn style_rename_dodges_occupied_target() {
        let f = fixture();
        f.catalog.add(StyleInfo::new("s1", "s1.sld")).unwrap();
        f.tree.get("styles/s1.sld").write(b"<sld/>").unwrap();
        f.tree.get("styles/s2.sld").write(b"<other/>").unwrap();

        let mut style = f.catalog.style_by_name(None, "s1").unwrap();
        style.name = "s2".to_string();
        f.catalog.update(style).unwrap();

        let updated = f.catalog.style_by_name(None, "s2").unwrap();
        assert_eq!(updated.filename, "s21.sld");
        assert!(f.tree.get("styles/s21.sld").exists());
    }

    #[test]
    fn style_remove_deletes_definition() {
        let f = fixture();
        let id = f.catalog.add(StyleInfo::new("s1", "s1.sld")).unwrap();
        f.tree.get("styles/s1.sld").write(b"<sld/>").unwrap();

        f.catalog.remove(id).unwrap();
        assert!(!f.tree.get("styles/s1.xml").exists());
        assert!(!f.tree.get("styles/s1.sld").exists());
    }

    #[test]
    fn default_workspace_sentinel_only_written_when_set() {
        let f = fixture();
        let (ws_id, _, _) = seed(&f);

        f.catalog.set_default_workspace(Some(ws_id)).unwrap();
        assert!(f.tree.get("workspaces/default.xml").exists());

        f.catalog.set_default_workspace(None).unwrap();
        // sentinel intentionally left behind
        assert!(f.tree.get("workspaces/default.xml").exists());
    }

    #[test]
    fn layer_group_rename_replaces_file() {
        let f = fixture();
        seed(&f);
        f.catalog
            .add(LayerGroupInfo::new("g1", vec!["rivers".into()]))
            .unwrap();
        assert!(f.tree.get("layergroups/g1.xml").exists());

        let mut group = f.catalog.layer_group_by_name(None, "g1").unwrap();
        group.name = "g2".to_string();
        f.catalog.update(group).unwrap();

        assert!(!f.tree.get("layergroups/g1.xml").exists());
        assert!(f.tree.get("layergroups/g2.xml").exists());
    }

    #[test]
    fn config_documents_persisted() {
        let f = fixture();
        let codec = Arc::new(Mutex::new(Codec::new()));
        let config = Arc::new(Config::new());
        config.add_listener(Arc::new(ConfigPersister::new(
            f.tree.clone(),
            codec,
            &f.catalog,
            Vec::new(),
        )));

        config.set_global(GlobalInfo::default()).unwrap();
        config.set_logging(LoggingInfo::default()).unwrap();
        config.add_settings(SettingsInfo::for_workspace("ws1")).unwrap();
        config.add_service(ServiceInfo::new("wms")).unwrap();

        assert!(f.tree.get("global.xml").exists());
        assert!(f.tree.get("logging.xml").exists());
        assert!(f.tree.get("workspaces/ws1/settings.xml").exists());
        assert!(f.tree.get("wms.xml").exists());

        config.remove_settings("ws1").unwrap();
        assert!(!f.tree.get("workspaces/ws1/settings.xml").exists());
    }
}
