//! The in-memory catalog: id-keyed entity maps, name lookups, and the
//! synchronous listener fan-out that keeps the data directory in sync.

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use serde_json::{json, Value};
use tracing::debug;

use atlas_core::{
    CatalogItem, InfoId, LayerGroupInfo, LayerInfo, NamespaceInfo, ResourceInfo, StoreInfo,
    StyleInfo, WorkspaceInfo,
};

use crate::error::CatalogError;
use crate::event::{
    CatalogAddEvent, CatalogModifyEvent, CatalogPostModifyEvent, CatalogRemoveEvent,
    PropertyChange,
};
use crate::listener::CatalogListener;

// IndexMap keeps insertion order, so bulk reads iterate in load order
// instead of hash order.
#[derive(Default)]
struct Inner {
    workspaces: IndexMap<InfoId, WorkspaceInfo>,
    namespaces: IndexMap<InfoId, NamespaceInfo>,
    stores: IndexMap<InfoId, StoreInfo>,
    resources: IndexMap<InfoId, ResourceInfo>,
    layers: IndexMap<InfoId, LayerInfo>,
    styles: IndexMap<InfoId, StyleInfo>,
    layer_groups: IndexMap<InfoId, LayerGroupInfo>,
    default_workspace: Option<InfoId>,
}

/// Entity counts, mostly for diagnostics and the `datadir-check` binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub workspaces: usize,
    pub namespaces: usize,
    pub stores: usize,
    pub resources: usize,
    pub layers: usize,
    pub styles: usize,
    pub layer_groups: usize,
}

/// The in-memory catalog. Mutations validate, apply, and then fan events out
/// to registered listeners synchronously on the calling thread; a listener
/// failure (typically a persister I/O error) surfaces to the mutating caller.
#[derive(Default)]
pub struct Catalog {
    inner: RwLock<Inner>,
    listeners: RwLock<Vec<Arc<dyn CatalogListener>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Listener registration ───────────────────────────────────────

    pub fn add_listener(&self, listener: Arc<dyn CatalogListener>) {
        self.listeners.write().unwrap_or_else(|e| e.into_inner()).push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn CatalogListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    pub fn clear_listeners(&self) {
        self.listeners.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Snapshot of the listener list; iteration happens over the snapshot so
    /// callbacks can safely (de)register listeners.
    fn listeners(&self) -> Vec<Arc<dyn CatalogListener>> {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Validate and insert an entity, firing `handle_pre_add` (which may
    /// stamp metadata) and then `handle_add`.
    pub fn add(&self, item: impl Into<CatalogItem>) -> Result<InfoId, CatalogError> {
        let mut item = item.into();
        self.validate_new(&item)?;

        let listeners = self.listeners();
        for l in &listeners {
            l.handle_pre_add(&mut item);
        }

        let id = item.id();
        self.insert(item.clone());
        debug!("added {} to catalog", item);

        let event = CatalogAddEvent { item };
        for l in &listeners {
            l.handle_add(&event)?;
        }
        Ok(id)
    }

    /// Replace a stored entity with an updated copy. Fires `handle_modify`
    /// with the old copy still in place (so listeners compute paths against
    /// pre-change state), swaps, then fires `handle_post_modify`.
    pub fn update(&self, item: impl Into<CatalogItem>) -> Result<(), CatalogError> {
        let mut item = item.into();
        let id = item.id();
        let old = self.get(id).ok_or(CatalogError::NotFound(id))?;
        if std::mem::discriminant(&old) != std::mem::discriminant(&item) {
            return Err(CatalogError::KindMismatch(id));
        }
        self.validate_update(&item)?;
        let changes = diff(&old, &item);

        let listeners = self.listeners();
        for l in &listeners {
            l.handle_pre_modify(&mut item)?;
        }

        let modify = CatalogModifyEvent {
            item: old,
            changes: changes.clone(),
        };
        for l in &listeners {
            l.handle_modify(&modify)?;
        }

        self.insert(item.clone());
        debug!("updated {} in catalog", item);

        let post = CatalogPostModifyEvent { item, changes };
        for l in &listeners {
            l.handle_post_modify(&post)?;
        }
        Ok(())
    }

    /// Replace a stored entity without firing any listeners. Used when the
    /// in-memory copy is refreshed with data that is already on disk (for
    /// example connection passwords decrypted after load) and a persister
    /// round-trip would be wrong.
    pub fn replace_quietly(&self, item: impl Into<CatalogItem>) -> Result<(), CatalogError> {
        let item = item.into();
        let id = item.id();
        let old = self.get(id).ok_or(CatalogError::NotFound(id))?;
        if std::mem::discriminant(&old) != std::mem::discriminant(&item) {
            return Err(CatalogError::KindMismatch(id));
        }
        self.insert(item);
        Ok(())
    }

    /// Drop every entity without firing listeners. Only the reload path uses
    /// this, with persisters detached, so the data directory is untouched.
    pub fn clear(&self) {
        *self.write() = Inner::default();
    }

    /// Remove an entity and fire `handle_remove`. Removal does not cascade
    /// in memory; callers remove children first.
    pub fn remove(&self, id: InfoId) -> Result<CatalogItem, CatalogError> {
        let item = {
            let mut inner = self.write();
            let item = take(&mut inner, id).ok_or(CatalogError::NotFound(id))?;
            if inner.default_workspace == Some(id) {
                inner.default_workspace = None;
            }
            item
        };
        debug!("removed {} from catalog", item);

        let event = CatalogRemoveEvent { item: item.clone() };
        for l in self.listeners() {
            l.handle_remove(&event)?;
        }
        Ok(item)
    }

    /// Change the default-workspace pointer. `None` clears it; listeners
    /// decide what (if anything) to persist in that case.
    pub fn set_default_workspace(&self, id: Option<InfoId>) -> Result<(), CatalogError> {
        let ws = {
            let mut inner = self.write();
            let ws = match id {
                Some(id) => Some(
                    inner
                        .workspaces
                        .get(&id)
                        .cloned()
                        .ok_or(CatalogError::NotFound(id))?,
                ),
                None => None,
            };
            inner.default_workspace = id;
            ws
        };
        for l in self.listeners() {
            l.handle_default_workspace_change(ws.as_ref())?;
        }
        Ok(())
    }

    // ── Lookups ─────────────────────────────────────────────────────

    pub fn get(&self, id: InfoId) -> Option<CatalogItem> {
        let inner = self.read();
        if let Some(i) = inner.workspaces.get(&id) {
            return Some(CatalogItem::Workspace(i.clone()));
        }
        if let Some(i) = inner.namespaces.get(&id) {
            return Some(CatalogItem::Namespace(i.clone()));
        }
        if let Some(i) = inner.stores.get(&id) {
            return Some(CatalogItem::Store(i.clone()));
        }
        if let Some(i) = inner.resources.get(&id) {
            return Some(CatalogItem::Resource(i.clone()));
        }
        if let Some(i) = inner.layers.get(&id) {
            return Some(CatalogItem::Layer(i.clone()));
        }
        if let Some(i) = inner.styles.get(&id) {
            return Some(CatalogItem::Style(i.clone()));
        }
        if let Some(i) = inner.layer_groups.get(&id) {
            return Some(CatalogItem::LayerGroup(i.clone()));
        }
        None
    }

    pub fn workspace(&self, id: InfoId) -> Option<WorkspaceInfo> {
        self.read().workspaces.get(&id).cloned()
    }

    pub fn workspace_by_name(&self, name: &str) -> Option<WorkspaceInfo> {
        self.read().workspaces.values().find(|w| w.name == name).cloned()
    }

    pub fn workspaces(&self) -> Vec<WorkspaceInfo> {
        self.read().workspaces.values().cloned().collect()
    }

    pub fn default_workspace(&self) -> Option<WorkspaceInfo> {
        let inner = self.read();
        inner
            .default_workspace
            .and_then(|id| inner.workspaces.get(&id).cloned())
    }

    pub fn namespace_by_prefix(&self, prefix: &str) -> Option<NamespaceInfo> {
        self.read().namespaces.values().find(|n| n.prefix == prefix).cloned()
    }

    pub fn namespaces(&self) -> Vec<NamespaceInfo> {
        self.read().namespaces.values().cloned().collect()
    }

    pub fn store(&self, id: InfoId) -> Option<StoreInfo> {
        self.read().stores.get(&id).cloned()
    }

    pub fn store_by_name(&self, workspace_id: InfoId, name: &str) -> Option<StoreInfo> {
        self.read()
            .stores
            .values()
            .find(|s| s.workspace_id == workspace_id && s.name == name)
            .cloned()
    }

    pub fn stores_by_workspace(&self, workspace_id: InfoId) -> Vec<StoreInfo> {
        self.read()
            .stores
            .values()
            .filter(|s| s.workspace_id == workspace_id)
            .cloned()
            .collect()
    }

    pub fn stores(&self) -> Vec<StoreInfo> {
        self.read().stores.values().cloned().collect()
    }

    pub fn resource(&self, id: InfoId) -> Option<ResourceInfo> {
        self.read().resources.get(&id).cloned()
    }

    pub fn resource_by_name(&self, store_id: InfoId, name: &str) -> Option<ResourceInfo> {
        self.read()
            .resources
            .values()
            .find(|r| r.store_id == store_id && r.name == name)
            .cloned()
    }

    pub fn resources_by_store(&self, store_id: InfoId) -> Vec<ResourceInfo> {
        self.read()
            .resources
            .values()
            .filter(|r| r.store_id == store_id)
            .cloned()
            .collect()
    }

    pub fn layer(&self, id: InfoId) -> Option<LayerInfo> {
        self.read().layers.get(&id).cloned()
    }

    pub fn layer_by_name(&self, name: &str) -> Option<LayerInfo> {
        self.read().layers.values().find(|l| l.name == name).cloned()
    }

    pub fn layer_for_resource(&self, resource_id: InfoId) -> Option<LayerInfo> {
        self.read()
            .layers
            .values()
            .find(|l| l.resource_id == resource_id)
            .cloned()
    }

    pub fn style_by_name(&self, workspace: Option<&str>, name: &str) -> Option<StyleInfo> {
        self.read()
            .styles
            .values()
            .find(|s| s.workspace.as_deref() == workspace && s.name == name)
            .cloned()
    }

    pub fn styles(&self) -> Vec<StyleInfo> {
        self.read().styles.values().cloned().collect()
    }

    pub fn layer_group_by_name(
        &self,
        workspace: Option<&str>,
        name: &str,
    ) -> Option<LayerGroupInfo> {
        self.read()
            .layer_groups
            .values()
            .find(|g| g.workspace.as_deref() == workspace && g.name == name)
            .cloned()
    }

    pub fn layer_groups(&self) -> Vec<LayerGroupInfo> {
        self.read().layer_groups.values().cloned().collect()
    }

    pub fn stats(&self) -> CatalogStats {
        let inner = self.read();
        CatalogStats {
            workspaces: inner.workspaces.len(),
            namespaces: inner.namespaces.len(),
            stores: inner.stores.len(),
            resources: inner.resources.len(),
            layers: inner.layers.len(),
            styles: inner.styles.len(),
            layer_groups: inner.layer_groups.len(),
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, item: CatalogItem) {
        let mut inner = self.write();
        match item {
            CatalogItem::Workspace(i) => {
                inner.workspaces.insert(i.id, i);
            }
            CatalogItem::Namespace(i) => {
                inner.namespaces.insert(i.id, i);
            }
            CatalogItem::Store(i) => {
                inner.stores.insert(i.id, i);
            }
            CatalogItem::Resource(i) => {
                inner.resources.insert(i.id, i);
            }
            CatalogItem::Layer(i) => {
                inner.layers.insert(i.id, i);
            }
            CatalogItem::Style(i) => {
                inner.styles.insert(i.id, i);
            }
            CatalogItem::LayerGroup(i) => {
                inner.layer_groups.insert(i.id, i);
            }
        }
    }

    /// Scope-uniqueness and reference checks for a new entity.
    fn validate_new(&self, item: &CatalogItem) -> Result<(), CatalogError> {
        let inner = self.read();
        let duplicate = |name: &str| CatalogError::DuplicateName {
            type_name: item.type_name(),
            name: name.to_string(),
        };
        match item {
            CatalogItem::Workspace(w) => {
                if inner.workspaces.values().any(|o| o.name == w.name) {
                    return Err(duplicate(&w.name));
                }
            }
            CatalogItem::Namespace(n) => {
                if inner.namespaces.values().any(|o| o.prefix == n.prefix) {
                    return Err(duplicate(&n.prefix));
                }
            }
            CatalogItem::Store(s) => {
                if !inner.workspaces.contains_key(&s.workspace_id) {
                    return Err(CatalogError::DanglingReference {
                        referent: format!("store '{}'", s.name),
                        target_type: "workspace",
                        target_id: s.workspace_id,
                    });
                }
                if inner
                    .stores
                    .values()
                    .any(|o| o.workspace_id == s.workspace_id && o.name == s.name)
                {
                    return Err(duplicate(&s.name));
                }
            }
            CatalogItem::Resource(r) => {
                if !inner.stores.contains_key(&r.store_id) {
                    return Err(CatalogError::DanglingReference {
                        referent: format!("resource '{}'", r.name),
                        target_type: "store",
                        target_id: r.store_id,
                    });
                }
                if inner
                    .resources
                    .values()
                    .any(|o| o.store_id == r.store_id && o.name == r.name)
                {
                    return Err(duplicate(&r.name));
                }
            }
            CatalogItem::Layer(l) => {
                if !inner.resources.contains_key(&l.resource_id) {
                    return Err(CatalogError::DanglingReference {
                        referent: format!("layer '{}'", l.name),
                        target_type: "resource",
                        target_id: l.resource_id,
                    });
                }
                if inner.layers.values().any(|o| o.name == l.name) {
                    return Err(duplicate(&l.name));
                }
            }
            CatalogItem::Style(s) => {
                if inner
                    .styles
                    .values()
                    .any(|o| o.workspace == s.workspace && o.name == s.name)
                {
                    return Err(duplicate(&s.name));
                }
            }
            CatalogItem::LayerGroup(g) => {
                if g.layers.is_empty() {
                    return Err(CatalogError::EmptyLayerGroup(g.name.clone()));
                }
                if inner
                    .layer_groups
                    .values()
                    .any(|o| o.workspace == g.workspace && o.name == g.name)
                {
                    return Err(duplicate(&g.name));
                }
            }
        }
        Ok(())
    }

    /// The update counterpart of [`validate_new`](Self::validate_new): the
    /// same emptiness and scope-uniqueness rules, ignoring the stored copy
    /// of the entity itself.
    fn validate_update(&self, item: &CatalogItem) -> Result<(), CatalogError> {
        let inner = self.read();
        let id = item.id();
        let duplicate = |name: &str| CatalogError::DuplicateName {
            type_name: item.type_name(),
            name: name.to_string(),
        };
        match item {
            CatalogItem::Workspace(w) => {
                if inner.workspaces.values().any(|o| o.id != id && o.name == w.name) {
                    return Err(duplicate(&w.name));
                }
            }
            CatalogItem::Namespace(n) => {
                if inner.namespaces.values().any(|o| o.id != id && o.prefix == n.prefix) {
                    return Err(duplicate(&n.prefix));
                }
            }
            CatalogItem::Store(s) => {
                if inner
                    .stores
                    .values()
                    .any(|o| o.id != id && o.workspace_id == s.workspace_id && o.name == s.name)
                {
                    return Err(duplicate(&s.name));
                }
            }
            CatalogItem::Resource(r) => {
                if inner
                    .resources
                    .values()
                    .any(|o| o.id != id && o.store_id == r.store_id && o.name == r.name)
                {
                    return Err(duplicate(&r.name));
                }
            }
            CatalogItem::Layer(l) => {
                if inner.layers.values().any(|o| o.id != id && o.name == l.name) {
                    return Err(duplicate(&l.name));
                }
            }
            CatalogItem::Style(s) => {
                if inner
                    .styles
                    .values()
                    .any(|o| o.id != id && o.workspace == s.workspace && o.name == s.name)
                {
                    return Err(duplicate(&s.name));
                }
            }
            CatalogItem::LayerGroup(g) => {
                if g.layers.is_empty() {
                    return Err(CatalogError::EmptyLayerGroup(g.name.clone()));
                }
                if inner
                    .layer_groups
                    .values()
                    .any(|o| o.id != id && o.workspace == g.workspace && o.name == g.name)
                {
                    return Err(duplicate(&g.name));
                }
            }
        }
        Ok(())
    }
}

/// Take an entity of unknown kind out of the maps.
fn take(inner: &mut Inner, id: InfoId) -> Option<CatalogItem> {
    if let Some(i) = inner.workspaces.shift_remove(&id) {
        return Some(CatalogItem::Workspace(i));
    }
    if let Some(i) = inner.namespaces.shift_remove(&id) {
        return Some(CatalogItem::Namespace(i));
    }
    if let Some(i) = inner.stores.shift_remove(&id) {
        return Some(CatalogItem::Store(i));
    }
    if let Some(i) = inner.resources.shift_remove(&id) {
        return Some(CatalogItem::Resource(i));
    }
    if let Some(i) = inner.layers.shift_remove(&id) {
        return Some(CatalogItem::Layer(i));
    }
    if let Some(i) = inner.styles.shift_remove(&id) {
        return Some(CatalogItem::Style(i));
    }
    if let Some(i) = inner.layer_groups.shift_remove(&id) {
        return Some(CatalogItem::LayerGroup(i));
    }
    None
}

/// Diff of the properties the persister tracks: `name` plus the parent
/// reference (`workspace` / `store`) where reassignment means a subtree move.
fn diff(old: &CatalogItem, new: &CatalogItem) -> Vec<PropertyChange> {
    let mut changes = Vec::new();
    if old.name() != new.name() {
        changes.push(PropertyChange::new(
            "name",
            Value::String(old.name().to_string()),
            Value::String(new.name().to_string()),
        ));
    }
    match (old, new) {
        (CatalogItem::Store(o), CatalogItem::Store(n)) => {
            if o.workspace_id != n.workspace_id {
                changes.push(PropertyChange::new(
                    "workspace",
                    json!(o.workspace_id),
                    json!(n.workspace_id),
                ));
            }
        }
        (CatalogItem::Resource(o), CatalogItem::Resource(n)) => {
            if o.store_id != n.store_id {
                changes.push(PropertyChange::new(
                    "store",
                    json!(o.store_id),
                    json!(n.store_id),
                ));
            }
        }
        (CatalogItem::Style(o), CatalogItem::Style(n)) => {
            if o.workspace != n.workspace {
                changes.push(PropertyChange::new(
                    "workspace",
                    json!(o.workspace),
                    json!(n.workspace),
                ));
            }
        }
        (CatalogItem::LayerGroup(o), CatalogItem::LayerGroup(n)) => {
            if o.workspace != n.workspace {
                changes.push(PropertyChange::new(
                    "workspace",
                    json!(o.workspace),
                    json!(n.workspace),
                ));
            }
        }
        _ => {}
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::{ResourceKind, StoreKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn add_and_lookup() {
        let catalog = Catalog::new();
        let ws = WorkspaceInfo::new("topp");
        let ws_id = catalog.add(ws).unwrap();

        let store = StoreInfo::new("shp", StoreKind::Data, ws_id);
        let store_id = catalog.add(store).unwrap();

        assert_eq!(catalog.workspace_by_name("topp").unwrap().id, ws_id);
        assert_eq!(catalog.store_by_name(ws_id, "shp").unwrap().id, store_id);
        assert_eq!(catalog.stats().stores, 1);
    }

    #[test]
    fn duplicate_workspace_rejected() {
        let catalog = Catalog::new();
        catalog.add(WorkspaceInfo::new("topp")).unwrap();
        let err = catalog.add(WorkspaceInfo::new("topp")).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName { .. }));
    }

    #[test]
    fn empty_layer_group_rejected() {
        let catalog = Catalog::new();
        let err = catalog
            .add(LayerGroupInfo::new("empty", Vec::new()))
            .unwrap_err();
        assert!(matches!(err, CatalogError::EmptyLayerGroup(_)));
    }

    #[test]
    fn dangling_store_reference_rejected() {
        let catalog = Catalog::new();
        let err = catalog
            .add(StoreInfo::new("shp", StoreKind::Data, uuid::Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DanglingReference { .. }));
    }

    #[test]
    fn update_produces_name_diff() {
        struct Capture(std::sync::Mutex<Vec<PropertyChange>>);
        impl CatalogListener for Capture {
            fn handle_modify(&self, event: &CatalogModifyEvent) -> crate::ListenerResult {
                self.0.lock().unwrap().extend(event.changes.clone());
                Ok(())
            }
        }

        let catalog = Catalog::new();
        let ws_id = catalog.add(WorkspaceInfo::new("old")).unwrap();
        let capture = Arc::new(Capture(std::sync::Mutex::new(Vec::new())));
        catalog.add_listener(capture.clone());

        let mut ws = catalog.workspace(ws_id).unwrap();
        ws.name = "new".to_string();
        catalog.update(ws).unwrap();

        let changes = capture.0.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].name, "name");
        assert_eq!(changes[0].old, Value::String("old".into()));
        assert_eq!(changes[0].new, Value::String("new".into()));
    }

    #[test]
    fn listener_registration_safe_from_callback() {
        struct SelfRemoving {
            catalog: std::sync::Weak<Catalog>,
            me: std::sync::Mutex<Option<Arc<dyn CatalogListener>>>,
            calls: AtomicUsize,
        }
        impl CatalogListener for SelfRemoving {
            fn handle_add(&self, _event: &CatalogAddEvent) -> crate::ListenerResult {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if let (Some(catalog), Some(me)) =
                    (self.catalog.upgrade(), self.me.lock().unwrap().take())
                {
                    catalog.remove_listener(&me);
                }
                Ok(())
            }
        }

        let catalog = Arc::new(Catalog::new());
        let listener = Arc::new(SelfRemoving {
            catalog: Arc::downgrade(&catalog),
            me: std::sync::Mutex::new(None),
            calls: AtomicUsize::new(0),
        });
        let as_dyn: Arc<dyn CatalogListener> = listener.clone();
        *listener.me.lock().unwrap() = Some(as_dyn.clone());
        catalog.add_listener(as_dyn);

        catalog.add(WorkspaceInfo::new("a")).unwrap();
        catalog.add(WorkspaceInfo::new("b")).unwrap();

        // Deregistered itself during the first callback.
        assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
        assert_eq!(catalog.listener_count(), 0);
    }

    #[test]
    fn default_workspace_pointer() {
        let catalog = Catalog::new();
        let ws_id = catalog.add(WorkspaceInfo::new("topp")).unwrap();
        catalog.set_default_workspace(Some(ws_id)).unwrap();
        assert_eq!(catalog.default_workspace().unwrap().id, ws_id);

        catalog.set_default_workspace(None).unwrap();
        assert!(catalog.default_workspace().is_none());
    }

    #[test]
    fn update_to_empty_layer_group_rejected() {
        let catalog = Catalog::new();
        let ws_id = catalog.add(WorkspaceInfo::new("topp")).unwrap();
        let store_id = catalog.add(StoreInfo::new("shp", StoreKind::Data, ws_id)).unwrap();
        let res_id = catalog
            .add(ResourceInfo::new("states", ResourceKind::FeatureType, store_id))
            .unwrap();
        catalog.add(LayerInfo::new("states", res_id)).unwrap();
        let group_id = catalog
            .add(LayerGroupInfo::new("usa", vec!["states".into()]))
            .unwrap();

        let mut group = catalog.layer_group_by_name(None, "usa").unwrap();
        group.layers.clear();
        let err = catalog.update(group).unwrap_err();
        assert!(matches!(err, CatalogError::EmptyLayerGroup(_)));

        // the stored copy is untouched
        let stored = catalog.layer_group_by_name(None, "usa").unwrap();
        assert_eq!(stored.id, group_id);
        assert_eq!(stored.layers, vec!["states".to_string()]);
    }

    #[test]
    fn rename_to_taken_name_rejected() {
        let catalog = Catalog::new();
        catalog.add(WorkspaceInfo::new("a")).unwrap();
        let b_id = catalog.add(WorkspaceInfo::new("b")).unwrap();

        let mut b = catalog.workspace(b_id).unwrap();
        b.name = "a".to_string();
        let err = catalog.update(b).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName { .. }));
        assert_eq!(catalog.workspace(b_id).unwrap().name, "b");

        // an update that keeps its own name is not a collision with itself
        let mut same = catalog.workspace(b_id).unwrap();
        same.isolated = true;
        catalog.update(same).unwrap();
    }

    #[test]
    fn remove_clears_default_pointer() {
        let catalog = Catalog::new();
        let ws_id = catalog.add(WorkspaceInfo::new("topp")).unwrap();
        catalog.set_default_workspace(Some(ws_id)).unwrap();
        catalog.remove(ws_id).unwrap();
        assert!(catalog.default_workspace().is_none());
    }
}
