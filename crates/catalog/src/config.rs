//! The in-memory configuration: global and logging singletons, per-workspace
//! settings overrides, and per-service configuration entries.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::json;
use tracing::debug;

use atlas_core::{GlobalInfo, InfoId, LoggingInfo, ServiceInfo, SettingsInfo};

use crate::error::CatalogError;
use crate::event::PropertyChange;
use crate::listener::ConfigListener;

#[derive(Default)]
struct Inner {
    global: GlobalInfo,
    logging: LoggingInfo,
    /// Per-workspace settings overrides, keyed by workspace name.
    settings: HashMap<String, SettingsInfo>,
    services: Vec<ServiceInfo>,
}

/// Configuration container with the same synchronous copy-on-iterate
/// listener discipline as [`Catalog`](crate::Catalog).
#[derive(Default)]
pub struct Config {
    inner: RwLock<Inner>,
    listeners: RwLock<Vec<Arc<dyn ConfigListener>>>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Listener registration ───────────────────────────────────────

    pub fn add_listener(&self, listener: Arc<dyn ConfigListener>) {
        self.listeners.write().unwrap_or_else(|e| e.into_inner()).push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ConfigListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    pub fn clear_listeners(&self) {
        self.listeners.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn listeners(&self) -> Vec<Arc<dyn ConfigListener>> {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    // ── Global / logging ────────────────────────────────────────────

    pub fn global(&self) -> GlobalInfo {
        self.read().global.clone()
    }

    pub fn set_global(&self, global: GlobalInfo) -> Result<(), CatalogError> {
        {
            self.write().global = global.clone();
        }
        debug!("updated global configuration");
        for l in self.listeners() {
            l.handle_post_global_change(&global)?;
        }
        Ok(())
    }

    /// Reset every document to defaults without firing listeners. Only the
    /// reload path uses this, with persisters detached.
    pub fn clear(&self) {
        *self.write() = Inner::default();
    }

    /// Bump the monotonic update sequence without firing listeners; used by
    /// the update-sequence listener itself to avoid recursion.
    pub fn bump_update_sequence(&self) -> u64 {
        let mut inner = self.write();
        inner.global.update_sequence += 1;
        inner.global.update_sequence
    }

    pub fn logging(&self) -> LoggingInfo {
        self.read().logging.clone()
    }

    pub fn set_logging(&self, logging: LoggingInfo) -> Result<(), CatalogError> {
        {
            self.write().logging = logging.clone();
        }
        debug!("updated logging configuration");
        for l in self.listeners() {
            l.handle_post_logging_change(&logging)?;
        }
        Ok(())
    }

    // ── Per-workspace settings ──────────────────────────────────────

    pub fn settings_for(&self, workspace: &str) -> Option<SettingsInfo> {
        self.read().settings.get(workspace).cloned()
    }

    pub fn all_settings(&self) -> Vec<SettingsInfo> {
        self.read().settings.values().cloned().collect()
    }

    pub fn add_settings(&self, settings: SettingsInfo) -> Result<(), CatalogError> {
        let ws = settings.workspace.clone().ok_or(CatalogError::GlobalSettings)?;
        {
            let mut inner = self.write();
            if inner.settings.contains_key(&ws) {
                return Err(CatalogError::DuplicateName {
                    type_name: "settings",
                    name: ws,
                });
            }
            inner.settings.insert(ws, settings.clone());
        }
        for l in self.listeners() {
            l.handle_settings_added(&settings)?;
        }
        Ok(())
    }

    /// Update a workspace's settings. If the workspace association changed
    /// (the settings object moved), listeners see a `workspace` diff before
    /// the swap so they can move the backing file.
    pub fn update_settings(
        &self,
        old_workspace: &str,
        settings: SettingsInfo,
    ) -> Result<(), CatalogError> {
        let old = self
            .read()
            .settings
            .get(old_workspace)
            .cloned()
            .ok_or(CatalogError::NotFound(settings.id))?;

        let mut changes = Vec::new();
        if old.workspace != settings.workspace {
            changes.push(PropertyChange::new(
                "workspace",
                json!(old.workspace),
                json!(settings.workspace),
            ));
        }

        let listeners = self.listeners();
        for l in &listeners {
            l.handle_settings_modified(&old, &changes)?;
        }

        {
            let mut inner = self.write();
            inner.settings.remove(old_workspace);
            if let Some(ws) = settings.workspace.clone() {
                inner.settings.insert(ws, settings.clone());
            }
        }
        for l in &listeners {
            l.handle_settings_post_modified(&settings)?;
        }
        Ok(())
    }

    pub fn remove_settings(&self, workspace: &str) -> Result<SettingsInfo, CatalogError> {
        let removed = {
            let mut inner = self.write();
            inner.settings.remove(workspace)
        };
        let settings =
            removed.ok_or_else(|| CatalogError::SettingsNotFound(workspace.to_string()))?;
        for l in self.listeners() {
            l.handle_settings_removed(&settings)?;
        }
        Ok(settings)
    }

    // ── Services ────────────────────────────────────────────────────

    pub fn service(&self, name: &str, workspace: Option<&str>) -> Option<ServiceInfo> {
        self.read()
            .services
            .iter()
            .find(|s| s.name == name && s.workspace.as_deref() == workspace)
            .cloned()
    }

    pub fn services(&self) -> Vec<ServiceInfo> {
        self.read().services.clone()
    }

    pub fn add_service(&self, service: ServiceInfo) -> Result<(), CatalogError> {
        {
            let mut inner = self.write();
            if inner
                .services
                .iter()
                .any(|s| s.name == service.name && s.workspace == service.workspace)
            {
                return Err(CatalogError::DuplicateName {
                    type_name: "service",
                    name: service.name,
                });
            }
            inner.services.push(service.clone());
        }
        for l in self.listeners() {
            l.handle_service_added(&service)?;
        }
        Ok(())
    }

    pub fn update_service(&self, service: ServiceInfo) -> Result<(), CatalogError> {
        {
            let mut inner = self.write();
            let slot = inner
                .services
                .iter_mut()
                .find(|s| s.id == service.id)
                .ok_or(CatalogError::NotFound(service.id))?;
            *slot = service.clone();
        }
        for l in self.listeners() {
            l.handle_service_post_modified(&service)?;
        }
        Ok(())
    }

    pub fn remove_service(&self, id: InfoId) -> Result<ServiceInfo, CatalogError> {
        let service = {
            let mut inner = self.write();
            let idx = inner
                .services
                .iter()
                .position(|s| s.id == id)
                .ok_or(CatalogError::NotFound(id))?;
            inner.services.remove(idx)
        };
        for l in self.listeners() {
            l.handle_service_removed(&service)?;
        }
        Ok(service)
    }

    // ── Internals ───────────────────────────────────────────────────

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_lifecycle() {
        let config = Config::new();
        let settings = SettingsInfo::for_workspace("topp");
        config.add_settings(settings.clone()).unwrap();
        assert_eq!(config.settings_for("topp").unwrap().id, settings.id);

        config.remove_settings("topp").unwrap();
        assert!(config.settings_for("topp").is_none());
    }

    #[test]
    fn duplicate_settings_rejected() {
        let config = Config::new();
        config.add_settings(SettingsInfo::for_workspace("topp")).unwrap();
        let err = config
            .add_settings(SettingsInfo::for_workspace("topp"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName { .. }));
    }

    #[test]
    fn global_settings_instance_rejected() {
        let config = Config::new();
        let err = config.add_settings(SettingsInfo::default()).unwrap_err();
        assert!(matches!(err, CatalogError::GlobalSettings));
    }

    #[test]
    fn removing_missing_settings_reports_not_found() {
        let config = Config::new();
        let err = config.remove_settings("ghost").unwrap_err();
        assert!(matches!(err, CatalogError::SettingsNotFound(ws) if ws == "ghost"));
    }

    #[test]
    fn service_scoping() {
        let config = Config::new();
        let mut global = ServiceInfo::new("wms");
        global.title = Some("global wms".into());
        let mut scoped = ServiceInfo::new("wms");
        scoped.workspace = Some("topp".into());

        config.add_service(global).unwrap();
        config.add_service(scoped).unwrap();

        assert!(config.service("wms", None).is_some());
        assert!(config.service("wms", Some("topp")).is_some());
        assert!(config.service("wms", Some("other")).is_none());
    }

    #[test]
    fn update_sequence_bumps_without_listeners() {
        let config = Config::new();
        assert_eq!(config.bump_update_sequence(), 1);
        assert_eq!(config.bump_update_sequence(), 2);
        assert_eq!(config.global().update_sequence, 2);
    }
}
