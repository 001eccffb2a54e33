//! Bookkeeping listeners: update-sequence bumping and created/modified
//! timestamp stamping.

use std::sync::{Arc, Weak};

use chrono::Utc;

use atlas_core::{CatalogItem, LoggingInfo, ServiceInfo, SettingsInfo};

use crate::config::Config;
use crate::event::{CatalogAddEvent, CatalogPostModifyEvent, CatalogRemoveEvent};
use crate::listener::{CatalogListener, ConfigListener, ListenerResult};

/// Bumps the global monotonic update sequence on every catalog or config
/// mutation. Holds a weak reference to the config so the config can own the
/// listener without a reference cycle.
pub struct UpdateSequenceListener {
    config: Weak<Config>,
}

impl UpdateSequenceListener {
    pub fn new(config: &Arc<Config>) -> Self {
        Self {
            config: Arc::downgrade(config),
        }
    }

    fn bump(&self) {
        if let Some(config) = self.config.upgrade() {
            config.bump_update_sequence();
        }
    }
}

impl CatalogListener for UpdateSequenceListener {
    fn handle_add(&self, _event: &CatalogAddEvent) -> ListenerResult {
        self.bump();
        Ok(())
    }

    fn handle_post_modify(&self, _event: &CatalogPostModifyEvent) -> ListenerResult {
        self.bump();
        Ok(())
    }

    fn handle_remove(&self, _event: &CatalogRemoveEvent) -> ListenerResult {
        self.bump();
        Ok(())
    }
}

impl ConfigListener for UpdateSequenceListener {
    fn handle_post_logging_change(&self, _logging: &LoggingInfo) -> ListenerResult {
        self.bump();
        Ok(())
    }

    fn handle_settings_added(&self, _settings: &SettingsInfo) -> ListenerResult {
        self.bump();
        Ok(())
    }

    fn handle_settings_post_modified(&self, _settings: &SettingsInfo) -> ListenerResult {
        self.bump();
        Ok(())
    }

    fn handle_settings_removed(&self, _settings: &SettingsInfo) -> ListenerResult {
        self.bump();
        Ok(())
    }

    fn handle_service_added(&self, _service: &ServiceInfo) -> ListenerResult {
        self.bump();
        Ok(())
    }

    fn handle_service_post_modified(&self, _service: &ServiceInfo) -> ListenerResult {
        self.bump();
        Ok(())
    }

    fn handle_service_removed(&self, _service: &ServiceInfo) -> ListenerResult {
        self.bump();
        Ok(())
    }
}

/// Stamps `date_created` on add and `date_modified` on update through the
/// pre-mutation hooks (the only hooks allowed to touch the entity).
#[derive(Default)]
pub struct TimestampListener;

impl TimestampListener {
    pub fn new() -> Self {
        Self
    }
}

impl CatalogListener for TimestampListener {
    fn handle_pre_add(&self, item: &mut CatalogItem) {
        let metadata = item.metadata_mut();
        if metadata.date_created.is_none() {
            metadata.date_created = Some(Utc::now());
        }
    }

    fn handle_pre_modify(&self, item: &mut CatalogItem) -> ListenerResult {
        item.metadata_mut().touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use atlas_core::WorkspaceInfo;

    #[test]
    fn sequence_bumped_on_catalog_mutations() {
        let config = Arc::new(Config::new());
        let catalog = Catalog::new();
        catalog.add_listener(Arc::new(UpdateSequenceListener::new(&config)));

        let id = catalog.add(WorkspaceInfo::new("a")).unwrap();
        let mut ws = catalog.workspace(id).unwrap();
        ws.name = "b".to_string();
        catalog.update(ws).unwrap();
        catalog.remove(id).unwrap();

        assert_eq!(config.global().update_sequence, 3);
    }

    #[test]
    fn timestamps_stamped() {
        let catalog = Catalog::new();
        catalog.add_listener(Arc::new(TimestampListener::new()));

        let id = catalog.add(WorkspaceInfo::new("a")).unwrap();
        let ws = catalog.workspace(id).unwrap();
        assert!(ws.metadata.date_created.is_some());
        assert!(ws.metadata.date_modified.is_none());

        let mut renamed = ws.clone();
        renamed.name = "b".to_string();
        catalog.update(renamed).unwrap();
        assert!(catalog.workspace(id).unwrap().metadata.date_modified.is_some());
    }
}
