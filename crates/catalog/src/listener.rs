//! Listener traits for catalog and config mutations.
//!
//! Fan-out is synchronous on the mutating thread and uses a copy-on-iterate
//! snapshot of the listener list, so listeners may register or deregister
//! other listeners from within a callback.

use atlas_core::{
    CatalogItem, GlobalInfo, LoggingInfo, ServiceInfo, SettingsInfo, WorkspaceInfo,
};

use crate::error::CatalogError;
use crate::event::{
    CatalogAddEvent, CatalogModifyEvent, CatalogPostModifyEvent, CatalogRemoveEvent,
    PropertyChange,
};

pub type ListenerResult = Result<(), CatalogError>;

/// Reacts to catalog mutations. All methods default to no-ops so listeners
/// implement only what they care about.
pub trait CatalogListener: Send + Sync {
    /// Invoked before the item is inserted; the only hook that may mutate
    /// the entity (used for timestamp stamping).
    fn handle_pre_add(&self, _item: &mut CatalogItem) {}

    fn handle_add(&self, _event: &CatalogAddEvent) -> ListenerResult {
        Ok(())
    }

    /// Invoked before the in-memory swap; the catalog still holds the old
    /// copy, so path computations against current state see pre-change names.
    fn handle_modify(&self, _event: &CatalogModifyEvent) -> ListenerResult {
        Ok(())
    }

    /// Counterpart of [`handle_pre_add`](Self::handle_pre_add) for updates.
    /// May mutate the updated entity (timestamp stamping, filename fix-ups)
    /// and may fail, aborting the update before anything is swapped.
    fn handle_pre_modify(&self, _item: &mut CatalogItem) -> ListenerResult {
        Ok(())
    }

    fn handle_post_modify(&self, _event: &CatalogPostModifyEvent) -> ListenerResult {
        Ok(())
    }

    fn handle_remove(&self, _event: &CatalogRemoveEvent) -> ListenerResult {
        Ok(())
    }

    /// The default-workspace pointer changed. `new` is `None` when the
    /// default was cleared.
    fn handle_default_workspace_change(&self, _new: Option<&WorkspaceInfo>) -> ListenerResult {
        Ok(())
    }
}

/// Reacts to configuration mutations (global, logging, settings, services).
pub trait ConfigListener: Send + Sync {
    fn handle_post_global_change(&self, _global: &GlobalInfo) -> ListenerResult {
        Ok(())
    }

    fn handle_post_logging_change(&self, _logging: &LoggingInfo) -> ListenerResult {
        Ok(())
    }

    fn handle_settings_added(&self, _settings: &SettingsInfo) -> ListenerResult {
        Ok(())
    }

    /// Pre-swap notification carrying the tracked property diff; used to
    /// detect a settings object moving between workspaces.
    fn handle_settings_modified(
        &self,
        _settings: &SettingsInfo,
        _changes: &[PropertyChange],
    ) -> ListenerResult {
        Ok(())
    }

    fn handle_settings_post_modified(&self, _settings: &SettingsInfo) -> ListenerResult {
        Ok(())
    }

    fn handle_settings_removed(&self, _settings: &SettingsInfo) -> ListenerResult {
        Ok(())
    }

    fn handle_service_added(&self, _service: &ServiceInfo) -> ListenerResult {
        Ok(())
    }

    fn handle_service_post_modified(&self, _service: &ServiceInfo) -> ListenerResult {
        Ok(())
    }

    fn handle_service_removed(&self, _service: &ServiceInfo) -> ListenerResult {
        Ok(())
    }
}
