use atlas_core::InfoId;
use thiserror::Error;

/// Errors produced by [`Catalog`](crate::Catalog) and
/// [`Config`](crate::Config) mutations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{type_name} '{name}' already exists in this scope")]
    DuplicateName {
        type_name: &'static str,
        name: String,
    },

    #[error("entity {0} not found")]
    NotFound(InfoId),

    #[error("layer group '{0}' has no layers, refusing to add it")]
    EmptyLayerGroup(String),

    #[error("{referent} references missing {target_type} {target_id}")]
    DanglingReference {
        referent: String,
        target_type: &'static str,
        target_id: InfoId,
    },

    #[error("update for {0} does not match the stored entity kind")]
    KindMismatch(InfoId),

    /// Settings without a workspace are the global instance embedded in the
    /// global configuration, not a standalone entry.
    #[error("settings without a workspace belong to the global configuration")]
    GlobalSettings,

    #[error("no settings registered for workspace '{0}'")]
    SettingsNotFound(String),

    /// A listener (typically the persister) failed while mirroring the
    /// mutation; the failure surfaces to whoever called the mutation.
    #[error("persist failed: {0}")]
    Persist(String),
}
