//! Configuration model: global settings, logging, per-workspace overrides
//! and per-service configuration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::InfoId;
use crate::metadata::Metadata;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Settings, either global (embedded in [`GlobalInfo`], `workspace: None`)
/// or a per-workspace override. Absence of a per-workspace instance means
/// "inherit global".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsInfo {
    pub id: InfoId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_base_url: Option<String>,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

impl Default for SettingsInfo {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace: None,
            title: None,
            contact: ContactInfo::default(),
            proxy_base_url: None,
            charset: default_charset(),
            verbose: false,
            metadata: Metadata::default(),
        }
    }
}

impl SettingsInfo {
    pub fn for_workspace(workspace: impl Into<String>) -> Self {
        Self {
            workspace: Some(workspace.into()),
            ..Self::default()
        }
    }
}

/// How resource misconfiguration discovered at load time is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceErrorHandling {
    /// Fail the offending request with a service exception.
    OgcExceptionReport,
    /// Skip misconfigured layers; also disables startup store probing.
    SkipMisconfiguredLayers,
}

impl Default for ResourceErrorHandling {
    fn default() -> Self {
        ResourceErrorHandling::OgcExceptionReport
    }
}

/// Root configuration singleton, persisted as `global.xml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalInfo {
    pub id: InfoId,
    pub settings: SettingsInfo,
    /// Monotonic counter bumped on every catalog/config mutation.
    #[serde(default)]
    pub update_sequence: u64,
    #[serde(default)]
    pub resource_error_handling: ResourceErrorHandling,
    #[serde(default = "default_feature_type_cache_size")]
    pub feature_type_cache_size: u32,
    #[serde(default = "default_true")]
    pub global_services: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_feature_type_cache_size() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for GlobalInfo {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            settings: SettingsInfo::default(),
            update_sequence: 0,
            resource_error_handling: ResourceErrorHandling::default(),
            feature_type_cache_size: default_feature_type_cache_size(),
            global_services: true,
            metadata: Metadata::default(),
        }
    }
}

/// Logging configuration singleton, persisted as `logging.xml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingInfo {
    pub id: InfoId,
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default = "default_true")]
    pub std_out_logging: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Default for LoggingInfo {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            level: "INFO".to_string(),
            location: None,
            std_out_logging: true,
            metadata: Metadata::default(),
        }
    }
}

/// Per-service (OGC service type) configuration, global or workspace-scoped.
/// Loaded and saved through the pluggable per-type service loaders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub id: InfoId,
    /// Service type identifier, e.g. `wms`, `wfs`, `wcs`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#abstract: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ServiceInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            workspace: None,
            enabled: true,
            title: None,
            r#abstract: None,
            maintainer: None,
            metadata: Metadata::default(),
        }
    }
}
