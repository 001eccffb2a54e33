//! The on-disk path scheme.
//!
//! Every function returns a slash-separated path relative to the tree root,
//! so the loader and persisters agree byte-for-byte on where each entity
//! lives. The layout is part of the data directory's compatibility contract
//! and must not drift.
//!
//! ```text
//! global.xml                                  logging.xml
//! workspaces/default.xml                      <- default-workspace sentinel
//! workspaces/<ws>/workspace.xml               workspaces/<ws>/namespace.xml
//! workspaces/<ws>/settings.xml                workspaces/<ws>/<service>.xml
//! workspaces/<ws>/<store>/<marker>.xml        <- datastore.xml etc.
//! workspaces/<ws>/<store>/<res>/<marker>.xml  <- featuretype.xml etc.
//! workspaces/<ws>/<store>/<res>/layer.xml
//! styles/<name>.xml                           workspaces/<ws>/styles/...
//! layergroups/<name>.xml                      workspaces/<ws>/layergroups/...
//! ```

use atlas_core::{ResourceKind, StoreKind};

pub const GLOBAL_FILE: &str = "global.xml";
pub const LOGGING_FILE: &str = "logging.xml";
pub const WORKSPACES_DIR: &str = "workspaces";
pub const STYLES_DIR: &str = "styles";
pub const LAYER_GROUPS_DIR: &str = "layergroups";
pub const LAYER_FILE: &str = "layer.xml";

/// Marker/config file name for each store kind. The marker doubles as the
/// kind discriminator when scanning.
pub fn store_marker(kind: StoreKind) -> &'static str {
    match kind {
        StoreKind::Data => "datastore.xml",
        StoreKind::Coverage => "coveragestore.xml",
        StoreKind::Wms => "wmsstore.xml",
        StoreKind::Wmts => "wmtsstore.xml",
    }
}

pub fn store_kind_for_marker(file_name: &str) -> Option<StoreKind> {
    match file_name {
        "datastore.xml" => Some(StoreKind::Data),
        "coveragestore.xml" => Some(StoreKind::Coverage),
        "wmsstore.xml" => Some(StoreKind::Wms),
        "wmtsstore.xml" => Some(StoreKind::Wmts),
        _ => None,
    }
}

pub fn resource_marker(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::FeatureType => "featuretype.xml",
        ResourceKind::Coverage => "coverage.xml",
        ResourceKind::WmsLayer => "wmslayer.xml",
        ResourceKind::WmtsLayer => "wmtslayer.xml",
    }
}

pub fn resource_kind_for_marker(file_name: &str) -> Option<ResourceKind> {
    match file_name {
        "featuretype.xml" => Some(ResourceKind::FeatureType),
        "coverage.xml" => Some(ResourceKind::Coverage),
        "wmslayer.xml" => Some(ResourceKind::WmsLayer),
        "wmtslayer.xml" => Some(ResourceKind::WmtsLayer),
        _ => None,
    }
}

// ── Workspaces ──────────────────────────────────────────────────────

pub fn workspace_dir(workspace: &str) -> String {
    format!("{WORKSPACES_DIR}/{workspace}")
}

pub fn workspace_file(workspace: &str) -> String {
    format!("{WORKSPACES_DIR}/{workspace}/workspace.xml")
}

pub fn namespace_file(workspace: &str) -> String {
    format!("{WORKSPACES_DIR}/{workspace}/namespace.xml")
}

/// Sentinel recording which workspace is the default. Only ever written when
/// a default exists; a null default leaves any stale sentinel untouched.
pub fn default_workspace_file() -> String {
    format!("{WORKSPACES_DIR}/default.xml")
}

pub fn settings_file(workspace: &str) -> String {
    format!("{WORKSPACES_DIR}/{workspace}/settings.xml")
}

// ── Stores and resources ────────────────────────────────────────────

pub fn store_dir(workspace: &str, store: &str) -> String {
    format!("{WORKSPACES_DIR}/{workspace}/{store}")
}

pub fn store_file(workspace: &str, store: &str, kind: StoreKind) -> String {
    format!("{WORKSPACES_DIR}/{workspace}/{store}/{}", store_marker(kind))
}

pub fn resource_dir(workspace: &str, store: &str, resource: &str) -> String {
    format!("{WORKSPACES_DIR}/{workspace}/{store}/{resource}")
}

pub fn resource_file(workspace: &str, store: &str, resource: &str, kind: ResourceKind) -> String {
    format!(
        "{WORKSPACES_DIR}/{workspace}/{store}/{resource}/{}",
        resource_marker(kind)
    )
}

/// A layer has no directory of its own: `layer.xml` sits next to its
/// resource's marker file.
pub fn layer_file(workspace: &str, store: &str, resource: &str) -> String {
    format!("{WORKSPACES_DIR}/{workspace}/{store}/{resource}/{LAYER_FILE}")
}

// ── Styles ──────────────────────────────────────────────────────────

pub fn styles_dir(workspace: Option<&str>) -> String {
    match workspace {
        Some(ws) => format!("{WORKSPACES_DIR}/{ws}/{STYLES_DIR}"),
        None => STYLES_DIR.to_string(),
    }
}

/// Config file for a style. When the style's definition file is literally
/// `<name>.xml` the config would collide with it, so the config gets a
/// second `.xml` suffix.
pub fn style_config_file(workspace: Option<&str>, name: &str, definition_filename: &str) -> String {
    let config_name = if definition_filename == format!("{name}.xml") {
        format!("{name}.xml.xml")
    } else {
        format!("{name}.xml")
    };
    format!("{}/{config_name}", styles_dir(workspace))
}

/// Definition file (SLD or other format) referenced by a style's `filename`.
pub fn style_definition_file(workspace: Option<&str>, definition_filename: &str) -> String {
    format!("{}/{definition_filename}", styles_dir(workspace))
}

// ── Layer groups ────────────────────────────────────────────────────

pub fn layer_groups_dir(workspace: Option<&str>) -> String {
    match workspace {
        Some(ws) => format!("{WORKSPACES_DIR}/{ws}/{LAYER_GROUPS_DIR}"),
        None => LAYER_GROUPS_DIR.to_string(),
    }
}

pub fn layer_group_file(workspace: Option<&str>, name: &str) -> String {
    format!("{}/{name}.xml", layer_groups_dir(workspace))
}

// ── Services ────────────────────────────────────────────────────────

/// Per-service config file, at the root for global services or inside the
/// workspace directory for workspace overrides.
pub fn service_file(workspace: Option<&str>, service_type: &str) -> String {
    match workspace {
        Some(ws) => format!("{WORKSPACES_DIR}/{ws}/{service_type}.xml"),
        None => format!("{service_type}.xml"),
    }
}
