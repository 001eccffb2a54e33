//! Catalog entity model: workspaces, namespaces, stores, resources, layers,
//! styles and layer groups, plus the closed [`CatalogItem`] sum type used for
//! event payloads and persistence dispatch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::Metadata;

pub type InfoId = Uuid;

/// A workspace: the top-level grouping for stores, styles and layer groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    pub id: InfoId,
    pub name: String,
    #[serde(default)]
    pub isolated: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

impl WorkspaceInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            isolated: false,
            metadata: Metadata::default(),
        }
    }
}

/// A namespace, 1:1 with a workspace (prefix matches the workspace name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    pub id: InfoId,
    pub prefix: String,
    pub uri: String,
    #[serde(default)]
    pub isolated: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NamespaceInfo {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prefix: prefix.into(),
            uri: uri.into(),
            isolated: false,
            metadata: Metadata::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKind {
    Data,
    Coverage,
    Wms,
    Wmts,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Data => write!(f, "data store"),
            StoreKind::Coverage => write!(f, "coverage store"),
            StoreKind::Wms => write!(f, "wms store"),
            StoreKind::Wmts => write!(f, "wmts store"),
        }
    }
}

/// A store: a named connection to a backing data source, owned by exactly
/// one workspace. Connection parameters may carry encrypted passwords; see
/// the orchestrator for when those get decrypted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub id: InfoId,
    pub name: String,
    pub kind: StoreKind,
    pub workspace_id: InfoId,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub connection_parameters: BTreeMap<String, String>,
    /// Last connection error, recorded when the startup probe fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl StoreInfo {
    pub fn new(name: impl Into<String>, kind: StoreKind, workspace_id: InfoId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            workspace_id,
            enabled: true,
            description: None,
            connection_parameters: BTreeMap::new(),
            error: None,
            metadata: Metadata::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    FeatureType,
    Coverage,
    WmsLayer,
    WmtsLayer,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::FeatureType => write!(f, "feature type"),
            ResourceKind::Coverage => write!(f, "coverage"),
            ResourceKind::WmsLayer => write!(f, "wms layer"),
            ResourceKind::WmtsLayer => write!(f, "wmts layer"),
        }
    }
}

/// A resource: a published unit of data within a store (feature type,
/// coverage, cascaded WMS/WMTS layer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub id: InfoId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_name: Option<String>,
    pub kind: ResourceKind,
    pub store_id: InfoId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#abstract: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub advertised: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ResourceInfo {
    pub fn new(name: impl Into<String>, kind: ResourceKind, store_id: InfoId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            native_name: None,
            kind,
            store_id,
            namespace_prefix: None,
            title: None,
            r#abstract: None,
            enabled: true,
            advertised: true,
            metadata: Metadata::default(),
        }
    }
}

/// A layer publishes exactly one resource. It has no directory of its own:
/// it lives in `layer.xml` inside its resource's directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub id: InfoId,
    pub name: String,
    pub resource_id: InfoId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_style: Option<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub queryable: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

impl LayerInfo {
    pub fn new(name: impl Into<String>, resource_id: InfoId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            resource_id,
            default_style: None,
            styles: Vec::new(),
            queryable: true,
            metadata: Metadata::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleFormat {
    Sld,
    Other(String),
}

impl Default for StyleFormat {
    fn default() -> Self {
        StyleFormat::Sld
    }
}

/// A style: a config file plus a separate definition file (`filename`), and
/// possibly extra referenced resources (icons, fonts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleInfo {
    pub id: InfoId,
    pub name: String,
    /// Owning workspace name; `None` means the style is global.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    /// Name of the style definition file, relative to the styles directory.
    pub filename: String,
    #[serde(default)]
    pub format: StyleFormat,
    #[serde(default)]
    pub metadata: Metadata,
}

impl StyleInfo {
    pub fn new(name: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            workspace: None,
            filename: filename.into(),
            format: StyleFormat::Sld,
            metadata: Metadata::default(),
        }
    }
}

/// An ordered composition of layers. A group with an empty layer list is
/// invalid and is never admitted into the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerGroupInfo {
    pub id: InfoId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Layer names, in draw order.
    #[serde(default)]
    pub layers: Vec<String>,
    /// Per-layer style overrides, aligned with `layers`.
    #[serde(default)]
    pub styles: Vec<Option<String>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl LayerGroupInfo {
    pub fn new(name: impl Into<String>, layers: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            workspace: None,
            title: None,
            layers,
            styles: Vec::new(),
            metadata: Metadata::default(),
        }
    }
}

/// Closed sum over every catalog entity kind.
///
/// Replaces per-kind downcasting in the loader and persister: each variant
/// maps to a (directory, config file, marker) triple in the datadir layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CatalogItem {
    Workspace(WorkspaceInfo),
    Namespace(NamespaceInfo),
    Store(StoreInfo),
    Resource(ResourceInfo),
    Layer(LayerInfo),
    Style(StyleInfo),
    LayerGroup(LayerGroupInfo),
}

impl CatalogItem {
    pub fn id(&self) -> InfoId {
        match self {
            CatalogItem::Workspace(i) => i.id,
            CatalogItem::Namespace(i) => i.id,
            CatalogItem::Store(i) => i.id,
            CatalogItem::Resource(i) => i.id,
            CatalogItem::Layer(i) => i.id,
            CatalogItem::Style(i) => i.id,
            CatalogItem::LayerGroup(i) => i.id,
        }
    }

    /// Display name of the entity (prefix for namespaces).
    pub fn name(&self) -> &str {
        match self {
            CatalogItem::Workspace(i) => &i.name,
            CatalogItem::Namespace(i) => &i.prefix,
            CatalogItem::Store(i) => &i.name,
            CatalogItem::Resource(i) => &i.name,
            CatalogItem::Layer(i) => &i.name,
            CatalogItem::Style(i) => &i.name,
            CatalogItem::LayerGroup(i) => &i.name,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CatalogItem::Workspace(_) => "workspace",
            CatalogItem::Namespace(_) => "namespace",
            CatalogItem::Store(_) => "store",
            CatalogItem::Resource(_) => "resource",
            CatalogItem::Layer(_) => "layer",
            CatalogItem::Style(_) => "style",
            CatalogItem::LayerGroup(_) => "layer group",
        }
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            CatalogItem::Workspace(i) => &mut i.metadata,
            CatalogItem::Namespace(i) => &mut i.metadata,
            CatalogItem::Store(i) => &mut i.metadata,
            CatalogItem::Resource(i) => &mut i.metadata,
            CatalogItem::Layer(i) => &mut i.metadata,
            CatalogItem::Style(i) => &mut i.metadata,
            CatalogItem::LayerGroup(i) => &mut i.metadata,
        }
    }
}

impl std::fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.type_name(), self.name())
    }
}

impl From<WorkspaceInfo> for CatalogItem {
    fn from(i: WorkspaceInfo) -> Self {
        CatalogItem::Workspace(i)
    }
}

impl From<NamespaceInfo> for CatalogItem {
    fn from(i: NamespaceInfo) -> Self {
        CatalogItem::Namespace(i)
    }
}

impl From<StoreInfo> for CatalogItem {
    fn from(i: StoreInfo) -> Self {
        CatalogItem::Store(i)
    }
}

impl From<ResourceInfo> for CatalogItem {
    fn from(i: ResourceInfo) -> Self {
        CatalogItem::Resource(i)
    }
}

impl From<LayerInfo> for CatalogItem {
    fn from(i: LayerInfo) -> Self {
        CatalogItem::Layer(i)
    }
}

impl From<StyleInfo> for CatalogItem {
    fn from(i: StyleInfo) -> Self {
        CatalogItem::Style(i)
    }
}

impl From<LayerGroupInfo> for CatalogItem {
    fn from(i: LayerGroupInfo) -> Self {
        CatalogItem::LayerGroup(i)
    }
}
