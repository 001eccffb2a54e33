pub mod catalog;
pub mod config;
pub mod error;
pub mod event;
pub mod listener;
pub mod tracking;

pub use catalog::{Catalog, CatalogStats};
pub use config::Config;
pub use error::CatalogError;
pub use event::{
    change, CatalogAddEvent, CatalogModifyEvent, CatalogPostModifyEvent, CatalogRemoveEvent,
    PropertyChange,
};
pub use listener::{CatalogListener, ConfigListener, ListenerResult};
pub use tracking::{TimestampListener, UpdateSequenceListener};
