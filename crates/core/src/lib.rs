pub mod catalog;
pub mod config;
pub mod metadata;

pub use catalog::*;
pub use config::*;
pub use metadata::Metadata;
