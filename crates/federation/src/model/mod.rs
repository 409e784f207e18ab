//! Data model: metastore definitions and their live status.

pub mod metastore;
pub mod status;
pub mod validation;

pub use metastore::{AccessControlType, FederationType, MappedTables, MetaStore};
pub use status::{MetaStoreEntry, MetaStoreStatus, MetaStoreView, StatusCell};
pub use validation::check_compatible;
