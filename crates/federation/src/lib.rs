//! Apiary Federation Core
//!
//! This crate presents many independently owned metastores as one logical
//! catalog. For every catalog operation it decides which metastore owns the
//! referenced database, splits database-name patterns so each backend only
//! sees the part relevant to its own namespace, fans listing operations out
//! in parallel while tolerating individual failures, and keeps a best-effort
//! health status for every backend.
//!
//! The wire protocol, transport security and the backends' own catalog
//! semantics are outside this crate: backends are reached through the
//! [`CatalogClient`](client::CatalogClient) capability.
//!
//! # Architecture
//!
//! - [`pattern`] - Decomposition of `|`-separated glob patterns per prefix
//! - [`model`] - Metastore definitions and live status
//! - [`mapping`] - Bindings of definitions to clients, name transforms, access control
//! - [`routing`] - Name resolution, the wrapper pipeline and hot registration
//! - [`fanout`] - Parallel execution across mappings with per-call timeouts
//! - [`status`] - Single and bounded bulk health probing, periodic polling
//! - [`service`] - Register/update/unregister and storage of definitions
//! - [`catalog`] - The surface called by the protocol layer
//! - [`config`] - Settings and the YAML federation file
//! - [`error`] - Error types for all operations
//!
//! # Pattern decomposition
//!
//! ```
//! use apiary_federation::pattern::decompose;
//!
//! let parts = decompose(["a_", "b_"], "a*|b*");
//! assert_eq!(parts["a_"], "*");
//! assert_eq!(parts["b_"], "*");
//!
//! let parts = decompose(["waggle_"], "waggle_logs|other");
//! assert_eq!(parts["waggle_"], "logs");
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use apiary_federation::{Federation, FederationSettings, RequestContext};
//! use apiary_federation::service::YamlMetaStoreStorage;
//! # use apiary_federation::client::ClientFactory;
//! # async fn run(factory: Arc<dyn ClientFactory>) -> apiary_federation::FederationResult<()> {
//!
//! let settings = FederationSettings::from_env();
//! let storage = Arc::new(YamlMetaStoreStorage::load("federations.yml", true)?);
//! let mut federation = Federation::new(&settings, storage, factory)?;
//! federation.start_polling(&settings);
//!
//! let ctx = RequestContext::internal();
//! let databases = federation.catalog().get_databases(&ctx, Some("waggle_*")).await;
//! println!("{:?}", databases);
//!
//! federation.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bootstrap;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod fanout;
pub mod logging;
pub mod mapping;
pub mod model;
pub mod pattern;
pub mod routing;
pub mod service;
pub mod status;

// Re-export commonly used types at crate root
pub use bootstrap::Federation;
pub use catalog::FederatedCatalog;
pub use client::{CatalogClient, CatalogRequest, ClientFactory, RequestContext, TableMeta};
pub use config::{DatabaseResolution, FederationSettings, Federations};
pub use error::{ClientError, ClientResult, FederationError, FederationResult};
pub use mapping::Mapping;
pub use model::{AccessControlType, FederationType, MetaStore, MetaStoreStatus, MetaStoreView};
pub use routing::{RoutingTable, build_routing_table};
pub use service::FederationService;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
