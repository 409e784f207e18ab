//! Backend client capability.
//!
//! The federation core never speaks the catalog wire protocol itself. Every
//! backend is reached through a [`CatalogClient`], created per metastore by a
//! [`ClientFactory`]. Calls carry an explicit [`RequestContext`] rather than
//! relying on task-local state.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ClientResult;
use crate::model::MetaStore;

/// Per-call context passed alongside every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Network address of the calling client, when known.
    pub client_address: Option<IpAddr>,
    /// Identifier used to correlate log lines across backends.
    pub correlation_id: String,
}

impl RequestContext {
    /// Creates a context for a call from the given address.
    pub fn new(client_address: Option<IpAddr>) -> Self {
        Self {
            client_address,
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    /// Creates a context for calls issued by the federation itself.
    pub fn internal() -> Self {
        Self::new(None)
    }

    /// Replaces the correlation id.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::internal()
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.client_address {
            Some(address) => write!(f, "{}@{}", self.correlation_id, address),
            None => write!(f, "{}", self.correlation_id),
        }
    }
}

/// Summary row returned by table-metadata listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMeta {
    /// Database name.
    pub db_name: String,
    /// Table name.
    pub table_name: String,
    /// Table type, e.g. `MANAGED_TABLE`.
    pub table_type: String,
    /// Optional comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl TableMeta {
    /// Creates a table summary without a comment.
    pub fn new(
        db_name: impl Into<String>,
        table_name: impl Into<String>,
        table_type: impl Into<String>,
    ) -> Self {
        Self {
            db_name: db_name.into(),
            table_name: table_name.into(),
            table_type: table_type.into(),
            comments: None,
        }
    }
}

/// Whether a passthrough request mutates the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestKind {
    /// Reads only.
    #[default]
    Read,
    /// Creates, alters or drops something.
    Write,
}

/// A catalog operation the core forwards without interpreting.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRequest {
    /// Operation name, e.g. `get_table` or `alter_partition`.
    pub operation: String,
    /// Database the operation targets, as seen by the caller.
    pub database: String,
    /// Table the operation targets, if any.
    pub table: Option<String>,
    /// Read or write.
    pub kind: RequestKind,
    /// Operation-specific arguments.
    pub payload: Value,
}

impl CatalogRequest {
    /// Creates a read request.
    pub fn read(operation: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            database: database.into(),
            table: None,
            kind: RequestKind::Read,
            payload: Value::Null,
        }
    }

    /// Creates a write request.
    pub fn write(operation: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            kind: RequestKind::Write,
            ..Self::read(operation, database)
        }
    }

    /// Targets a table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Attaches arguments.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Returns true for mutating requests.
    pub fn is_write(&self) -> bool {
        self.kind == RequestKind::Write
    }
}

/// Connection to one backend metastore.
///
/// Database names passed in and returned are always backend-local: prefixes
/// and aliases are handled by the caller.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Lists every database.
    async fn get_all_databases(&self, ctx: &RequestContext) -> ClientResult<Vec<String>>;

    /// Lists databases matching a pattern. `None` means all.
    async fn get_databases(
        &self,
        ctx: &RequestContext,
        pattern: Option<&str>,
    ) -> ClientResult<Vec<String>>;

    /// Lists the tables of a database.
    async fn get_all_tables(&self, ctx: &RequestContext, database: &str)
    -> ClientResult<Vec<String>>;

    /// Lists table summaries matching database and table patterns.
    async fn get_table_meta(
        &self,
        ctx: &RequestContext,
        db_pattern: &str,
        table_pattern: &str,
        table_types: &[String],
    ) -> ClientResult<Vec<TableMeta>>;

    /// Sets the calling user and groups, returning the effective groups.
    async fn set_ugi(
        &self,
        ctx: &RequestContext,
        user: &str,
        groups: &[String],
    ) -> ClientResult<Vec<String>>;

    /// Executes any other operation.
    async fn execute(&self, ctx: &RequestContext, request: &CatalogRequest) -> ClientResult<Value>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> ClientResult<()>;
}

/// Creates clients for metastore definitions.
pub trait ClientFactory: Send + Sync {
    /// Connects (or prepares to connect) to the given metastore.
    fn create(&self, metastore: &MetaStore) -> ClientResult<Arc<dyn CatalogClient>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_context_ids_are_unique() {
        let a = RequestContext::internal();
        let b = RequestContext::internal();
        assert_ne!(a.correlation_id, b.correlation_id);
    }

    #[test]
    fn test_request_context_display() {
        let ctx = RequestContext::new(Some("10.0.0.1".parse().unwrap())).with_correlation_id("c1");
        assert_eq!(ctx.to_string(), "c1@10.0.0.1");
        assert_eq!(RequestContext::internal().with_correlation_id("c2").to_string(), "c2");
    }

    #[test]
    fn test_catalog_request_builders() {
        let request = CatalogRequest::write("drop_table", "waggle_db")
            .with_table("events")
            .with_payload(serde_json::json!({"deleteData": true}));
        assert!(request.is_write());
        assert_eq!(request.table.as_deref(), Some("events"));
        assert!(!CatalogRequest::read("get_table", "db").is_write());
    }

    #[test]
    fn test_table_meta_serialization() {
        let meta = TableMeta::new("db", "events", "MANAGED_TABLE");
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["dbName"], "db");
        assert!(json.get("comments").is_none());
    }
}
