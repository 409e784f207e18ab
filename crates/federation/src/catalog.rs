//! The catalog surface the protocol layer calls.
//!
//! Fan-out operations never fail because of one backend. Single-target
//! operations resolve one mapping and propagate its failures as-is.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::client::{CatalogRequest, RequestContext, RequestKind, TableMeta};
use crate::error::{AccessError, BackendError, FederationResult};
use crate::mapping::Mapping;
use crate::pattern::remove_catalog_name;
use crate::routing::RoutingTable;

/// Federated view over every registered metastore.
#[derive(Clone)]
pub struct FederatedCatalog {
    routing: Arc<dyn RoutingTable>,
}

impl FederatedCatalog {
    /// Creates a catalog over a routing pipeline.
    pub fn new(routing: Arc<dyn RoutingTable>) -> Self {
        Self { routing }
    }

    /// The routing pipeline.
    pub fn routing(&self) -> &Arc<dyn RoutingTable> {
        &self.routing
    }

    /// Every visible database.
    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id))]
    pub async fn get_all_databases(&self, ctx: &RequestContext) -> Vec<String> {
        self.routing.panoptic_handler().get_all_databases(ctx).await
    }

    /// Visible databases matching `pattern`.
    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id))]
    pub async fn get_databases(&self, ctx: &RequestContext, pattern: Option<&str>) -> Vec<String> {
        self.routing
            .panoptic_handler()
            .get_databases(ctx, pattern)
            .await
    }

    /// Visible table summaries.
    #[instrument(skip(self, ctx, table_types), fields(correlation_id = %ctx.correlation_id))]
    pub async fn get_table_meta(
        &self,
        ctx: &RequestContext,
        db_pattern: &str,
        table_pattern: &str,
        table_types: &[String],
    ) -> Vec<TableMeta> {
        self.routing
            .panoptic_handler()
            .get_table_meta(ctx, db_pattern, table_pattern, table_types)
            .await
    }

    /// Forwards the caller identity to every metastore.
    pub async fn set_ugi(&self, ctx: &RequestContext, user: &str, groups: &[String]) -> Vec<String> {
        self.routing
            .panoptic_handler()
            .set_ugi(ctx, user, groups)
            .await
    }

    /// Visible tables of one database.
    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id))]
    pub async fn get_all_tables(
        &self,
        ctx: &RequestContext,
        database: &str,
    ) -> FederationResult<Vec<String>> {
        let database = remove_catalog_name(database);
        let mapping = self.routing.resolve(&database)?;
        self.routing
            .check_allowed(&database, None, &mapping, RequestKind::Read)?;

        let local = mapping.transform_inbound(&database);
        let tables = mapping
            .client()
            .get_all_tables(ctx, &local)
            .await
            .map_err(|e| BackendError::from_client(mapping.name(), e))?;

        Ok(self.routing.filter(&database, tables, &mapping))
    }

    /// Executes any other operation against the owning metastore.
    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id, operation = %request.operation))]
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: &CatalogRequest,
    ) -> FederationResult<Value> {
        let database = remove_catalog_name(&request.database);
        let mapping = self.routing.resolve(&database)?;
        self.routing
            .check_allowed(&database, request.table.as_deref(), &mapping, request.kind)?;

        let forwarded = CatalogRequest {
            database: mapping.transform_inbound(&database),
            ..request.clone()
        };
        debug!(metastore = %mapping.name(), database = %forwarded.database, "Forwarding request");
        call(&mapping, ctx, &forwarded).await
    }

    /// Creates a database on the primary metastore.
    #[instrument(skip(self, ctx, payload), fields(correlation_id = %ctx.correlation_id))]
    pub async fn create_database(
        &self,
        ctx: &RequestContext,
        database: &str,
        payload: Value,
    ) -> FederationResult<Value> {
        let mapping = self.routing.resolve_primary()?;
        if !mapping.access_control().has_create_permission() {
            return Err(AccessError::CreateNotPermitted {
                metastore: mapping.name().to_string(),
            }
            .into());
        }

        let local = mapping.transform_inbound(&remove_catalog_name(database));
        let request = CatalogRequest::write("create_database", &local).with_payload(payload);
        let result = call(&mapping, ctx, &request).await?;
        mapping.access_control().database_created(&local);
        Ok(result)
    }
}

impl std::fmt::Debug for FederatedCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederatedCatalog")
            .field("mappings", &self.routing.all_mappings().len())
            .finish()
    }
}

async fn call(
    mapping: &Mapping,
    ctx: &RequestContext,
    request: &CatalogRequest,
) -> FederationResult<Value> {
    mapping
        .client()
        .execute(ctx, request)
        .await
        .map_err(|e| BackendError::from_client(mapping.name(), e).into())
}
