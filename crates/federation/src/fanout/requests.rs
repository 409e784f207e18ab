//! Fan-out requests for the catalog listing operations.

use std::future::Future;
use std::sync::Arc;

use crate::client::{RequestContext, TableMeta};
use crate::error::ClientResult;
use crate::mapping::Mapping;

use super::{DatabaseFilter, FanOutRequest};

/// Lists every database of one mapping.
pub struct GetAllDatabasesRequest {
    mapping: Arc<Mapping>,
    ctx: RequestContext,
    filter: DatabaseFilter,
}

impl GetAllDatabasesRequest {
    /// Creates the request.
    pub fn new(mapping: Arc<Mapping>, ctx: RequestContext, filter: DatabaseFilter) -> Self {
        Self {
            mapping,
            ctx,
            filter,
        }
    }
}

impl FanOutRequest for GetAllDatabasesRequest {
    type Output = String;

    fn mapping(&self) -> &Arc<Mapping> {
        &self.mapping
    }

    fn call(self) -> impl Future<Output = ClientResult<Vec<String>>> + Send {
        async move {
            let databases = self.mapping.client().get_all_databases(&self.ctx).await?;
            Ok(surface(&self.mapping, &self.filter, databases))
        }
    }
}

/// Lists the databases of one mapping matching its share of a pattern.
pub struct GetDatabasesByPatternRequest {
    mapping: Arc<Mapping>,
    ctx: RequestContext,
    pattern: Option<String>,
    filter: DatabaseFilter,
}

impl GetDatabasesByPatternRequest {
    /// Creates the request; `pattern` is already backend-local.
    pub fn new(
        mapping: Arc<Mapping>,
        ctx: RequestContext,
        pattern: Option<String>,
        filter: DatabaseFilter,
    ) -> Self {
        Self {
            mapping,
            ctx,
            pattern,
            filter,
        }
    }
}

impl FanOutRequest for GetDatabasesByPatternRequest {
    type Output = String;

    fn mapping(&self) -> &Arc<Mapping> {
        &self.mapping
    }

    fn call(self) -> impl Future<Output = ClientResult<Vec<String>>> + Send {
        async move {
            let databases = self
                .mapping
                .client()
                .get_databases(&self.ctx, self.pattern.as_deref())
                .await?;
            Ok(surface(&self.mapping, &self.filter, databases))
        }
    }
}

/// Lists table summaries of one mapping.
pub struct GetTableMetaRequest {
    mapping: Arc<Mapping>,
    ctx: RequestContext,
    db_pattern: String,
    table_pattern: String,
    table_types: Vec<String>,
    filter: DatabaseFilter,
}

impl GetTableMetaRequest {
    /// Creates the request; `db_pattern` is already backend-local.
    pub fn new(
        mapping: Arc<Mapping>,
        ctx: RequestContext,
        db_pattern: String,
        table_pattern: String,
        table_types: Vec<String>,
        filter: DatabaseFilter,
    ) -> Self {
        Self {
            mapping,
            ctx,
            db_pattern,
            table_pattern,
            table_types,
            filter,
        }
    }
}

impl FanOutRequest for GetTableMetaRequest {
    type Output = TableMeta;

    fn mapping(&self) -> &Arc<Mapping> {
        &self.mapping
    }

    fn call(self) -> impl Future<Output = ClientResult<Vec<TableMeta>>> + Send {
        async move {
            let metas = self
                .mapping
                .client()
                .get_table_meta(
                    &self.ctx,
                    &self.db_pattern,
                    &self.table_pattern,
                    &self.table_types,
                )
                .await?;

            Ok(metas
                .into_iter()
                .filter(|meta| {
                    (self.filter)(&meta.db_name, &self.mapping)
                        && self.mapping.is_table_mapped(&meta.db_name, &meta.table_name)
                })
                .map(|meta| self.mapping.transform_outbound_table_meta(meta))
                .collect())
        }
    }
}

/// Forwards the caller's identity to one mapping.
pub struct SetUgiRequest {
    mapping: Arc<Mapping>,
    ctx: RequestContext,
    user: String,
    groups: Vec<String>,
}

impl SetUgiRequest {
    /// Creates the request.
    pub fn new(
        mapping: Arc<Mapping>,
        ctx: RequestContext,
        user: String,
        groups: Vec<String>,
    ) -> Self {
        Self {
            mapping,
            ctx,
            user,
            groups,
        }
    }
}

impl FanOutRequest for SetUgiRequest {
    type Output = String;

    fn mapping(&self) -> &Arc<Mapping> {
        &self.mapping
    }

    fn call(self) -> impl Future<Output = ClientResult<Vec<String>>> + Send {
        async move {
            self.mapping
                .client()
                .set_ugi(&self.ctx, &self.user, &self.groups)
                .await
        }
    }
}

/// Filters backend names and expands the survivors to caller-visible names.
fn surface(mapping: &Mapping, filter: &DatabaseFilter, databases: Vec<String>) -> Vec<String> {
    databases
        .into_iter()
        .filter(|database| filter(database, mapping))
        .flat_map(|database| mapping.transform_outbound_multiple(&database))
        .collect()
}
