//! Operations served by every available metastore at once.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::client::{RequestContext, TableMeta};
use crate::mapping::Mapping;
use crate::pattern::decompose;

use super::{
    DatabaseFilter, FanOutExecutor, FanOutRequest, GetAllDatabasesRequest,
    GetDatabasesByPatternRequest, GetTableMetaRequest, SetUgiRequest,
};

/// How a database pattern reaches each backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternScope {
    /// Split per prefix; mappings no alternative can match are skipped.
    Decompose,
    /// Forward unchanged to every mapping.
    Forward,
}

/// Fan-out entry point over a fixed set of mappings.
///
/// Built per request by the routing table from its available mappings.
pub struct PanopticHandler {
    mappings: Vec<Arc<Mapping>>,
    executor: FanOutExecutor,
    filter: DatabaseFilter,
    scope: PatternScope,
}

impl PanopticHandler {
    /// Creates a handler.
    pub fn new(
        mappings: Vec<Arc<Mapping>>,
        executor: FanOutExecutor,
        filter: DatabaseFilter,
        scope: PatternScope,
    ) -> Self {
        Self {
            mappings,
            executor,
            filter,
            scope,
        }
    }

    /// Mappings the handler fans out to.
    pub fn mappings(&self) -> &[Arc<Mapping>] {
        &self.mappings
    }

    /// Runs arbitrary requests through the executor.
    pub async fn fan_out<R: FanOutRequest>(
        &self,
        operation: &'static str,
        requests: Vec<R>,
    ) -> Vec<R::Output> {
        self.executor.execute(operation, requests).await
    }

    /// Every visible database of every available metastore.
    pub async fn get_all_databases(&self, ctx: &RequestContext) -> Vec<String> {
        let requests = self
            .mappings
            .iter()
            .map(|mapping| {
                GetAllDatabasesRequest::new(Arc::clone(mapping), ctx.clone(), self.filter.clone())
            })
            .collect();
        self.fan_out("get_all_databases", requests).await
    }

    /// Visible databases matching `pattern`. `None` lists everything.
    pub async fn get_databases(&self, ctx: &RequestContext, pattern: Option<&str>) -> Vec<String> {
        let requests = self
            .scoped(pattern)
            .into_iter()
            .map(|(mapping, pattern)| {
                GetDatabasesByPatternRequest::new(mapping, ctx.clone(), pattern, self.filter.clone())
            })
            .collect();
        self.fan_out("get_databases", requests).await
    }

    /// Visible table summaries matching the database and table patterns.
    pub async fn get_table_meta(
        &self,
        ctx: &RequestContext,
        db_pattern: &str,
        table_pattern: &str,
        table_types: &[String],
    ) -> Vec<TableMeta> {
        let requests = self
            .scoped(Some(db_pattern))
            .into_iter()
            .filter_map(|(mapping, pattern)| {
                pattern.map(|pattern| {
                    GetTableMetaRequest::new(
                        mapping,
                        ctx.clone(),
                        pattern,
                        table_pattern.to_string(),
                        table_types.to_vec(),
                        self.filter.clone(),
                    )
                })
            })
            .collect();
        self.fan_out("get_table_meta", requests).await
    }

    /// Forwards the caller identity everywhere; returns the distinct groups.
    pub async fn set_ugi(
        &self,
        ctx: &RequestContext,
        user: &str,
        groups: &[String],
    ) -> Vec<String> {
        let requests = self
            .mappings
            .iter()
            .map(|mapping| {
                SetUgiRequest::new(
                    Arc::clone(mapping),
                    ctx.clone(),
                    user.to_string(),
                    groups.to_vec(),
                )
            })
            .collect();

        let mut seen = HashSet::new();
        let mut groups = self.fan_out("set_ugi", requests).await;
        groups.retain(|group| seen.insert(group.clone()));
        groups
    }

    /// Pairs each mapping with its share of `pattern`.
    fn scoped(&self, pattern: Option<&str>) -> Vec<(Arc<Mapping>, Option<String>)> {
        let Some(pattern) = pattern else {
            return self
                .mappings
                .iter()
                .map(|mapping| (Arc::clone(mapping), None))
                .collect();
        };

        match self.scope {
            PatternScope::Forward => self
                .mappings
                .iter()
                .map(|mapping| (Arc::clone(mapping), Some(pattern.to_string())))
                .collect(),
            PatternScope::Decompose => {
                let parts = decompose(self.mappings.iter().map(|m| m.prefix()), pattern);
                self.mappings
                    .iter()
                    .filter_map(|mapping| {
                        parts
                            .get(mapping.prefix())
                            .map(|part| (Arc::clone(mapping), Some(part.clone())))
                    })
                    .collect()
            }
        }
    }
}

impl fmt::Debug for PanopticHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanopticHandler")
            .field("mappings", &self.mappings)
            .field("executor", &self.executor)
            .field("scope", &self.scope)
            .finish()
    }
}
