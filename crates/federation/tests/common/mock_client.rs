//! In-memory catalog clients.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use apiary_federation::client::{
    CatalogClient, CatalogRequest, ClientFactory, RequestContext, TableMeta,
};
use apiary_federation::error::{ClientError, ClientResult};
use apiary_federation::model::MetaStore;
use apiary_federation::pattern::glob_matches;

/// How a mock client answers calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Answers from its in-memory catalog.
    Ok,
    /// Fails every call with a connection error.
    Fail,
    /// Never answers.
    Hang,
}

/// Backend catalog held in memory, recording what it was asked.
#[derive(Debug)]
pub struct MockCatalogClient {
    name: String,
    tables: BTreeMap<String, Vec<String>>,
    behavior: Mutex<Behavior>,
    patterns: Mutex<Vec<Option<String>>>,
    requests: Mutex<Vec<CatalogRequest>>,
    calls: AtomicUsize,
}

impl MockCatalogClient {
    /// Creates a client holding `databases`, each without tables.
    pub fn new(name: &str, databases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            tables: databases
                .iter()
                .map(|db| (db.to_string(), Vec::new()))
                .collect(),
            behavior: Mutex::new(Behavior::Ok),
            patterns: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Adds tables to a database.
    pub fn with_tables(mut self, database: &str, tables: &[&str]) -> Self {
        self.tables.insert(
            database.to_string(),
            tables.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// Sets the initial behavior.
    pub fn with_behavior(self, behavior: Behavior) -> Self {
        *self.behavior.lock() = behavior;
        self
    }

    /// Changes the behavior of subsequent calls.
    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock() = behavior;
    }

    /// Metastore name this client serves.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Patterns received by `get_databases`, in order.
    pub fn patterns(&self) -> Vec<Option<String>> {
        self.patterns.lock().clone()
    }

    /// Requests received by `execute`, in order.
    pub fn requests(&self) -> Vec<CatalogRequest> {
        self.requests.lock().clone()
    }

    /// Number of calls of any kind.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> ClientResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.behavior.lock();
        match behavior {
            Behavior::Ok => Ok(()),
            Behavior::Fail => Err(ClientError::connection(format!(
                "{} refused connection",
                self.name
            ))),
            Behavior::Hang => std::future::pending().await,
        }
    }

    fn matching(&self, pattern: Option<&str>) -> Vec<String> {
        self.tables
            .keys()
            .filter(|db| match pattern {
                None => true,
                Some(pattern) => pattern.split('|').any(|clause| glob_matches(clause, db)),
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CatalogClient for MockCatalogClient {
    async fn get_all_databases(&self, _ctx: &RequestContext) -> ClientResult<Vec<String>> {
        self.enter().await?;
        Ok(self.tables.keys().cloned().collect())
    }

    async fn get_databases(
        &self,
        _ctx: &RequestContext,
        pattern: Option<&str>,
    ) -> ClientResult<Vec<String>> {
        self.patterns.lock().push(pattern.map(str::to_string));
        self.enter().await?;
        Ok(self.matching(pattern))
    }

    async fn get_all_tables(
        &self,
        _ctx: &RequestContext,
        database: &str,
    ) -> ClientResult<Vec<String>> {
        self.enter().await?;
        self.tables
            .get(database)
            .cloned()
            .ok_or_else(|| ClientError::remote(format!("NoSuchObjectException: {}", database)))
    }

    async fn get_table_meta(
        &self,
        _ctx: &RequestContext,
        db_pattern: &str,
        table_pattern: &str,
        _table_types: &[String],
    ) -> ClientResult<Vec<TableMeta>> {
        self.patterns.lock().push(Some(db_pattern.to_string()));
        self.enter().await?;
        let mut metas = Vec::new();
        for database in self.matching(Some(db_pattern)) {
            for table in &self.tables[&database] {
                if glob_matches(table_pattern, table) {
                    metas.push(TableMeta::new(&database, table, "MANAGED_TABLE"));
                }
            }
        }
        Ok(metas)
    }

    async fn set_ugi(
        &self,
        _ctx: &RequestContext,
        _user: &str,
        groups: &[String],
    ) -> ClientResult<Vec<String>> {
        self.enter().await?;
        Ok(groups.to_vec())
    }

    async fn execute(&self, _ctx: &RequestContext, request: &CatalogRequest) -> ClientResult<Value> {
        self.requests.lock().push(request.clone());
        self.enter().await?;
        Ok(json!({ "metastore": self.name, "database": request.database }))
    }

    async fn ping(&self) -> ClientResult<()> {
        self.enter().await
    }
}

/// Hands out mock clients by metastore name.
#[derive(Debug, Default)]
pub struct MockClientFactory {
    clients: Mutex<HashMap<String, Arc<MockCatalogClient>>>,
}

impl MockClientFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client under its name and returns it.
    pub fn add(&self, client: MockCatalogClient) -> Arc<MockCatalogClient> {
        let client = Arc::new(client);
        self.clients
            .lock()
            .insert(client.name().to_string(), Arc::clone(&client));
        client
    }

    /// Client registered under `name`.
    pub fn client(&self, name: &str) -> Arc<MockCatalogClient> {
        Arc::clone(&self.clients.lock()[name])
    }
}

impl ClientFactory for MockClientFactory {
    fn create(&self, metastore: &MetaStore) -> ClientResult<Arc<dyn CatalogClient>> {
        match self.clients.lock().get(&metastore.name) {
            Some(client) => Ok(Arc::clone(client) as Arc<dyn CatalogClient>),
            None => Err(ClientError::connection(format!(
                "no route to {}",
                metastore.remote_meta_store_uris
            ))),
        }
    }
}
