//! Integration tests for single-target catalog operations.

mod common;

use serde_json::json;

use apiary_federation::client::CatalogRequest;
use apiary_federation::error::{AccessError, BackendError, FederationError, RoutingError};
use apiary_federation::model::{AccessControlType, MappedTables};
use apiary_federation::RequestContext;

use common::*;

// ============================================================================
// Read Tests
// ============================================================================

/// Test that table listing reaches the owning backend under its local name.
#[tokio::test]
async fn test_get_all_tables() {
    let harness = Harness::new(
        vec![
            primary(),
            federated("waggle")
                .with_mapped_tables(vec![MappedTables::new("logs", vec!["access_.*"])]),
        ],
        vec![
            MockCatalogClient::new("primary", &[]).with_tables("sales", &["orders"]),
            MockCatalogClient::new("waggle", &[])
                .with_tables("logs", &["access_eu", "access_us", "errors"]),
        ],
    );
    let ctx = RequestContext::internal();
    let catalog = harness.federation.catalog();

    let tables = catalog.get_all_tables(&ctx, "waggle_logs").await.unwrap();
    assert_eq!(tables, vec!["access_eu", "access_us"]);

    let tables = catalog.get_all_tables(&ctx, "sales").await.unwrap();
    assert_eq!(tables, vec!["orders"]);
}

/// Test that backend failures on a single-target call propagate.
#[tokio::test]
async fn test_get_all_tables_backend_failure() {
    let harness = Harness::new(
        vec![primary(), federated("waggle")],
        vec![
            MockCatalogClient::new("primary", &[]),
            MockCatalogClient::new("waggle", &["logs"]).with_behavior(Behavior::Fail),
        ],
    );
    let ctx = RequestContext::internal();

    let err = harness
        .federation
        .catalog()
        .get_all_tables(&ctx, "waggle_logs")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FederationError::Backend(BackendError::Unavailable { ref metastore, .. }) if metastore == "waggle"
    ));
}

/// Test that a routing failure is reported without contacting any backend.
#[tokio::test]
async fn test_get_all_tables_without_owner() {
    let harness = Harness::new(
        vec![federated("waggle")],
        vec![MockCatalogClient::new("waggle", &["logs"])],
    );
    let ctx = RequestContext::internal();

    let err = harness
        .federation
        .catalog()
        .get_all_tables(&ctx, "sales")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FederationError::Routing(RoutingError::NoPrimary { .. })
    ));
    assert_eq!(harness.client("waggle").calls(), 0);
}

// ============================================================================
// Execute Tests
// ============================================================================

/// Test that a read request is forwarded with the local database name.
#[tokio::test]
async fn test_execute_read() {
    let harness = Harness::new(
        vec![primary(), federated("waggle")],
        vec![
            MockCatalogClient::new("primary", &[]),
            MockCatalogClient::new("waggle", &["logs"]),
        ],
    );
    let ctx = RequestContext::internal();
    let request = CatalogRequest::read("get_table", "@hive#waggle_logs").with_table("access");

    let response = harness
        .federation
        .catalog()
        .execute(&ctx, &request)
        .await
        .unwrap();

    assert_eq!(response, json!({ "metastore": "waggle", "database": "logs" }));
    let forwarded = harness.client("waggle").requests();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].database, "logs");
    assert_eq!(forwarded[0].table.as_deref(), Some("access"));
}

/// Test that writes to a read-only metastore never reach it.
#[tokio::test]
async fn test_execute_write_read_only() {
    let harness = Harness::new(
        vec![primary(), federated("waggle")],
        vec![
            MockCatalogClient::new("primary", &[]),
            MockCatalogClient::new("waggle", &["logs"]),
        ],
    );
    let ctx = RequestContext::internal();
    let request = CatalogRequest::write("drop_table", "waggle_logs").with_table("access");

    let err = harness
        .federation
        .catalog()
        .execute(&ctx, &request)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FederationError::Access(AccessError::ReadOnly { .. })
    ));
    assert!(harness.client("waggle").requests().is_empty());
}

/// Test that a hidden table cannot be reached by name.
#[tokio::test]
async fn test_execute_unmapped_table() {
    let harness = Harness::new(
        vec![
            primary(),
            federated("waggle")
                .with_mapped_tables(vec![MappedTables::new("logs", vec!["access"])]),
        ],
        vec![
            MockCatalogClient::new("primary", &[]),
            MockCatalogClient::new("waggle", &["logs"]),
        ],
    );
    let ctx = RequestContext::internal();
    let request = CatalogRequest::read("get_table", "waggle_logs").with_table("errors");

    let err = harness
        .federation
        .catalog()
        .execute(&ctx, &request)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FederationError::Access(AccessError::TableNotMapped { .. })
    ));
}

// ============================================================================
// Create Database Tests
// ============================================================================

/// Test that a created database joins the writable whitelist.
#[tokio::test]
async fn test_create_database_extends_whitelist() {
    let harness = Harness::new(
        vec![primary().with_access_control(
            AccessControlType::ReadAndWriteAndCreateOnDatabaseWhitelist,
            vec!["sales"],
        )],
        vec![MockCatalogClient::new("primary", &["sales"])],
    );
    let ctx = RequestContext::internal();
    let catalog = harness.federation.catalog();

    let write = CatalogRequest::write("create_table", "staging").with_table("orders");
    assert!(matches!(
        catalog.execute(&ctx, &write).await.unwrap_err(),
        FederationError::Access(AccessError::NotWhitelisted { .. })
    ));

    catalog
        .create_database(&ctx, "staging", json!({ "location": "s3://bucket/staging" }))
        .await
        .unwrap();

    catalog.execute(&ctx, &write).await.unwrap();
    let requests = harness.client("primary").requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].operation, "create_database");
    assert_eq!(requests[0].payload["location"], "s3://bucket/staging");
}

/// Test that database creation requires a create policy on the primary.
#[tokio::test]
async fn test_create_database_not_permitted() {
    let harness = Harness::new(
        vec![primary()],
        vec![MockCatalogClient::new("primary", &[])],
    );
    let ctx = RequestContext::internal();

    let err = harness
        .federation
        .catalog()
        .create_database(&ctx, "staging", json!({}))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FederationError::Access(AccessError::CreateNotPermitted { .. })
    ));
    assert!(harness.client("primary").requests().is_empty());
}

/// Test that database creation without a primary is a routing error.
#[tokio::test]
async fn test_create_database_without_primary() {
    let harness = Harness::new(
        vec![federated("waggle")],
        vec![MockCatalogClient::new("waggle", &[])],
    );

    let err = harness
        .federation
        .catalog()
        .create_database(&RequestContext::internal(), "staging", json!({}))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FederationError::Routing(RoutingError::PrimaryNotConfigured)
    ));
}
