//! MongoDB store integration tests.
//!
//! Tests marked `#[ignore]` need a running MongoDB server. Point
//! `HELIOS_TENANCY_MONGODB_URI` at it (default `mongodb://localhost:27017`).
//!
//! Run with: `cargo test -p helios-tenancy --features mongodb -- --ignored mongodb`

#![cfg(feature = "mongodb")]

mod common;

use std::sync::Arc;

use serde_json::json;

use common::*;
use helios_tenancy::backend::{BackendKind, DocumentStore, MongoStore};
use helios_tenancy::error::{BackendError, TenancyError};
use helios_tenancy::isolation::{IsolationConfig, TenantIsolation};
use helios_tenancy::model::collect_stream;
use helios_tenancy::tenant::with_tenant;
use helios_tenancy::types::{Document, Filter, FindOptions, Projection, SortDirection};
use helios_tenancy::{Connection, ExemptModels};

fn mongodb_uri() -> String {
    std::env::var("HELIOS_TENANCY_MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

async fn create_store() -> MongoStore {
    let database = format!("helios_tenancy_{}", uuid::Uuid::new_v4().simple());
    MongoStore::connect(&mongodb_uri(), &database)
        .await
        .expect("Failed to connect to MongoDB")
}

fn doc(value: serde_json::Value) -> Document {
    value.as_object().cloned().unwrap()
}

// ============================================================================
// Connection Tests (no MongoDB instance required)
// ============================================================================

#[tokio::test]
async fn test_mongodb_invalid_uri_is_unavailable() {
    let err = MongoStore::connect("not-a-mongodb-uri", "db").await.unwrap_err();
    assert!(matches!(
        err,
        TenancyError::Backend(BackendError::Unavailable { .. })
    ));
}

// ============================================================================
// Store Tests (MongoDB instance required)
// ============================================================================

#[tokio::test]
#[ignore]
async fn mongodb_insert_find_stream_count() {
    let store = create_store().await;
    assert_eq!(store.backend_kind(), BackendKind::MongoDB);

    for (name, rank) in [("c", 3), ("a", 1), ("b", 2)] {
        let stored = store
            .insert_one("items", doc(json!({"name": name, "rank": rank})))
            .await
            .unwrap();
        assert!(stored.contains_key("_id"));
    }

    let options = FindOptions::new()
        .sort_by("rank", SortDirection::Ascending)
        .with_skip(1)
        .with_limit(1)
        .with_projection(Projection::exclude(["_id"]));
    let found = store.find("items", &Filter::new(), &options).await.unwrap();
    assert_eq!(found, vec![doc(json!({"name": "b", "rank": 2}))]);

    let streamed = collect_stream(
        store
            .find_stream("items", &Filter::eq("name", "c"), &FindOptions::new())
            .await
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(streamed.len(), 1);

    let filter = Filter::from_value(json!({"rank": {"$gte": 2}})).unwrap();
    assert_eq!(store.count("items", &filter).await.unwrap(), 2);

    store.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn mongodb_unique_index_reports_duplicate_key() {
    let store = create_store().await;

    store.ensure_index("tenants", "id", true).await.unwrap();
    store
        .insert_one("tenants", doc(json!({"id": "t1"})))
        .await
        .unwrap();
    let err = store
        .insert_one("tenants", doc(json!({"id": "t1"})))
        .await
        .unwrap_err();
    assert!(err.is_duplicate_key());

    for _ in 0..2 {
        store
            .insert_one("dups", doc(json!({"id": "same"})))
            .await
            .unwrap();
    }
    let err = store.ensure_index("dups", "id", true).await.unwrap_err();
    match err {
        TenancyError::Backend(BackendError::DuplicateKey { field, .. }) => assert_eq!(field, "id"),
        other => panic!("unexpected error: {other}"),
    }

    store.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn mongodb_tenant_isolation_end_to_end() {
    let store = create_store().await;
    let database = store.database().clone();
    let conn = Connection::new(store);
    let exempt = ExemptModels::new();
    conn.plugin(Arc::new(
        TenantIsolation::new(IsolationConfig::default(), &exempt).unwrap(),
    ));
    let items = conn.model("Item", item_schema()).unwrap();

    with_tenant(TENANT_1, items.create(item("a", 1))).await.unwrap();
    with_tenant(TENANT_2, items.create(item("b", 2))).await.unwrap();

    let t1 = with_tenant(TENANT_1, items.find(Filter::new(), FindOptions::new()))
        .await
        .unwrap();
    assert_eq!(strings(&t1, "title"), vec!["a"]);
    let count = with_tenant(TENANT_2, items.count_documents(Filter::new()))
        .await
        .unwrap();
    assert_eq!(count, 1);

    database.drop().await.unwrap();
}
