//! Custom document store integration tests.
//!
//! A store implemented outside the crate receives filters and options exactly
//! as the hooks left them.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use common::*;
use helios_tenancy::backend::{BackendKind, DocumentStore, MemoryStore};
use helios_tenancy::error::TenancyResult;
use helios_tenancy::isolation::{IsolationConfig, TenantIsolation};
use helios_tenancy::tenant::with_tenant;
use helios_tenancy::types::{Document, Filter, FindOptions, Projection};
use helios_tenancy::{Connection, ExemptModels};

/// Delegates to a memory store and records every filter it is handed.
#[derive(Debug, Default)]
struct RecordingStore {
    inner: MemoryStore,
    filters: Mutex<Vec<Filter>>,
    options: Mutex<Vec<FindOptions>>,
}

#[async_trait]
impl DocumentStore for RecordingStore {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::Custom("recording")
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> TenancyResult<Document> {
        self.inner.insert_one(collection, doc).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> TenancyResult<Vec<Document>> {
        self.filters.lock().push(filter.clone());
        self.options.lock().push(options.clone());
        self.inner.find(collection, filter, options).await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> TenancyResult<u64> {
        self.filters.lock().push(filter.clone());
        self.inner.count(collection, filter).await
    }

    async fn ensure_index(&self, collection: &str, field: &str, unique: bool) -> TenancyResult<()> {
        self.inner.ensure_index(collection, field, unique).await
    }
}

fn isolated(store: Arc<RecordingStore>, config: IsolationConfig) -> Connection {
    let conn = Connection::from_store(store);
    let exempt = ExemptModels::new();
    conn.plugin(Arc::new(TenantIsolation::new(config, &exempt).unwrap()));
    conn
}

#[test]
fn test_custom_backend_kind() {
    let store = Arc::new(RecordingStore::default());
    let conn = Connection::from_store(store);
    assert_eq!(conn.store().backend_kind(), BackendKind::Custom("recording"));
    assert_eq!(conn.store().backend_kind().to_string(), "recording");
    assert!(format!("{:?}", conn).contains("Custom(\"recording\")"));
}

#[tokio::test]
async fn test_custom_store_sees_rewritten_queries() {
    let store = Arc::new(RecordingStore::default());
    let conn = isolated(store.clone(), IsolationConfig::new().with_hide_tenant_id(true));
    let items = conn.model("Item", item_schema()).unwrap();

    with_tenant(TENANT_1, async {
        items.create(item("a", 1)).await.unwrap();
        items.find(Filter::eq("rank", 1), FindOptions::new()).await.unwrap();
        items.count_documents(Filter::new()).await.unwrap();
    })
    .await;

    let filters = store.filters.lock().clone();
    assert_eq!(
        filters,
        vec![
            Filter::eq("rank", 1).and_eq("tenantId", TENANT_1),
            Filter::eq("tenantId", TENANT_1),
        ]
    );
    assert_eq!(
        store.options.lock()[0].projection,
        Some(Projection::exclude(["tenantId"]))
    );
}

#[tokio::test]
async fn test_custom_store_default_stream_is_filtered() {
    let store = Arc::new(RecordingStore::default());
    let conn = isolated(store.clone(), IsolationConfig::new());
    let items = conn.model("Item", item_schema()).unwrap();

    items.create(tagged_item("a", 1, TENANT_1)).await.unwrap();
    items.create(tagged_item("b", 2, TENANT_2)).await.unwrap();

    let streamed = with_tenant(TENANT_2, async {
        helios_tenancy::model::collect_stream(items.stream(Filter::new(), FindOptions::new()).await?)
            .await
    })
    .await
    .unwrap();
    assert_eq!(strings(&streamed, "title"), vec!["b"]);
    assert_eq!(store.filters.lock().len(), 1);
}
