//! In-process document store.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BackendKind, DocumentStore};
use crate::error::{BackendError, TenancyResult};
use crate::types::{Document, Filter, FindOptions, SortDirection, compare_values, lookup};

/// Configuration for the in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// Assign a generated id to documents inserted without one.
    #[serde(default = "default_true")]
    pub assign_object_ids: bool,

    /// Name of the primary key field. Always unique.
    #[serde(default = "default_id_field")]
    pub id_field: String,
}

fn default_true() -> bool {
    true
}

fn default_id_field() -> String {
    "_id".to_string()
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            assign_object_ids: true,
            id_field: default_id_field(),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryCollection {
    docs: Vec<Document>,
    unique: BTreeSet<String>,
}

impl MemoryCollection {
    fn conflict(&self, field: &str, value: &Value) -> bool {
        self.docs.iter().any(|d| d.get(field) == Some(value))
    }
}

/// A document store kept entirely in memory.
///
/// Documents are returned in insertion order unless a sort is given. Used for
/// tests and for embedding the model layer without a database.
///
/// ```
/// use helios_tenancy::backend::{DocumentStore, MemoryStore};
/// use helios_tenancy::types::{Filter, FindOptions};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// let doc = json!({"name": "a"}).as_object().cloned().unwrap();
/// let stored = store.insert_one("things", doc).await.unwrap();
/// assert!(stored.contains_key("_id"));
///
/// let found = store.find("things", &Filter::eq("name", "a"), &FindOptions::new()).await.unwrap();
/// assert_eq!(found.len(), 1);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: MemoryStoreConfig,
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl MemoryStore {
    /// Creates an empty store with default configuration.
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Creates an empty store with the given configuration.
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            config,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    /// Returns every stored document of `collection` exactly as persisted,
    /// bypassing filters and projections.
    pub fn raw_documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.docs.clone())
            .unwrap_or_default()
    }

    fn matching(&self, collection: &str, filter: &Filter) -> TenancyResult<Vec<Document>> {
        let collections = self.collections.read();
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for doc in &coll.docs {
            if filter.matches(doc)? {
                out.push(doc.clone());
            }
        }
        Ok(out)
    }
}

fn duplicate(collection: &str, field: &str, value: &Value) -> BackendError {
    BackendError::DuplicateKey {
        collection: collection.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn sort_documents(docs: &mut [Document], options: &FindOptions) {
    if options.sort.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for key in &options.sort {
            let ord = compare_values(lookup(a, &key.field), lookup(b, &key.field));
            let ord = match key.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> TenancyResult<Document> {
        let id_field = self.config.id_field.as_str();
        if self.config.assign_object_ids && !doc.contains_key(id_field) {
            doc.insert(
                id_field.to_string(),
                Value::String(uuid::Uuid::new_v4().simple().to_string()),
            );
        }

        let mut collections = self.collections.write();
        let coll = collections.entry(collection.to_string()).or_default();

        if let Some(id) = doc.get(id_field) {
            if coll.conflict(id_field, id) {
                return Err(duplicate(collection, id_field, id).into());
            }
        }
        for field in &coll.unique {
            match doc.get(field) {
                Some(value) if !value.is_null() && coll.conflict(field, value) => {
                    return Err(duplicate(collection, field, value).into());
                }
                _ => {}
            }
        }

        coll.docs.push(doc.clone());
        Ok(doc)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> TenancyResult<Vec<Document>> {
        let mut docs = self.matching(collection, filter)?;
        sort_documents(&mut docs, options);

        let skip = usize::try_from(options.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        Ok(docs
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| match &options.projection {
                Some(projection) => projection.apply(doc),
                None => doc,
            })
            .collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> TenancyResult<u64> {
        let matched = self.matching(collection, filter)?.len();
        Ok(u64::try_from(matched).unwrap_or(u64::MAX))
    }

    async fn ensure_index(&self, collection: &str, field: &str, unique: bool) -> TenancyResult<()> {
        if !unique {
            return Ok(());
        }
        let mut collections = self.collections.write();
        let coll = collections.entry(collection.to_string()).or_default();
        if coll.unique.contains(field) {
            return Ok(());
        }

        let mut seen: Vec<&Value> = Vec::new();
        for doc in &coll.docs {
            if let Some(value) = doc.get(field).filter(|v| !v.is_null()) {
                if seen.contains(&value) {
                    return Err(duplicate(collection, field, value).into());
                }
                seen.push(value);
            }
        }

        tracing::debug!(collection, field, "created unique index");
        coll.unique.insert(field.to_string());
        Ok(())
    }
}
