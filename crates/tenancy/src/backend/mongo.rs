//! MongoDB document store.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use mongodb::bson::{self, Bson, Document as BsonDocument, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use serde_json::Value;

use super::{BackendKind, DocumentStore, DocumentStream};
use crate::error::{BackendError, TenancyError, TenancyResult};
use crate::types::{Document, Filter, FindOptions};

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Document store backed by a MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Wraps an existing database handle.
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Connects to `uri`, pings the server and uses `database`.
    ///
    /// # Errors
    ///
    /// * `BackendError::Unavailable` - If the URI is rejected or the server does not answer
    pub async fn connect(uri: &str, database: &str) -> TenancyResult<Self> {
        let client = Client::with_uri_str(uri).await.map_err(unavailable)?;
        let database = client.database(database);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(unavailable)?;
        tracing::info!(database = %database.name(), "connected to MongoDB");
        Ok(Self::new(database))
    }

    /// Returns the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection(name)
    }
}

fn to_bson(doc: &Document) -> TenancyResult<BsonDocument> {
    bson::to_document(doc).map_err(|e| {
        BackendError::Serialization {
            message: e.to_string(),
        }
        .into()
    })
}

fn from_bson(doc: BsonDocument) -> Document {
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn sort_document(options: &FindOptions) -> BsonDocument {
    let mut sort = BsonDocument::new();
    for key in &options.sort {
        sort.insert(key.field.clone(), key.direction.as_i32());
    }
    sort
}

// "E11000 duplicate key error collection: db.tenants index: id_1 dup key: { id: \"t1\" }"
fn index_name(message: &str) -> String {
    message
        .split_once("index: ")
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .unwrap_or("unknown")
        .to_string()
}

fn unavailable(err: mongodb::error::Error) -> TenancyError {
    BackendError::Unavailable {
        backend_name: "mongodb".to_string(),
        message: err.to_string(),
    }
    .into()
}

/// Server message of a duplicate-key failure. Inserts report it as a write
/// error, index builds over existing duplicates as a command error.
fn duplicate_key_message(kind: &ErrorKind) -> Option<&str> {
    match kind {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY_CODE => {
            Some(e.message.as_str())
        }
        ErrorKind::Command(e) if e.code == DUPLICATE_KEY_CODE => Some(e.message.as_str()),
        _ => None,
    }
}

/// Maps duplicate-key failures to `BackendError::DuplicateKey`. `field` names
/// the indexed field when known; otherwise the index name is taken from the
/// server message.
fn map_write_error(collection: &str, field: Option<&str>, err: mongodb::error::Error) -> TenancyError {
    if let Some(message) = duplicate_key_message(err.kind.as_ref()) {
        return BackendError::DuplicateKey {
            collection: collection.to_string(),
            field: field.map_or_else(|| index_name(message), str::to_string),
            value: message.to_string(),
        }
        .into();
    }
    err.into()
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::MongoDB
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> TenancyResult<Document> {
        let bson_doc = to_bson(&doc)?;
        let result = self
            .collection(collection)
            .insert_one(bson_doc)
            .await
            .map_err(|e| map_write_error(collection, None, e))?;
        if !doc.contains_key("_id") {
            doc.insert("_id".to_string(), result.inserted_id.into_relaxed_extjson());
        }
        Ok(doc)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> TenancyResult<Vec<Document>> {
        let stream = self.find_stream(collection, filter, options).await?;
        stream.try_collect().await
    }

    async fn find_stream(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> TenancyResult<DocumentStream> {
        let coll = self.collection(collection);
        let mut action = coll.find(to_bson(filter.as_document())?);
        if !options.sort.is_empty() {
            action = action.sort(sort_document(options));
        }
        if let Some(skip) = options.skip {
            action = action.skip(skip);
        }
        if let Some(limit) = options.limit {
            action = action.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(projection) = &options.projection {
            action = action.projection(to_bson(&projection.to_document())?);
        }

        let cursor = action.await?;
        Ok(cursor
            .map_ok(from_bson)
            .map_err(TenancyError::from)
            .boxed())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> TenancyResult<u64> {
        let count = self
            .collection(collection)
            .count_documents(to_bson(filter.as_document())?)
            .await?;
        Ok(count)
    }

    async fn ensure_index(&self, collection: &str, field: &str, unique: bool) -> TenancyResult<()> {
        let mut keys = BsonDocument::new();
        keys.insert(field, 1_i32);
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(unique).build())
            .build();
        self.collection(collection)
            .create_index(index)
            .await
            .map_err(|e| map_write_error(collection, Some(field), e))?;
        tracing::debug!(collection, field, unique, "ensured MongoDB index");
        Ok(())
    }
}
