//! Compiled models.
//!
//! A [`Model`] binds a concrete name and collection to a [`Schema`] and a
//! [`DocumentStore`]. Every operation builds a hook context, runs the schema's
//! hooks for its [`OperationKind`], and executes whatever the hooks leave
//! behind against the store.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::backend::{DocumentStore, DocumentStream};
use crate::error::{TenancyError, TenancyResult, ValidationError};
use crate::hook::{DocumentContext, HookChain, OperationKind, QueryContext, QueryKind, ReadKind};
use crate::schema::Schema;
use crate::types::{Document, Filter, FindOptions, Page, PageInfo, PageRequest};

struct ModelInner {
    name: String,
    collection: String,
    schema: Schema,
    store: Arc<dyn DocumentStore>,
    indexes: OnceCell<()>,
}

/// A named, schema-bound collection.
///
/// `Model` is cheap to clone; clones share the schema, store and index state.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.inner.name)
            .field("collection", &self.inner.collection)
            .field("schema", &self.inner.schema)
            .field("backend", &self.inner.store.backend_kind())
            .finish()
    }
}

impl Model {
    pub(crate) fn compile(
        name: impl Into<String>,
        collection: impl Into<String>,
        schema: Schema,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                name: name.into(),
                collection: collection.into(),
                schema,
                store,
                indexes: OnceCell::new(),
            }),
        }
    }

    /// The concrete model name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The collection documents are stored in.
    pub fn collection_name(&self) -> &str {
        &self.inner.collection
    }

    /// The compiled schema.
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Returns `true` if the schema declares `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.inner.schema.has_field(field)
    }

    fn hooks(&self) -> HookChain<'_> {
        HookChain(self.inner.schema.hooks())
    }

    fn query(&self, kind: QueryKind, filter: Filter, options: FindOptions) -> TenancyResult<QueryContext> {
        let mut query = QueryContext::new(self.inner.name.clone(), kind, filter, options);
        self.hooks().before_query(&mut query)?;
        Ok(query)
    }

    async fn read(&self, query: QueryContext) -> TenancyResult<Vec<Document>> {
        let mut docs = self
            .inner
            .store
            .find(&self.inner.collection, &query.filter, &query.options)
            .await?;
        self.hooks().after_read(&query, &mut docs)?;
        Ok(docs)
    }

    /// Returns every document matching `filter`.
    pub async fn find(&self, filter: Filter, options: FindOptions) -> TenancyResult<Vec<Document>> {
        let query = self.query(QueryKind::Read(ReadKind::FindMany), filter, options)?;
        self.read(query).await
    }

    /// Returns the first document matching `filter`, or `None`.
    pub async fn find_one(&self, filter: Filter, options: FindOptions) -> TenancyResult<Option<Document>> {
        let query = self.query(
            QueryKind::Read(ReadKind::FindOne),
            filter,
            options.with_limit(1),
        )?;
        Ok(self.read(query).await?.into_iter().next())
    }

    /// Returns one page of documents matching `filter` plus the total count.
    ///
    /// `skip` and `limit` in `options` are replaced by the page window. The
    /// total is counted with the same (hook-rewritten) filter as the page.
    pub async fn find_page(
        &self,
        filter: Filter,
        options: FindOptions,
        page: PageRequest,
    ) -> TenancyResult<Page<Document>> {
        let options = options.with_skip(page.skip()).with_limit(page.limit());
        let query = self.query(QueryKind::Read(ReadKind::Paginated), filter, options)?;
        let total = self
            .inner
            .store
            .count(&self.inner.collection, &query.filter)
            .await?;
        let items = self.read(query).await?;
        Ok(Page::new(items, PageInfo::for_request(&page, total)))
    }

    /// Streams documents matching `filter`.
    ///
    /// `before_read` hooks run before the stream opens; `after_read` hooks do
    /// not run for streams.
    pub async fn stream(&self, filter: Filter, options: FindOptions) -> TenancyResult<DocumentStream> {
        let query = self.query(QueryKind::Read(ReadKind::Stream), filter, options)?;
        self.inner
            .store
            .find_stream(&self.inner.collection, &query.filter, &query.options)
            .await
    }

    /// Counts documents matching `filter`.
    pub async fn count_documents(&self, filter: Filter) -> TenancyResult<u64> {
        let query = self.query(QueryKind::Count, filter, FindOptions::new())?;
        let mut count = self
            .inner
            .store
            .count(&self.inner.collection, &query.filter)
            .await?;
        self.hooks().after_count(&query, &mut count)?;
        Ok(count)
    }

    /// Runs validate hooks and schema validation, returning the document as
    /// the hooks left it.
    pub fn validate(&self, doc: Value) -> TenancyResult<Document> {
        let doc = self.as_document(doc)?;
        self.validate_document(doc)
    }

    fn validate_document(&self, doc: Document) -> TenancyResult<Document> {
        let mut ctx = DocumentContext::new(self.inner.name.clone(), OperationKind::Validate, doc);
        self.hooks().before_document(&mut ctx)?;
        self.inner.schema.validate(&self.inner.name, &ctx.document)?;
        self.hooks().after_document(&ctx)?;
        Ok(ctx.document)
    }

    fn as_document(&self, doc: Value) -> TenancyResult<Document> {
        match doc {
            Value::Object(map) => Ok(map),
            _ => Err(ValidationError::NotAnObject {
                model_name: self.inner.name.clone(),
            }
            .into()),
        }
    }

    /// Validates and persists one document, returning the stored form.
    ///
    /// Order: validate hooks, schema validation, write hooks, insert.
    ///
    /// # Errors
    ///
    /// * `TenancyError::Validation` - If the document fails schema validation
    /// * `TenancyError::Backend` - Driver failures, passed through unchanged
    pub async fn create(&self, doc: Value) -> TenancyResult<Document> {
        let doc = self.as_document(doc)?;
        let doc = self.validate_document(doc)?;
        self.ensure_indexes().await?;

        let mut ctx = DocumentContext::new(self.inner.name.clone(), OperationKind::Write, doc);
        self.hooks().before_document(&mut ctx)?;

        let stored = self
            .inner
            .store
            .insert_one(&self.inner.collection, ctx.document)
            .await?;
        let ctx = DocumentContext::new(self.inner.name.clone(), OperationKind::Write, stored);
        self.hooks().after_document(&ctx)?;
        tracing::trace!(model = %self.inner.name, "document created");
        Ok(ctx.document)
    }

    /// Serializes `value` and persists it with [`create`](Self::create).
    pub async fn create_from<T: Serialize>(&self, value: &T) -> TenancyResult<Document> {
        self.create(serde_json::to_value(value)?).await
    }

    /// Persists documents one at a time, stopping at the first failure.
    /// Documents persisted before the failure stay persisted.
    pub async fn insert_many(&self, docs: Vec<Value>) -> TenancyResult<Vec<Document>> {
        let mut stored = Vec::with_capacity(docs.len());
        for doc in docs {
            stored.push(self.create(doc).await?);
        }
        Ok(stored)
    }

    /// Creates the store indexes declared by the schema. Runs once per model;
    /// `create` calls it implicitly.
    pub async fn ensure_indexes(&self) -> TenancyResult<()> {
        self.inner
            .indexes
            .get_or_try_init(|| async {
                for field in self.inner.schema.unique_fields() {
                    self.inner
                        .store
                        .ensure_index(&self.inner.collection, field, true)
                        .await?;
                }
                Ok::<(), TenancyError>(())
            })
            .await?;
        Ok(())
    }
}

/// Deserializes a stored document into `T`.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> TenancyResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Collects a document stream into a vector, stopping at the first error.
pub async fn collect_stream(mut stream: DocumentStream) -> TenancyResult<Vec<Document>> {
    let mut docs = Vec::new();
    while let Some(doc) = stream.next().await {
        docs.push(doc?);
    }
    Ok(docs)
}
