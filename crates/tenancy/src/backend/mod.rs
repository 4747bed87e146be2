//! Document store abstraction.
//!
//! [`DocumentStore`] is the narrow driver surface models execute against:
//! insert, find, stream, count and index creation on named collections.
//! Filters and options arrive already rewritten by hooks; stores apply them
//! literally and report their own failures unmodified.
//!
//! Available stores:
//! - [`MemoryStore`] - in-process store, always available
//! - `MongoStore` - MongoDB adapter (feature `mongodb`)

use std::fmt::Debug;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;

use crate::error::TenancyResult;
use crate::types::{Document, Filter, FindOptions};

mod memory;
#[cfg(feature = "mongodb")]
mod mongo;

pub use memory::{MemoryStore, MemoryStoreConfig};
#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;

/// A stream of documents produced by a streaming read.
pub type DocumentStream = BoxStream<'static, TenancyResult<Document>>;

/// Identifies the kind of document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// In-process memory store.
    Memory,
    /// MongoDB.
    MongoDB,
    /// Custom or unknown store.
    Custom(&'static str),
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::MongoDB => write!(f, "mongodb"),
            BackendKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Driver operations models are built on.
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Returns the kind of this store.
    fn backend_kind(&self) -> BackendKind;

    /// Persists one document and returns the stored form (with any
    /// store-generated `_id`).
    ///
    /// # Errors
    ///
    /// * `BackendError::DuplicateKey` - If a unique index is violated
    async fn insert_one(&self, collection: &str, doc: Document) -> TenancyResult<Document>;

    /// Returns every document matching `filter`, honouring `options`.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> TenancyResult<Vec<Document>>;

    /// Streams documents matching `filter`.
    ///
    /// The default implementation buffers the result of [`find`](Self::find).
    async fn find_stream(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> TenancyResult<DocumentStream> {
        let docs = self.find(collection, filter, options).await?;
        Ok(futures::stream::iter(docs.into_iter().map(Ok)).boxed())
    }

    /// Counts documents matching `filter`.
    async fn count(&self, collection: &str, filter: &Filter) -> TenancyResult<u64>;

    /// Creates an index on `field` if it does not exist.
    async fn ensure_index(&self, collection: &str, field: &str, unique: bool) -> TenancyResult<()>;
}
