//! Operation hooks.
//!
//! Models run every attached [`Hook`] around each operation. The intercepted
//! operations form a closed set, [`OperationKind`], and each kind has its own
//! `before_*`/`after_*` pair. Hooks run in attachment order; an error from a
//! `before_*` method aborts the operation before it reaches the store.
//!
//! | Kind | Model operations | Context |
//! |------|------------------|---------|
//! | `Read` | `find`, `find_one`, `find_page`, `stream` | [`QueryContext`] |
//! | `Count` | `count_documents` | [`QueryContext`] |
//! | `Validate` | `validate`, `create`, `insert_many` | [`DocumentContext`] |
//! | `Write` | `create`, `insert_many` | [`DocumentContext`] |

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TenancyResult;
use crate::types::{Document, Filter, FindOptions};

/// The kinds of operation a hook can intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Any retrieval of documents.
    Read,
    /// Counting matching documents.
    Count,
    /// Persisting a document.
    Write,
    /// Validating a document against its schema.
    Validate,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Read => write!(f, "read"),
            OperationKind::Count => write!(f, "count"),
            OperationKind::Write => write!(f, "write"),
            OperationKind::Validate => write!(f, "validate"),
        }
    }
}

/// The retrieval variant behind a `Read` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadKind {
    /// At most one document.
    FindOne,
    /// Every matching document.
    FindMany,
    /// One page of matching documents plus a total.
    Paginated,
    /// Matching documents as a stream.
    Stream,
}

/// What a [`QueryContext`] is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// A retrieval.
    Read(ReadKind),
    /// A count.
    Count,
}

impl QueryKind {
    /// Returns the operation kind this query belongs to.
    pub fn operation(self) -> OperationKind {
        match self {
            QueryKind::Read(_) => OperationKind::Read,
            QueryKind::Count => OperationKind::Count,
        }
    }
}

/// A pending read or count, as seen by hooks.
///
/// `before_*` hooks may rewrite `filter` and `options`; the model executes
/// whatever they leave behind.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Concrete name of the model being queried.
    pub model_name: String,
    /// Read variant or count.
    pub kind: QueryKind,
    /// Filter criteria.
    pub filter: Filter,
    /// Sort, skip, limit and projection. Ignored for counts.
    pub options: FindOptions,
}

impl QueryContext {
    /// Creates a query context.
    pub fn new(
        model_name: impl Into<String>,
        kind: QueryKind,
        filter: Filter,
        options: FindOptions,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            kind,
            filter,
            options,
        }
    }
}

/// A document about to be validated or persisted, as seen by hooks.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    /// Concrete name of the model the document belongs to.
    pub model_name: String,
    /// `Validate` or `Write`.
    pub operation: OperationKind,
    /// The document. `before_*` hooks may modify it.
    pub document: Document,
}

impl DocumentContext {
    /// Creates a document context.
    pub fn new(model_name: impl Into<String>, operation: OperationKind, document: Document) -> Self {
        Self {
            model_name: model_name.into(),
            operation,
            document,
        }
    }
}

/// An operation interceptor attached to a schema.
///
/// Every method has a no-op default; implement only the kinds you intercept.
#[allow(unused_variables)]
pub trait Hook: Send + Sync {
    /// Name used in logs and `Debug` output.
    fn name(&self) -> &str;

    /// Runs before a read reaches the store.
    fn before_read(&self, query: &mut QueryContext) -> TenancyResult<()> {
        Ok(())
    }

    /// Runs after a buffered read returns. Not invoked for streams.
    fn after_read(&self, query: &QueryContext, results: &mut Vec<Document>) -> TenancyResult<()> {
        Ok(())
    }

    /// Runs before a count reaches the store.
    fn before_count(&self, query: &mut QueryContext) -> TenancyResult<()> {
        Ok(())
    }

    /// Runs after a count returns.
    fn after_count(&self, query: &QueryContext, count: &mut u64) -> TenancyResult<()> {
        Ok(())
    }

    /// Runs before schema validation.
    fn before_validate(&self, doc: &mut DocumentContext) -> TenancyResult<()> {
        Ok(())
    }

    /// Runs after schema validation succeeds.
    fn after_validate(&self, doc: &DocumentContext) -> TenancyResult<()> {
        Ok(())
    }

    /// Runs immediately before the document is persisted.
    fn before_write(&self, doc: &mut DocumentContext) -> TenancyResult<()> {
        Ok(())
    }

    /// Runs after the document was persisted. Sees the stored form.
    fn after_write(&self, doc: &DocumentContext) -> TenancyResult<()> {
        Ok(())
    }
}

/// The ordered hooks of one schema.
#[derive(Clone, Copy)]
pub(crate) struct HookChain<'a>(pub(crate) &'a [Arc<dyn Hook>]);

impl HookChain<'_> {
    pub(crate) fn before_query(&self, query: &mut QueryContext) -> TenancyResult<()> {
        for hook in self.0 {
            match query.kind {
                QueryKind::Read(_) => hook.before_read(query)?,
                QueryKind::Count => hook.before_count(query)?,
            }
        }
        Ok(())
    }

    pub(crate) fn after_read(
        &self,
        query: &QueryContext,
        results: &mut Vec<Document>,
    ) -> TenancyResult<()> {
        for hook in self.0 {
            hook.after_read(query, results)?;
        }
        Ok(())
    }

    pub(crate) fn after_count(&self, query: &QueryContext, count: &mut u64) -> TenancyResult<()> {
        for hook in self.0 {
            hook.after_count(query, count)?;
        }
        Ok(())
    }

    pub(crate) fn before_document(&self, doc: &mut DocumentContext) -> TenancyResult<()> {
        for hook in self.0 {
            match doc.operation {
                OperationKind::Validate => hook.before_validate(doc)?,
                OperationKind::Write => hook.before_write(doc)?,
                OperationKind::Read | OperationKind::Count => {}
            }
        }
        Ok(())
    }

    pub(crate) fn after_document(&self, doc: &DocumentContext) -> TenancyResult<()> {
        for hook in self.0 {
            match doc.operation {
                OperationKind::Validate => hook.after_validate(doc)?,
                OperationKind::Write => hook.after_write(doc)?,
                OperationKind::Read | OperationKind::Count => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Hook for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn before_read(&self, query: &mut QueryContext) -> TenancyResult<()> {
            self.calls.lock().push(format!("read:{}", query.model_name));
            query.filter.insert("seen", true);
            Ok(())
        }

        fn before_count(&self, _query: &mut QueryContext) -> TenancyResult<()> {
            self.calls.lock().push("count".to_string());
            Ok(())
        }

        fn before_write(&self, doc: &mut DocumentContext) -> TenancyResult<()> {
            self.calls.lock().push("write".to_string());
            doc.document.insert("written".to_string(), true.into());
            Ok(())
        }
    }

    #[test]
    fn test_chain_dispatches_by_kind() {
        let recorder = Arc::new(Recorder::default());
        let hooks: Vec<Arc<dyn Hook>> = vec![recorder.clone()];
        let chain = HookChain(&hooks);

        let mut read = QueryContext::new(
            "Order",
            QueryKind::Read(ReadKind::FindMany),
            Filter::new(),
            FindOptions::new(),
        );
        chain.before_query(&mut read).unwrap();
        assert!(read.filter.constrains("seen"));

        let mut count =
            QueryContext::new("Order", QueryKind::Count, Filter::new(), FindOptions::new());
        chain.before_query(&mut count).unwrap();

        let mut validate = DocumentContext::new("Order", OperationKind::Validate, Document::new());
        chain.before_document(&mut validate).unwrap();
        assert!(validate.document.is_empty());

        let mut write = DocumentContext::new("Order", OperationKind::Write, Document::new());
        chain.before_document(&mut write).unwrap();
        assert_eq!(write.document.get("written"), Some(&true.into()));

        assert_eq!(
            *recorder.calls.lock(),
            vec!["read:Order".to_string(), "count".to_string(), "write".to_string()]
        );
    }

    #[test]
    fn test_operation_kind_display() {
        assert_eq!(OperationKind::Validate.to_string(), "validate");
        assert_eq!(QueryKind::Count.operation(), OperationKind::Count);
        assert_eq!(
            QueryKind::Read(ReadKind::Stream).operation(),
            OperationKind::Read
        );
    }
}
