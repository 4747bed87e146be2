//! Document, filter and read-option types shared by models and backends.

mod filter;
mod options;
mod pagination;

pub(crate) use filter::{compare_values, lookup};
pub use filter::Filter;
pub use options::{FindOptions, Projection, SortDirection, SortKey};
pub use pagination::{DEFAULT_PER_PAGE, Page, PageInfo, PageRequest};

/// A stored document: a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;
