//! Helios Tenancy
//!
//! This crate provides per-tenant data isolation for document models. Documents
//! of tenant-scoped models are stamped with the ambient tenant on write, and
//! reads and counts are filtered to that tenant. A companion registry persists
//! the list of known tenants.
//!
//! # Features
//!
//! - **Isolation plugin**: [`TenantIsolation`] adds a tenant field and hooks to any schema
//! - **Ambient tenant**: task-local context that survives `.await` points
//! - **Exemptions**: an explicitly owned set of shared, never-filtered models
//! - **Tenant registry**: [`TenantRegistry`], a [`TenantStore`] over a document collection
//!
//! # Backend Features
//!
//! - in-memory store, always available
//! - `mongodb` - MongoDB adapter
//!
//! # Architecture
//!
//! - [`tenant`] - Tenant identifiers and the ambient tenant context
//! - [`exemption`] - The set of models excluded from isolation
//! - [`isolation`] - The isolation plugin and its hook
//! - [`registry`] - Tenant records and the tenant registry
//! - [`schema`] - Document shapes and schema plugins
//! - [`hook`] - Operation kinds and the hook trait
//! - [`connection`] - Connection handle and model registry
//! - [`model`] - Compiled models and their operations
//! - [`backend`] - Document store trait and implementations
//! - [`types`] - Documents, filters, read options and pagination
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use helios_tenancy::{
//!     Connection, ExemptModels, IsolationConfig, Tenant, TenantIsolation, TenantRegistry,
//!     TenantRegistryOptions, TenantStore,
//! };
//! use helios_tenancy::schema::{FieldDef, Schema};
//! use helios_tenancy::tenant::with_tenant;
//! use helios_tenancy::types::{Filter, FindOptions};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let exempt = ExemptModels::new();
//! let conn = Connection::in_memory();
//! conn.plugin(Arc::new(TenantIsolation::new(IsolationConfig::default(), &exempt).unwrap()));
//!
//! let tenants = TenantRegistry::new(
//!     TenantRegistryOptions::new().with_connection(conn.clone()),
//!     &exempt,
//! )
//! .unwrap();
//! tenants.add(Tenant::new("acme", "Acme Corp")).await.unwrap();
//!
//! let notes = conn
//!     .model("Note", Schema::new().field("text", FieldDef::string().required()))
//!     .unwrap();
//!
//! // Resolve the tenant the way request middleware would, then run the work.
//! assert!(tenants.exists("acme").await.unwrap());
//! with_tenant("acme", async {
//!     notes.create(json!({"text": "hello"})).await.unwrap();
//!     let count = notes.count_documents(Filter::new()).await.unwrap();
//!     assert_eq!(count, 1);
//! })
//! .await;
//!
//! // Outside any tenant scope, writes to tenant-scoped models fail validation.
//! let err = notes.create(json!({"text": "orphan"})).await.unwrap_err();
//! assert!(err.is_validation());
//!
//! // ...and reads are unfiltered.
//! let all = notes.find(Filter::new(), FindOptions::new()).await.unwrap();
//! assert_eq!(all.len(), 1);
//! # });
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backend;
pub mod connection;
pub mod error;
pub mod exemption;
pub mod hook;
pub mod isolation;
pub mod model;
pub mod registry;
pub mod schema;
pub mod tenant;
pub mod types;

// Re-export commonly used types at crate root
pub use connection::Connection;
pub use error::{TenancyError, TenancyResult};
pub use exemption::{ExemptModels, TenancyModel};
pub use isolation::{IsolationConfig, TenantIsolation};
pub use model::Model;
pub use registry::{Tenant, TenantRegistry, TenantRegistryOptions, TenantStore};
pub use tenant::{TenantId, current_tenant, with_tenant, without_tenant};

// Re-export extension points
pub use backend::{BackendKind, DocumentStore, MemoryStore};
pub use hook::{Hook, OperationKind};
pub use schema::{Schema, SchemaPlugin};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
