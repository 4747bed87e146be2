//! Tenant identity and the ambient tenant context.
//!
//! # Core Types
//!
//! - [`TenantId`] - Opaque tenant identifier
//! - [`TenantContextProvider`] - Where the isolation hook reads the current tenant from
//! - [`with_tenant`] / [`current_tenant`] - Task-local ambient tenant scope
//!
//! # Example
//!
//! ```
//! use helios_tenancy::tenant::{with_tenant, current_tenant, TenantId};
//!
//! # tokio_test::block_on(async {
//! with_tenant("acme", async {
//!     assert_eq!(current_tenant(), Some(TenantId::new("acme")));
//! })
//! .await;
//! # });
//! ```

mod context;
mod id;

pub use context::{
    FixedTenantContext, TaskLocalTenantContext, TenantContextProvider, current_tenant,
    with_tenant, without_tenant,
};
pub use id::TenantId;
