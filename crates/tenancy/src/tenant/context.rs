//! Ambient tenant context.
//!
//! The current tenant is carried in a tokio task-local slot. Binding a tenant
//! with [`with_tenant`] makes it visible to every hook that runs while the
//! wrapped future is polled, across `.await` points, without being threaded
//! through each call. Concurrent tasks each see their own binding.
//!
//! Code that prefers to pass the tenant explicitly can hand the isolation hook
//! a [`FixedTenantContext`] instead of the task-local default.
//!
//! ```
//! use helios_tenancy::tenant::{current_tenant, with_tenant, TenantId};
//!
//! # tokio_test::block_on(async {
//! assert_eq!(current_tenant(), None);
//! let seen = with_tenant(TenantId::new("acme"), async { current_tenant() }).await;
//! assert_eq!(seen, Some(TenantId::new("acme")));
//! # });
//! ```

use std::future::Future;

use super::TenantId;

tokio::task_local! {
    static CURRENT_TENANT: Option<TenantId>;
}

/// Runs `future` with `tenant` bound as the ambient tenant.
///
/// Nested calls shadow the outer binding for the duration of the inner future.
pub async fn with_tenant<F>(tenant: impl Into<TenantId>, future: F) -> F::Output
where
    F: Future,
{
    CURRENT_TENANT.scope(Some(tenant.into()), future).await
}

/// Runs `future` with an explicitly empty ambient tenant.
///
/// Useful inside an outer tenant scope for work that must see every tenant
/// (administrative reads fall back to the unfiltered default).
pub async fn without_tenant<F>(future: F) -> F::Output
where
    F: Future,
{
    CURRENT_TENANT.scope(None, future).await
}

/// Returns the ambient tenant, or `None` outside any tenant scope.
pub fn current_tenant() -> Option<TenantId> {
    CURRENT_TENANT.try_with(Clone::clone).ok().flatten()
}

/// Source of the current tenant identifier consulted by the isolation hook.
///
/// Reads happen synchronously at each interception point.
pub trait TenantContextProvider: Send + Sync {
    /// Returns the current tenant identifier, or `None` if unresolved.
    fn tenant_id(&self) -> Option<TenantId>;
}

/// Provider backed by the task-local ambient slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLocalTenantContext;

impl TenantContextProvider for TaskLocalTenantContext {
    fn tenant_id(&self) -> Option<TenantId> {
        current_tenant()
    }
}

/// Provider that always reports the same tenant (or none).
#[derive(Debug, Clone, Default)]
pub struct FixedTenantContext(Option<TenantId>);

impl FixedTenantContext {
    /// A provider that always reports `tenant`.
    pub fn new(tenant: impl Into<TenantId>) -> Self {
        Self(Some(tenant.into()))
    }

    /// A provider that never reports a tenant.
    pub fn none() -> Self {
        Self(None)
    }
}

impl TenantContextProvider for FixedTenantContext {
    fn tenant_id(&self) -> Option<TenantId> {
        self.0.clone()
    }
}
