//! Models excluded from tenant isolation.
//!
//! [`ExemptModels`] is an explicitly owned set of model names. Every clone of
//! a handle shares the same set, so the isolation plugin, the tenant registry
//! and application code can all add names and observe each other's changes.
//! Membership is expected to settle at startup; reads taken while another
//! thread is still registering models may see either state.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// How a model relates to tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TenancyModel {
    /// Documents belong to one tenant and are filtered and stamped.
    #[default]
    TenantScoped,

    /// Documents are global: never filtered, never stamped.
    Shared,
}

/// Shared, mutable set of exempt model names.
///
/// # Examples
///
/// ```
/// use helios_tenancy::exemption::{ExemptModels, TenancyModel};
///
/// let exempt = ExemptModels::new();
/// let handle = exempt.clone();
/// handle.insert("Country");
///
/// assert!(exempt.contains("Country"));
/// assert_eq!(exempt.tenancy_model("Order"), TenancyModel::TenantScoped);
/// assert_eq!(exempt.tenancy_model("Country"), TenancyModel::Shared);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExemptModels {
    names: Arc<RwLock<BTreeSet<String>>>,
}

impl ExemptModels {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set with the given names.
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let exempt = Self::new();
        exempt.extend(names);
        exempt
    }

    /// Adds a model name. Returns `true` if it was not already present.
    pub fn insert(&self, name: impl Into<String>) -> bool {
        let name = name.into();
        let added = self.names.write().insert(name.clone());
        if added {
            tracing::debug!(model = %name, "model exempted from tenant isolation");
        }
        added
    }

    /// Adds several model names.
    pub fn extend<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.insert(name);
        }
    }

    /// Removes a model name. Returns `true` if it was present.
    pub fn remove(&self, name: &str) -> bool {
        self.names.write().remove(name)
    }

    /// Returns `true` if `name` is exempt.
    pub fn contains(&self, name: &str) -> bool {
        self.names.read().contains(name)
    }

    /// Returns the tenancy model for `name`.
    pub fn tenancy_model(&self, name: &str) -> TenancyModel {
        if self.contains(name) {
            TenancyModel::Shared
        } else {
            TenancyModel::TenantScoped
        }
    }

    /// Returns a sorted snapshot of the exempt names.
    pub fn names(&self) -> Vec<String> {
        self.names.read().iter().cloned().collect()
    }

    /// Number of exempt names.
    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    /// Returns `true` if no model is exempt.
    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }

    /// Removes every name.
    pub fn clear(&self) {
        self.names.write().clear();
    }

    /// Returns `true` if both handles share the same underlying set.
    pub fn same_set(&self, other: &ExemptModels) -> bool {
        Arc::ptr_eq(&self.names, &other.names)
    }
}
