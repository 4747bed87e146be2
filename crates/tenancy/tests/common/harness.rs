//! Wiring helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use helios_tenancy::backend::MemoryStore;
use helios_tenancy::connection::Connection;
use helios_tenancy::exemption::ExemptModels;
use helios_tenancy::isolation::{IsolationConfig, TenantIsolation};
use helios_tenancy::registry::{TenantRegistry, TenantRegistryOptions};

/// A connection with the isolation plugin registered globally.
pub struct Harness {
    /// Raw store, for inspecting persisted documents.
    pub store: Arc<MemoryStore>,
    /// Connection over `store`.
    pub conn: Connection,
    /// Exemption set shared by the plugin and the registry.
    pub exempt: ExemptModels,
    /// The registered plugin.
    pub isolation: TenantIsolation,
}

impl Harness {
    /// Default isolation configuration.
    pub fn new() -> Self {
        Self::with_config(IsolationConfig::default())
    }

    /// Custom isolation configuration.
    pub fn with_config(config: IsolationConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let conn = Connection::from_store(store.clone());
        let exempt = ExemptModels::new();
        let isolation = TenantIsolation::new(config, &exempt).expect("valid isolation config");
        conn.plugin(Arc::new(isolation.clone()));
        Self {
            store,
            conn,
            exempt,
            isolation,
        }
    }

    /// A registry with default options on this connection.
    pub fn registry(&self) -> TenantRegistry {
        TenantRegistry::new(
            TenantRegistryOptions::new().with_connection(self.conn.clone()),
            &self.exempt,
        )
        .expect("registry")
    }
}
