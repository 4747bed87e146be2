//! Database connection handle and model registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::{DocumentStore, MemoryStore};
use crate::error::{ConfigError, TenancyResult};
use crate::model::Model;
use crate::schema::{Schema, SchemaPlugin};

struct ConnectionInner {
    store: Arc<dyn DocumentStore>,
    models: RwLock<HashMap<String, Model>>,
    plugins: RwLock<Vec<Arc<dyn SchemaPlugin>>>,
}

/// A live handle to a document store.
///
/// Models are registered by name. Plugins registered with
/// [`plugin`](Self::plugin) are applied to every schema registered afterward,
/// before the schema is compiled.
///
/// `Connection` is cheap to clone; clones share the store and the registry.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("backend", &self.inner.store.backend_kind())
            .field("models", &self.model_names())
            .finish()
    }
}

impl Connection {
    /// Creates a connection over `store`.
    pub fn new<S: DocumentStore + 'static>(store: S) -> Self {
        Self::from_store(Arc::new(store))
    }

    /// Creates a connection over a shared store.
    pub fn from_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                store,
                models: RwLock::new(HashMap::new()),
                plugins: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Creates a connection over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.store
    }

    /// Registers a plugin for every schema registered after this call.
    pub fn plugin(&self, plugin: Arc<dyn SchemaPlugin>) {
        tracing::debug!(plugin = plugin.name(), "registered global schema plugin");
        self.inner.plugins.write().push(plugin);
    }

    /// Compiles `schema` into a model stored in a collection named `name`.
    ///
    /// # Errors
    ///
    /// * `ConfigError::ModelAlreadyRegistered` - If `name` is taken
    pub fn model(&self, name: &str, schema: Schema) -> TenancyResult<Model> {
        self.model_in(name, name, schema)
    }

    /// Compiles `schema` into a model stored in `collection`.
    pub fn model_in(&self, name: &str, collection: &str, mut schema: Schema) -> TenancyResult<Model> {
        if self.inner.models.read().contains_key(name) {
            return Err(ConfigError::ModelAlreadyRegistered {
                model_name: name.to_string(),
            }
            .into());
        }

        let plugins = self.inner.plugins.read().clone();
        for plugin in &plugins {
            schema.plugin(plugin.as_ref(), Some(name));
        }

        let model = Model::compile(name, collection, schema, Arc::clone(&self.inner.store));

        let mut models = self.inner.models.write();
        if models.contains_key(name) {
            return Err(ConfigError::ModelAlreadyRegistered {
                model_name: name.to_string(),
            }
            .into());
        }
        models.insert(name.to_string(), model.clone());
        tracing::debug!(model = %name, collection = %collection, "model registered");
        Ok(model)
    }

    /// Returns the model registered as `name`.
    pub fn get_model(&self, name: &str) -> Option<Model> {
        self.inner.models.read().get(name).cloned()
    }

    /// Returns the model registered as `name`, or an error.
    ///
    /// # Errors
    ///
    /// * `ConfigError::UnknownModel` - If no such model is registered
    pub fn require_model(&self, name: &str) -> TenancyResult<Model> {
        self.get_model(name).ok_or_else(|| {
            ConfigError::UnknownModel {
                model_name: name.to_string(),
            }
            .into()
        })
    }

    /// Names of every registered model, sorted.
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.models.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TenancyError;
    use crate::schema::FieldDef;

    struct Marker;

    impl SchemaPlugin for Marker {
        fn name(&self) -> &str {
            "marker"
        }

        fn apply(&self, schema: &mut Schema, model_name: Option<&str>) {
            if let Some(name) = model_name {
                schema.add_field(format!("seen_{}", name), FieldDef::boolean());
            }
        }
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let conn = Connection::in_memory();
        conn.model("A", Schema::new()).unwrap();
        let err = conn.model("A", Schema::new()).unwrap_err();
        assert!(matches!(
            err,
            TenancyError::Config(ConfigError::ModelAlreadyRegistered { .. })
        ));
    }

    #[test]
    fn test_global_plugins_apply_to_later_models() {
        let conn = Connection::in_memory();
        let before = conn.model("Before", Schema::new()).unwrap();
        conn.plugin(Arc::new(Marker));
        let after = conn.model("After", Schema::new()).unwrap();

        assert!(!before.has_field("seen_Before"));
        assert!(after.has_field("seen_After"));
    }

    #[test]
    fn test_lookup() {
        let conn = Connection::in_memory();
        conn.model_in("Item", "items", Schema::new()).unwrap();
        assert_eq!(conn.get_model("Item").unwrap().collection_name(), "items");
        assert!(conn.get_model("Other").is_none());
        assert!(conn.require_model("Other").is_err());
        assert_eq!(conn.model_names(), vec!["Item".to_string()]);

        let clone = conn.clone();
        assert!(clone.get_model("Item").is_some());
    }
}
