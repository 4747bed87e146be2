//! Tenant registry.
//!
//! [`TenantRegistry`] persists tenant records in a document collection and
//! implements [`TenantStore`], the lookup contract tenant-resolution
//! middleware uses to check that a resolved identifier names a real tenant.
//!
//! The registry's model is always added to the exemption set, so tenant
//! records are never filtered or stamped by tenant isolation.
//!
//! # Example
//!
//! ```
//! use helios_tenancy::connection::Connection;
//! use helios_tenancy::exemption::ExemptModels;
//! use helios_tenancy::registry::{Tenant, TenantRegistry, TenantRegistryOptions, TenantStore};
//!
//! # tokio_test::block_on(async {
//! let exempt = ExemptModels::new();
//! let options = TenantRegistryOptions::new().with_connection(Connection::in_memory());
//! let registry = TenantRegistry::new(options, &exempt).unwrap();
//! assert!(exempt.contains("Tenant"));
//!
//! registry.add(Tenant::new("t1", "Acme")).await.unwrap();
//! let found = registry.get_by_id("t1").await.unwrap();
//! assert_eq!(found, Some(Tenant::new("t1", "Acme")));
//! assert_eq!(registry.get_by_id("missing").await.unwrap(), None);
//! # });
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connection::Connection;
use crate::error::{ConfigError, TenancyResult};
use crate::exemption::ExemptModels;
use crate::model::{Model, from_document};
use crate::schema::{FieldDef, Schema};
use crate::tenant::TenantId;
use crate::types::{Document, Filter, FindOptions, Projection};

/// Default name of the tenant model.
pub const DEFAULT_TENANT_MODEL: &str = "Tenant";

/// A tenant record.
///
/// Fields other than `id` and `name` are kept in `extra` and stored alongside
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique tenant identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Custom fields.
    #[serde(flatten)]
    pub extra: Document,
}

impl Tenant {
    /// Creates a record with no custom fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            extra: Document::new(),
        }
    }

    /// Adds a custom field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Returns the identifier as a [`TenantId`].
    pub fn tenant_id(&self) -> TenantId {
        TenantId::new(self.id.clone())
    }
}

/// Storage contract for tenant records.
///
/// Lookups return `Ok(None)` for unknown tenants; errors are reserved for
/// storage failures.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Returns every tenant.
    async fn get_all(&self) -> TenancyResult<Vec<Tenant>>;

    /// Persists a tenant and returns the input unchanged.
    ///
    /// # Errors
    ///
    /// * `BackendError::DuplicateKey` - If the id is already taken
    async fn add(&self, tenant: Tenant) -> TenancyResult<Tenant>;

    /// Looks up a tenant by id.
    async fn get_by_id(&self, id: &str) -> TenancyResult<Option<Tenant>>;

    /// Looks up a tenant by name.
    async fn get_by_name(&self, name: &str) -> TenancyResult<Option<Tenant>>;

    /// Returns `true` if a tenant with `id` exists.
    async fn exists(&self, id: &str) -> TenancyResult<bool> {
        Ok(self.get_by_id(id).await?.is_some())
    }
}

/// Construction options for [`TenantRegistry`].
#[derive(Debug, Clone)]
pub struct TenantRegistryOptions {
    /// Connection the tenant model lives on. Required.
    pub connection: Option<Connection>,

    /// Name of the tenant model. Ignored when `model` is supplied.
    pub model_name: String,

    /// Shape of tenant records. Defaults to [`TenantRegistry::default_schema`].
    pub schema: Option<Schema>,

    /// A pre-built model to use instead of registering one.
    pub model: Option<Model>,
}

impl Default for TenantRegistryOptions {
    fn default() -> Self {
        Self {
            connection: None,
            model_name: DEFAULT_TENANT_MODEL.to_string(),
            schema: None,
            model: None,
        }
    }
}

impl TenantRegistryOptions {
    /// Creates options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection.
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Sets the model name.
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    /// Sets the record schema.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Supplies a pre-built model.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }
}

/// Document-backed [`TenantStore`].
#[derive(Debug, Clone)]
pub struct TenantRegistry {
    model: Model,
}

impl TenantRegistry {
    /// Resolves the tenant model and exempts it from isolation.
    ///
    /// A model already registered under `options.model_name` is reused;
    /// otherwise one is registered with `options.schema` or the default
    /// schema.
    ///
    /// # Errors
    ///
    /// * `ConfigError::MissingConnection` - If no connection was supplied
    /// * `ConfigError::InvalidTenantModel` - If a supplied model lacks `id` or `name`
    pub fn new(options: TenantRegistryOptions, exemptions: &ExemptModels) -> TenancyResult<Self> {
        let Some(connection) = options.connection else {
            return Err(ConfigError::MissingConnection.into());
        };

        let model = match options.model {
            Some(model) => {
                let missing_fields: Vec<String> = ["id", "name"]
                    .into_iter()
                    .filter(|f| !model.has_field(f))
                    .map(String::from)
                    .collect();
                if !missing_fields.is_empty() {
                    return Err(ConfigError::InvalidTenantModel {
                        model_name: model.name().to_string(),
                        missing_fields,
                    }
                    .into());
                }
                model
            }
            None => {
                exemptions.insert(options.model_name.clone());
                match connection.get_model(&options.model_name) {
                    Some(model) => model,
                    None => connection.model(
                        &options.model_name,
                        options.schema.unwrap_or_else(Self::default_schema),
                    )?,
                }
            }
        };

        exemptions.insert(model.name());
        tracing::info!(
            model = %model.name(),
            collection = %model.collection_name(),
            "tenant registry initialized"
        );

        Ok(Self { model })
    }

    /// `{id: string, required, unique; name: string, required}`.
    pub fn default_schema() -> Schema {
        Schema::new()
            .field("id", FieldDef::string().required().unique())
            .field("name", FieldDef::string().required())
    }

    /// The tenant model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    fn read_options() -> FindOptions {
        FindOptions::new().with_projection(Projection::exclude(["_id"]))
    }

    async fn find_one_by(&self, field: &str, value: &str) -> TenancyResult<Option<Tenant>> {
        self.model
            .find_one(Filter::eq(field, value), Self::read_options())
            .await?
            .map(from_document)
            .transpose()
    }
}

#[async_trait]
impl TenantStore for TenantRegistry {
    async fn get_all(&self) -> TenancyResult<Vec<Tenant>> {
        self.model
            .find(Filter::new(), Self::read_options())
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    async fn add(&self, tenant: Tenant) -> TenancyResult<Tenant> {
        self.model.create_from(&tenant).await?;
        tracing::debug!(tenant_id = %tenant.id, "tenant added");
        Ok(tenant)
    }

    async fn get_by_id(&self, id: &str) -> TenancyResult<Option<Tenant>> {
        self.find_one_by("id", id).await
    }

    async fn get_by_name(&self, name: &str) -> TenancyResult<Option<Tenant>> {
        self.find_one_by("name", name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TenancyError;
    use serde_json::json;

    #[test]
    fn test_missing_connection() {
        let err = TenantRegistry::new(TenantRegistryOptions::new(), &ExemptModels::new()).unwrap_err();
        assert!(matches!(err, TenancyError::Config(ConfigError::MissingConnection)));
    }

    #[test]
    fn test_supplied_model_must_declare_identity() {
        let conn = Connection::in_memory();
        let model = conn
            .model("Org", Schema::new().field("id", FieldDef::string()))
            .unwrap();
        let exempt = ExemptModels::new();
        let err = TenantRegistry::new(
            TenantRegistryOptions::new().with_connection(conn).with_model(model),
            &exempt,
        )
        .unwrap_err();
        match err {
            TenancyError::Config(ConfigError::InvalidTenantModel { missing_fields, .. }) => {
                assert_eq!(missing_fields, vec!["name".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!exempt.contains("Org"));
    }

    #[test]
    fn test_supplied_model_exempted() {
        let conn = Connection::in_memory();
        let model = conn.model("Org", TenantRegistry::default_schema()).unwrap();
        let exempt = ExemptModels::new();
        let registry = TenantRegistry::new(
            TenantRegistryOptions::new()
                .with_connection(conn)
                .with_model(model)
                .with_model_name("Ignored"),
            &exempt,
        )
        .unwrap();
        assert_eq!(registry.model().name(), "Org");
        assert!(exempt.contains("Org"));
        assert!(!exempt.contains("Ignored"));
    }

    #[test]
    fn test_existing_model_reused() {
        let conn = Connection::in_memory();
        conn.model("Tenant", TenantRegistry::default_schema()).unwrap();
        let registry = TenantRegistry::new(
            TenantRegistryOptions::new().with_connection(conn),
            &ExemptModels::new(),
        )
        .unwrap();
        assert_eq!(registry.model().name(), "Tenant");
    }

    #[test]
    fn test_tenant_extra_fields_flatten() {
        let tenant = Tenant::new("t1", "Acme").with_field("plan", "gold");
        let value = serde_json::to_value(&tenant).unwrap();
        assert_eq!(value, json!({"id": "t1", "name": "Acme", "plan": "gold"}));
        assert_eq!(tenant.tenant_id().as_str(), "t1");
    }

    #[tokio::test]
    async fn test_add_returns_input_and_duplicate_fails() {
        let registry = TenantRegistry::new(
            TenantRegistryOptions::new().with_connection(Connection::in_memory()),
            &ExemptModels::new(),
        )
        .unwrap();
        let returned = registry.add(Tenant::new("t1", "Acme")).await.unwrap();
        assert_eq!(returned, Tenant::new("t1", "Acme"));
        assert!(registry.exists("t1").await.unwrap());

        let err = registry.add(Tenant::new("t1", "Other")).await.unwrap_err();
        assert!(err.is_duplicate_key());
    }
}
