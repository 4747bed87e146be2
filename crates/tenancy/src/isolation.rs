//! Tenant isolation plugin.
//!
//! [`TenantIsolation`] is a [`SchemaPlugin`] that makes a model tenant-scoped:
//!
//! 1. It declares the tenant field (`tenantId` by default) as a string, unless
//!    the schema already declares it.
//! 2. Reads and counts get an equality constraint on the tenant field for the
//!    ambient tenant, unless the caller's filter already constrains the field.
//! 3. Validation and writes stamp the ambient tenant onto documents that do
//!    not carry one yet.
//!
//! Models in the [`ExemptModels`] set are left alone. The exemption check runs
//! against the concrete model name at every operation.
//!
//! When no tenant is ambient, reads and counts run unfiltered and return data
//! across all tenants. Writes to tenant-scoped models fail validation instead,
//! because the tenant field stays unset.
//!
//! # Example
//!
//! ```
//! use helios_tenancy::connection::Connection;
//! use helios_tenancy::exemption::ExemptModels;
//! use helios_tenancy::isolation::{IsolationConfig, TenantIsolation};
//! use helios_tenancy::schema::{FieldDef, Schema};
//! use helios_tenancy::tenant::with_tenant;
//! use helios_tenancy::types::{Filter, FindOptions};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let exempt = ExemptModels::new();
//! let isolation = TenantIsolation::new(IsolationConfig::default(), &exempt).unwrap();
//!
//! let conn = Connection::in_memory();
//! conn.plugin(Arc::new(isolation));
//! let orders = conn
//!     .model("Order", Schema::new().field("sku", FieldDef::string()))
//!     .unwrap();
//!
//! with_tenant("acme", orders.create(json!({"sku": "A-1"}))).await.unwrap();
//!
//! let mine = with_tenant("acme", orders.find(Filter::new(), FindOptions::new())).await.unwrap();
//! let theirs = with_tenant("globex", orders.find(Filter::new(), FindOptions::new())).await.unwrap();
//! assert_eq!(mine.len(), 1);
//! assert_eq!(mine[0]["tenantId"], "acme");
//! assert!(theirs.is_empty());
//! # });
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, TenancyResult};
use crate::exemption::ExemptModels;
use crate::hook::{DocumentContext, Hook, OperationKind, QueryContext};
use crate::schema::{FieldDef, Requirement, Schema, SchemaPlugin};
use crate::tenant::{TaskLocalTenantContext, TenantContextProvider, TenantId};
use crate::types::{Filter, Projection};

/// Default name of the tenant field.
pub const DEFAULT_TENANT_FIELD: &str = "tenantId";

/// Configuration for [`TenantIsolation`].
///
/// # Example
///
/// ```
/// use helios_tenancy::isolation::IsolationConfig;
///
/// let config = IsolationConfig::new()
///     .with_exempt_models(["Country", "Currency"])
///     .with_hide_tenant_id(true);
///
/// assert!(config.validate().is_empty());
/// assert_eq!(config.tenant_field, "tenantId");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationConfig {
    /// Additional model names to exempt from isolation.
    #[serde(default, alias = "exemptModels")]
    pub exempt_models: Vec<String>,

    /// Whether to leave the tenant field out of read results.
    #[serde(default, alias = "hideTenantId")]
    pub hide_tenant_id: bool,

    /// Whether to log every interception at debug level.
    #[serde(default)]
    pub debug: bool,

    /// Name of the tenant field on documents.
    #[serde(default = "default_tenant_field", alias = "tenantField")]
    pub tenant_field: String,
}

fn default_tenant_field() -> String {
    DEFAULT_TENANT_FIELD.to_string()
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            exempt_models: Vec::new(),
            hide_tenant_id: false,
            debug: false,
            tenant_field: default_tenant_field(),
        }
    }
}

impl IsolationConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds model names to exempt.
    pub fn with_exempt_models<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exempt_models.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets whether the tenant field is hidden from read results.
    pub fn with_hide_tenant_id(mut self, hide: bool) -> Self {
        self.hide_tenant_id = hide;
        self
    }

    /// Sets whether interceptions are logged.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the tenant field name.
    pub fn with_tenant_field(mut self, field: impl Into<String>) -> Self {
        self.tenant_field = field.into();
        self
    }

    /// Validates the configuration and returns any problems found.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.tenant_field.is_empty() {
            problems.push("tenant_field cannot be empty".to_string());
        } else if self.tenant_field.starts_with('$') {
            problems.push(format!(
                "tenant_field '{}' cannot start with '$'",
                self.tenant_field
            ));
        }

        if self.exempt_models.iter().any(String::is_empty) {
            problems.push("exempt_models cannot contain an empty name".to_string());
        }

        problems
    }
}

/// The tenant isolation plugin.
///
/// Clones share configuration, exemptions and the context provider, so one
/// instance can be applied to any number of schemas or registered globally on
/// a [`Connection`](crate::connection::Connection).
#[derive(Clone)]
pub struct TenantIsolation {
    hook: Arc<IsolationHook>,
}

impl fmt::Debug for TenantIsolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantIsolation")
            .field("config", &self.hook.config)
            .field("exemptions", &self.hook.exemptions)
            .finish()
    }
}

impl TenantIsolation {
    /// Creates the plugin, reading the ambient tenant from the task-local
    /// context.
    ///
    /// `config.exempt_models` are added to `exemptions`; the plugin keeps a
    /// handle to the same set.
    ///
    /// # Errors
    ///
    /// * `ConfigError::Invalid` - If the configuration fails validation
    pub fn new(config: IsolationConfig, exemptions: &ExemptModels) -> TenancyResult<Self> {
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(ConfigError::Invalid { problems }.into());
        }

        exemptions.extend(config.exempt_models.iter().cloned());

        Ok(Self {
            hook: Arc::new(IsolationHook {
                config,
                exemptions: exemptions.clone(),
                context: Arc::new(TaskLocalTenantContext),
            }),
        })
    }

    /// Replaces the source of the ambient tenant.
    pub fn with_context(self, context: Arc<dyn TenantContextProvider>) -> Self {
        Self {
            hook: Arc::new(IsolationHook {
                config: self.hook.config.clone(),
                exemptions: self.hook.exemptions.clone(),
                context,
            }),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IsolationConfig {
        &self.hook.config
    }

    /// Returns the exemption set this plugin consults.
    pub fn exemptions(&self) -> &ExemptModels {
        &self.hook.exemptions
    }

    /// Returns the hook attached to schemas.
    pub fn hook(&self) -> Arc<IsolationHook> {
        Arc::clone(&self.hook)
    }

    /// Applies the read filter rule to `filter` for `model_name`.
    ///
    /// For callers that query the store directly instead of through a model.
    pub fn tenant_filter(&self, model_name: &str, mut filter: Filter) -> Filter {
        self.hook.restrict(model_name, OperationKind::Read, &mut filter);
        filter
    }
}

impl SchemaPlugin for TenantIsolation {
    fn name(&self) -> &str {
        "tenant-isolation"
    }

    fn apply(&self, schema: &mut Schema, model_name: Option<&str>) {
        let field = self.hook.config.tenant_field.as_str();

        if !schema.has_field(field) {
            let requirement = match model_name {
                Some(name) if self.hook.exemptions.contains(name) => Requirement::Optional,
                _ => {
                    let exemptions = self.hook.exemptions.clone();
                    Requirement::dynamic(move |model| !exemptions.contains(model))
                }
            };
            schema.add_field(field, FieldDef::string().with_requirement(requirement));
        }

        schema.add_hook(self.hook());
    }
}

/// The hook [`TenantIsolation`] attaches to schemas.
pub struct IsolationHook {
    config: IsolationConfig,
    exemptions: ExemptModels,
    context: Arc<dyn TenantContextProvider>,
}

impl IsolationHook {
    /// Returns the ambient tenant for an operation on `model_name`, or `None`
    /// if the model is exempt or no tenant is ambient.
    fn scoped_tenant(&self, model_name: &str, operation: OperationKind) -> Option<TenantId> {
        if self.exemptions.contains(model_name) {
            if self.config.debug {
                tracing::debug!(model = %model_name, %operation, "model exempt, skipping tenant isolation");
            }
            return None;
        }

        let tenant = self.context.tenant_id();
        if tenant.is_none() && self.config.debug {
            tracing::debug!(model = %model_name, %operation, "no ambient tenant");
        }
        tenant
    }

    fn restrict(&self, model_name: &str, operation: OperationKind, filter: &mut Filter) {
        let Some(tenant) = self.scoped_tenant(model_name, operation) else {
            return;
        };
        let field = self.config.tenant_field.as_str();

        if filter.constrains(field) {
            if self.config.debug {
                tracing::debug!(model = %model_name, %operation, tenant_id = %tenant, "filter already constrains tenant field");
            }
            return;
        }

        if self.config.debug {
            tracing::debug!(model = %model_name, %operation, tenant_id = %tenant, "tenant filter injected");
        }
        filter.insert(field, tenant);
    }

    fn stamp(&self, doc: &mut DocumentContext) {
        let Some(tenant) = self.scoped_tenant(&doc.model_name, doc.operation) else {
            return;
        };
        let field = self.config.tenant_field.as_str();

        match doc.document.get(field) {
            None | Some(Value::Null) => {
                if self.config.debug {
                    tracing::debug!(model = %doc.model_name, operation = %doc.operation, tenant_id = %tenant, "document stamped with tenant");
                }
                doc.document.insert(field.to_string(), Value::from(tenant));
            }
            Some(_) => {}
        }
    }
}

impl fmt::Debug for IsolationHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsolationHook")
            .field("config", &self.config)
            .field("exemptions", &self.exemptions)
            .finish_non_exhaustive()
    }
}

impl Hook for IsolationHook {
    fn name(&self) -> &str {
        "tenant-isolation"
    }

    fn before_read(&self, query: &mut QueryContext) -> TenancyResult<()> {
        self.restrict(&query.model_name, OperationKind::Read, &mut query.filter);

        if self.config.hide_tenant_id && !self.exemptions.contains(&query.model_name) {
            let projection = query.options.projection.take();
            query.options.projection = Some(Projection::hide(projection, &self.config.tenant_field));
        }
        Ok(())
    }

    fn before_count(&self, query: &mut QueryContext) -> TenancyResult<()> {
        self.restrict(&query.model_name, OperationKind::Count, &mut query.filter);
        Ok(())
    }

    fn before_validate(&self, doc: &mut DocumentContext) -> TenancyResult<()> {
        self.stamp(doc);
        Ok(())
    }

    fn before_write(&self, doc: &mut DocumentContext) -> TenancyResult<()> {
        self.stamp(doc);
        Ok(())
    }
}
