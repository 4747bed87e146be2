//! Document shapes.
//!
//! A [`Schema`] declares the fields a model's documents carry and holds the
//! hooks attached to it. Schemas are non-strict: undeclared fields are stored
//! as-is. Plugins ([`SchemaPlugin`]) extend a schema before it is compiled
//! into a model, typically by adding fields and hooks.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ValidationError;
use crate::hook::Hook;
use crate::types::Document;

/// The JSON type a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A string.
    String,
    /// Any JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// An embedded object.
    Object,
    /// An array.
    Array,
    /// Any non-null value.
    Any,
}

impl FieldKind {
    /// Returns `true` if `value` is of this kind.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Object => value.is_object(),
            FieldKind::Array => value.is_array(),
            FieldKind::Any => true,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Object => "object",
            FieldKind::Array => "array",
            FieldKind::Any => "any",
        };
        f.write_str(name)
    }
}

/// Predicate deciding required-ness from the concrete model name.
pub type RequirementFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Whether a field must be present on a document.
#[derive(Clone, Default)]
pub enum Requirement {
    /// The field may be absent.
    #[default]
    Optional,
    /// The field must be present and non-null.
    Required,
    /// Decided per document at validation time from the concrete model name.
    Dynamic(RequirementFn),
}

impl Requirement {
    /// Creates a dynamic requirement.
    pub fn dynamic<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Requirement::Dynamic(Arc::new(predicate))
    }

    /// Evaluates the requirement for a document of `model_name`.
    pub fn is_required(&self, model_name: &str) -> bool {
        match self {
            Requirement::Optional => false,
            Requirement::Required => true,
            Requirement::Dynamic(predicate) => predicate(model_name),
        }
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Optional => write!(f, "Optional"),
            Requirement::Required => write!(f, "Required"),
            Requirement::Dynamic(_) => write!(f, "Dynamic(..)"),
        }
    }
}

/// Declaration of one field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Value type.
    pub kind: FieldKind,
    /// Presence rule.
    pub requirement: Requirement,
    /// Whether the store should enforce uniqueness.
    pub unique: bool,
}

impl FieldDef {
    /// An optional field of the given kind.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            requirement: Requirement::Optional,
            unique: false,
        }
    }

    /// An optional string field.
    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    /// An optional number field.
    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }

    /// An optional boolean field.
    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    /// Marks the field required.
    pub fn required(mut self) -> Self {
        self.requirement = Requirement::Required;
        self
    }

    /// Sets the presence rule.
    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    /// Marks the field unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Extends a schema before it is compiled into a model.
pub trait SchemaPlugin: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Applies the plugin.
    ///
    /// `model_name` is the concrete model the schema is being compiled for,
    /// or `None` when the plugin is attached to a shape that has no model yet.
    fn apply(&self, schema: &mut Schema, model_name: Option<&str>);
}

/// A document shape with its attached hooks.
///
/// # Examples
///
/// ```
/// use helios_tenancy::schema::{FieldDef, Schema};
/// use serde_json::json;
///
/// let schema = Schema::new()
///     .field("title", FieldDef::string().required())
///     .field("pages", FieldDef::number());
///
/// let ok = json!({"title": "Dune", "pages": 412});
/// assert!(schema.validate("Book", ok.as_object().unwrap()).is_ok());
///
/// let missing = json!({"pages": 1});
/// assert!(schema.validate("Book", missing.as_object().unwrap()).is_err());
/// ```
#[derive(Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldDef)>,
    hooks: Vec<Arc<dyn Hook>>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field declaration (builder form).
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.add_field(name, def);
        self
    }

    /// Adds or replaces a field declaration.
    pub fn add_field(&mut self, name: impl Into<String>, def: FieldDef) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = def,
            None => self.fields.push((name, def)),
        }
    }

    /// Returns `true` if the schema declares `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Returns the declaration of `name`.
    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// Iterates over field declarations in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Names of fields declared unique.
    pub fn unique_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, d)| d.unique)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Attaches a hook. Hooks run in attachment order.
    pub fn add_hook(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.push(hook);
    }

    /// The attached hooks.
    pub fn hooks(&self) -> &[Arc<dyn Hook>] {
        &self.hooks
    }

    /// Applies a plugin to this schema.
    pub fn plugin(&mut self, plugin: &dyn SchemaPlugin, model_name: Option<&str>) -> &mut Self {
        tracing::trace!(plugin = plugin.name(), model = ?model_name, "applying schema plugin");
        plugin.apply(self, model_name);
        self
    }

    /// Validates a document for the concrete model `model_name`.
    ///
    /// Required fields must be present and non-null; present fields must match
    /// their declared kind. Undeclared fields are not checked.
    pub fn validate(&self, model_name: &str, doc: &Document) -> Result<(), ValidationError> {
        for (name, def) in &self.fields {
            match doc.get(name) {
                None | Some(Value::Null) => {
                    if def.requirement.is_required(model_name) {
                        return Err(ValidationError::MissingRequiredField {
                            model_name: model_name.to_string(),
                            field: name.clone(),
                        });
                    }
                }
                Some(value) if !def.kind.accepts(value) => {
                    return Err(ValidationError::TypeMismatch {
                        model_name: model_name.to_string(),
                        field: name.clone(),
                        expected: def.kind.to_string(),
                        found: json_type(value).to_string(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hook_names: Vec<&str> = self.hooks.iter().map(|h| h.name()).collect();
        f.debug_struct("Schema")
            .field("fields", &self.fields)
            .field("hooks", &hook_names)
            .finish()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
