//! Read options: projection, sort order, skip and limit.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Document;
use crate::error::QueryError;

/// Field projection applied to read results.
///
/// Projections work on top-level fields. An inclusion projection always keeps
/// the store's `_id` field, as document databases do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Return only the listed fields.
    Include(Vec<String>),
    /// Return every field except the listed ones.
    Exclude(Vec<String>),
}

impl Projection {
    /// Creates an inclusion projection.
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Include(fields.into_iter().map(Into::into).collect())
    }

    /// Creates an exclusion projection.
    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Exclude(fields.into_iter().map(Into::into).collect())
    }

    /// Parses a driver projection document such as `{"name": 1, "rank": 1}`
    /// or `{"tenantId": 0}`.
    ///
    /// Flags are `0`/`1` or booleans. Inclusion and exclusion cannot be mixed,
    /// and `_id` cannot be excluded from an inclusion projection.
    ///
    /// ```
    /// use helios_tenancy::types::Projection;
    /// use serde_json::json;
    ///
    /// let p = Projection::from_value(json!({"tenantId": 0})).unwrap();
    /// assert_eq!(p, Projection::exclude(["tenantId"]));
    /// assert!(Projection::from_value(json!({"a": 1, "b": 0})).is_err());
    /// ```
    pub fn from_value(value: Value) -> Result<Self, QueryError> {
        let Value::Object(map) = value else {
            return Err(invalid("projection must be an object"));
        };
        if map.is_empty() {
            return Err(invalid("projection cannot be empty"));
        }

        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for (field, flag) in map {
            let included = match flag {
                Value::Bool(b) => b,
                Value::Number(n) if n.as_i64() == Some(1) => true,
                Value::Number(n) if n.as_i64() == Some(0) => false,
                other => {
                    return Err(invalid(format!(
                        "projection flag for '{}' must be 0, 1 or a boolean, got {}",
                        field, other
                    )));
                }
            };
            if included {
                include.push(field);
            } else {
                exclude.push(field);
            }
        }

        match (include.is_empty(), exclude.is_empty()) {
            (true, _) => Ok(Projection::Exclude(exclude)),
            (false, true) => Ok(Projection::Include(include)),
            (false, false) => Err(invalid(format!(
                "cannot mix inclusion and exclusion (excluded: {})",
                exclude.join(", ")
            ))),
        }
    }

    /// Merges "never return `field`" into an optional existing projection.
    ///
    /// Inclusion and exclusion cannot be mixed, so an inclusion projection
    /// loses `field` from its list instead of gaining an exclusion.
    ///
    /// ```
    /// use helios_tenancy::types::Projection;
    ///
    /// let p = Projection::hide(Some(Projection::include(["name", "tenantId"])), "tenantId");
    /// assert_eq!(p, Projection::include(["name"]));
    ///
    /// let p = Projection::hide(None, "tenantId");
    /// assert_eq!(p, Projection::exclude(["tenantId"]));
    /// ```
    pub fn hide(existing: Option<Projection>, field: &str) -> Projection {
        match existing {
            None => Projection::exclude([field]),
            Some(Projection::Exclude(mut fields)) => {
                if !fields.iter().any(|f| f == field) {
                    fields.push(field.to_string());
                }
                Projection::Exclude(fields)
            }
            Some(Projection::Include(mut fields)) => {
                fields.retain(|f| f != field);
                if fields.is_empty() {
                    fields.push("_id".to_string());
                }
                Projection::Include(fields)
            }
        }
    }

    /// Returns `true` if `field` is removed from documents by this projection.
    pub fn excludes(&self, field: &str) -> bool {
        match self {
            Projection::Include(fields) => field != "_id" && !fields.iter().any(|f| f == field),
            Projection::Exclude(fields) => fields.iter().any(|f| f == field),
        }
    }

    /// Applies the projection to a document.
    pub fn apply(&self, mut doc: Document) -> Document {
        match self {
            Projection::Include(_) => {
                doc.retain(|key, _| !self.excludes(key));
                doc
            }
            Projection::Exclude(fields) => {
                for field in fields {
                    doc.remove(field);
                }
                doc
            }
        }
    }

    /// Renders the projection as a driver projection document (`{field: 0|1}`).
    pub fn to_document(&self) -> Document {
        let (fields, flag) = match self {
            Projection::Include(fields) => (fields, 1),
            Projection::Exclude(fields) => (fields, 0),
        };
        fields
            .iter()
            .map(|f| (f.clone(), Value::from(flag)))
            .collect()
    }
}

impl TryFrom<Value> for Projection {
    type Error = QueryError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Projection::from_value(value)
    }
}

fn invalid(message: impl Into<String>) -> QueryError {
    QueryError::InvalidProjection {
        message: message.into(),
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// Returns the driver representation (`1` or `-1`).
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Field path to sort by.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

/// Options for read operations.
///
/// # Examples
///
/// ```
/// use helios_tenancy::types::{FindOptions, SortDirection};
///
/// let opts = FindOptions::new()
///     .sort_by("createdAt", SortDirection::Descending)
///     .with_limit(10);
/// assert_eq!(opts.limit, Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindOptions {
    /// Sort keys, applied in order.
    #[serde(default)]
    pub sort: Vec<SortKey>,

    /// Number of matching documents to skip.
    #[serde(default)]
    pub skip: Option<u64>,

    /// Maximum number of documents to return.
    #[serde(default)]
    pub limit: Option<u64>,

    /// Fields to include or exclude.
    #[serde(default)]
    pub projection: Option<Projection>,
}

impl FindOptions {
    /// Creates default options (no sort, skip, limit or projection).
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sort key.
    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    /// Sets the number of documents to skip.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the projection.
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_hide_merges_into_exclusion() {
        let p = Projection::hide(Some(Projection::exclude(["secret"])), "tenantId");
        assert_eq!(p, Projection::exclude(["secret", "tenantId"]));

        let again = Projection::hide(Some(p.clone()), "tenantId");
        assert_eq!(again, p);
    }

    #[test]
    fn test_hide_only_included_field_keeps_id() {
        let p = Projection::hide(Some(Projection::include(["tenantId"])), "tenantId");
        assert_eq!(p, Projection::include(["_id"]));
        assert!(p.excludes("tenantId"));
    }

    #[test]
    fn test_apply_include_keeps_id() {
        let d = doc(json!({"_id": "1", "name": "a", "tenantId": "t"}));
        let out = Projection::include(["name"]).apply(d);
        assert_eq!(Value::Object(out), json!({"_id": "1", "name": "a"}));
    }

    #[test]
    fn test_apply_exclude() {
        let d = doc(json!({"_id": "1", "name": "a", "tenantId": "t"}));
        let out = Projection::exclude(["tenantId", "_id"]).apply(d);
        assert_eq!(Value::Object(out), json!({"name": "a"}));
    }

    #[test]
    fn test_from_value() {
        assert_eq!(
            Projection::from_value(json!({"name": 1, "rank": true})).unwrap(),
            Projection::include(["name", "rank"])
        );
        let p = Projection::try_from(json!({"tenantId": false, "_id": 0})).unwrap();
        assert!(matches!(p, Projection::Exclude(ref fields) if fields.len() == 2));
        assert!(p.excludes("tenantId") && p.excludes("_id"));
    }

    #[test]
    fn test_from_value_rejects_malformed() {
        for bad in [
            json!(["name"]),
            json!({}),
            json!({"name": 1, "_id": 0}),
            json!({"name": 2}),
            json!({"name": "yes"}),
        ] {
            let err = Projection::from_value(bad).unwrap_err();
            assert!(matches!(err, QueryError::InvalidProjection { .. }));
        }
    }

    #[test]
    fn test_to_document() {
        assert_eq!(
            Value::Object(Projection::exclude(["tenantId"]).to_document()),
            json!({"tenantId": 0})
        );
        assert_eq!(SortDirection::Descending.as_i32(), -1);
    }
}
