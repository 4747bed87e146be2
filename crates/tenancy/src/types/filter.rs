//! Query filter documents.
//!
//! A [`Filter`] is a Mongo-style filter document. Keys are field paths (dotted
//! paths reach into embedded objects) or the logical operators `$and`, `$or`
//! and `$nor`. A field condition is either a literal, matched by equality, or
//! an operator object such as `{"$in": [..]}`.
//!
//! The evaluator here is used by the in-memory store; other backends translate
//! the same document for their driver.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Document;
use crate::error::QueryError;

/// A filter document.
///
/// # Examples
///
/// ```
/// use helios_tenancy::types::Filter;
/// use serde_json::json;
///
/// let filter = Filter::eq("status", "open").and_eq("tenantId", "acme");
/// assert!(filter.constrains("tenantId"));
///
/// let doc = json!({"status": "open", "tenantId": "acme"});
/// assert!(filter.matches(doc.as_object().unwrap()).unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(Document);

impl Filter {
    /// Creates an empty filter, which matches every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter with a single equality constraint.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and_eq(field, value)
    }

    /// Adds an equality constraint, replacing any existing one on `field`.
    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Builds a filter from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, QueryError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(QueryError::InvalidFilter {
                message: format!("filter must be an object, got {}", type_name(&other)),
            }),
        }
    }

    /// Returns `true` if the filter has a top-level condition on `field`.
    ///
    /// Only top-level keys count. A condition nested inside `$or` or `$and`
    /// does not.
    pub fn constrains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns the top-level condition on `field`, if any.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Sets the condition on `field`, returning the previous one.
    pub fn insert(&mut self, field: impl Into<String>, condition: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), condition.into())
    }

    /// Returns `true` if the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the underlying filter document.
    pub fn as_document(&self) -> &Document {
        &self.0
    }

    /// Consumes the filter and returns the underlying document.
    pub fn into_document(self) -> Document {
        self.0
    }

    /// Evaluates the filter against a document.
    pub fn matches(&self, doc: &Document) -> Result<bool, QueryError> {
        matches_document(&self.0, doc)
    }
}

impl From<Document> for Filter {
    fn from(doc: Document) -> Self {
        Self(doc)
    }
}

impl TryFrom<Value> for Filter {
    type Error = QueryError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

fn matches_document(filter: &Document, doc: &Document) -> Result<bool, QueryError> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches_document(clause, doc)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => any_clause(key, condition, doc)?,
            "$nor" => !any_clause(key, condition, doc)?,
            op if op.starts_with('$') => {
                return Err(QueryError::UnsupportedOperator {
                    operator: op.to_string(),
                });
            }
            path => matches_condition(lookup(doc, path), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_clause(op: &str, condition: &Value, doc: &Document) -> Result<bool, QueryError> {
    for clause in clauses(op, condition)? {
        if matches_document(clause, doc)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn clauses<'a>(op: &str, condition: &'a Value) -> Result<Vec<&'a Document>, QueryError> {
    let items = condition.as_array().ok_or_else(|| QueryError::InvalidFilter {
        message: format!("{op} expects an array of filters"),
    })?;
    items
        .iter()
        .map(|item| {
            item.as_object().ok_or_else(|| QueryError::InvalidFilter {
                message: format!("{op} entries must be objects"),
            })
        })
        .collect()
}

/// Resolves a dotted field path inside a document.
pub(crate) fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn is_operator_object(condition: &Value) -> Option<&Document> {
    let map = condition.as_object()?;
    if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) {
        Some(map)
    } else {
        None
    }
}

fn matches_condition(actual: Option<&Value>, condition: &Value) -> Result<bool, QueryError> {
    let Some(operators) = is_operator_object(condition) else {
        return Ok(equals(actual, condition));
    };

    for (op, operand) in operators {
        let matched = match op.as_str() {
            "$eq" => equals(actual, operand),
            "$ne" => !equals(actual, operand),
            "$in" => in_list(op, actual, operand)?,
            "$nin" => !in_list(op, actual, operand)?,
            "$exists" => {
                let expected = operand.as_bool().ok_or_else(|| QueryError::InvalidFilter {
                    message: "$exists expects a boolean".to_string(),
                })?;
                actual.is_some() == expected
            }
            "$gt" => ordered(actual, operand, |o| o == Ordering::Greater),
            "$gte" => ordered(actual, operand, |o| o != Ordering::Less),
            "$lt" => ordered(actual, operand, |o| o == Ordering::Less),
            "$lte" => ordered(actual, operand, |o| o != Ordering::Greater),
            other => {
                return Err(QueryError::UnsupportedOperator {
                    operator: other.to_string(),
                });
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

// A missing field equals null; an array field matches if any element is equal.
fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(value) if value == expected => true,
        Some(Value::Array(items)) => items.iter().any(|item| item == expected),
        Some(_) => false,
    }
}

fn in_list(op: &str, actual: Option<&Value>, operand: &Value) -> Result<bool, QueryError> {
    let candidates = operand.as_array().ok_or_else(|| QueryError::InvalidFilter {
        message: format!("{op} expects an array"),
    })?;
    Ok(candidates.iter().any(|candidate| equals(actual, candidate)))
}

fn ordered(actual: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    let ordering = match (actual, operand) {
        (Value::Number(a), Value::Number(b)) => {
            a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b))
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };
    ordering.is_some_and(accept)
}

/// Total order used for sorting, following BSON comparison order for the
/// JSON types: missing/null, numbers, strings, objects, arrays, booleans.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Object(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Bool(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .zip(y.as_f64())
            .and_then(|(x, y)| x.partial_cmp(&y))
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn filter(value: Value) -> Filter {
        Filter::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::new().matches(&doc(json!({"a": 1}))).unwrap());
    }

    #[test]
    fn test_equality_and_missing_fields() {
        let d = doc(json!({"name": "x", "tags": ["a", "b"], "nested": {"k": 2}}));
        assert!(filter(json!({"name": "x"})).matches(&d).unwrap());
        assert!(!filter(json!({"name": "y"})).matches(&d).unwrap());
        assert!(filter(json!({"tags": "b"})).matches(&d).unwrap());
        assert!(filter(json!({"nested.k": 2})).matches(&d).unwrap());
        assert!(filter(json!({"absent": null})).matches(&d).unwrap());
        assert!(!filter(json!({"absent": "v"})).matches(&d).unwrap());
    }

    #[test]
    fn test_comparison_operators() {
        let d = doc(json!({"n": 5, "s": "m"}));
        assert!(filter(json!({"n": {"$gt": 4, "$lte": 5}})).matches(&d).unwrap());
        assert!(!filter(json!({"n": {"$lt": 5}})).matches(&d).unwrap());
        assert!(filter(json!({"s": {"$gte": "a"}})).matches(&d).unwrap());
        assert!(!filter(json!({"s": {"$gt": 1}})).matches(&d).unwrap());
        assert!(!filter(json!({"missing": {"$gt": 1}})).matches(&d).unwrap());
    }

    #[test]
    fn test_set_and_existence_operators() {
        let d = doc(json!({"tenantId": "t1", "deleted": null}));
        assert!(filter(json!({"tenantId": {"$in": ["t1", "t2"]}})).matches(&d).unwrap());
        assert!(!filter(json!({"tenantId": {"$nin": ["t1"]}})).matches(&d).unwrap());
        assert!(filter(json!({"tenantId": {"$ne": "t2"}})).matches(&d).unwrap());
        assert!(filter(json!({"deleted": {"$exists": true}})).matches(&d).unwrap());
        assert!(filter(json!({"other": {"$exists": false}})).matches(&d).unwrap());
    }

    #[test]
    fn test_logical_operators() {
        let d = doc(json!({"a": 1, "b": 2}));
        assert!(filter(json!({"$or": [{"a": 9}, {"b": 2}]})).matches(&d).unwrap());
        assert!(!filter(json!({"$and": [{"a": 1}, {"b": 3}]})).matches(&d).unwrap());
        assert!(filter(json!({"$nor": [{"a": 9}]})).matches(&d).unwrap());
    }

    #[test]
    fn test_invalid_filters() {
        let d = doc(json!({"a": 1}));
        assert!(matches!(
            filter(json!({"a": {"$regex": "x"}})).matches(&d),
            Err(QueryError::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            filter(json!({"$or": {"a": 1}})).matches(&d),
            Err(QueryError::InvalidFilter { .. })
        ));
        assert!(Filter::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_constrains_is_top_level_only() {
        let f = filter(json!({"$or": [{"tenantId": "a"}], "status": "x"}));
        assert!(!f.constrains("tenantId"));
        assert!(f.constrains("status"));
        assert!(filter(json!({"tenantId": null})).constrains("tenantId"));
    }

    #[test]
    fn test_compare_values_order() {
        assert_eq!(
            compare_values(Some(&json!(1)), Some(&json!(2))),
            Ordering::Less
        );
        assert_eq!(compare_values(None, Some(&json!("a"))), Ordering::Less);
        assert_eq!(
            compare_values(Some(&json!("b")), Some(&json!("a"))),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(Some(&json!(true)), Some(&json!("a"))),
            Ordering::Greater
        );
    }
}
