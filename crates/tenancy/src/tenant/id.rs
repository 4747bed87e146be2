//! Tenant identifier type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque tenant identifier.
///
/// `TenantId` is the value stamped into the tenant-identifier field of
/// tenant-scoped documents and the value the ambient context carries.
///
/// # Examples
///
/// ```
/// use helios_tenancy::tenant::TenantId;
///
/// let tenant = TenantId::new("acme");
/// assert_eq!(tenant.as_str(), "acme");
/// assert_eq!(tenant.to_string(), "acme");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a new tenant ID from the given string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the tenant ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ID and returns the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({})", self.0)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<TenantId> for serde_json::Value {
    fn from(id: TenantId) -> Self {
        serde_json::Value::String(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_debug() {
        let id = TenantId::new("tenant1");
        assert_eq!(format!("{}", id), "tenant1");
        assert_eq!(format!("{:?}", id), "TenantId(tenant1)");
    }

    #[test]
    fn test_conversions() {
        let from_str: TenantId = "a".into();
        let from_string: TenantId = String::from("a").into();
        let parsed: TenantId = "a".parse().unwrap();
        assert_eq!(from_str, from_string);
        assert_eq!(from_str, parsed);
        assert_eq!(serde_json::Value::from(parsed), serde_json::json!("a"));
    }

    #[test]
    fn test_serde_transparent() {
        let id = TenantId::new("acme");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"acme\"");
        let back: TenantId = serde_json::from_str("\"acme\"").unwrap();
        assert_eq!(back, id);
    }
}
