//! Schemas and documents used across tests.

#![allow(dead_code)]

use helios_tenancy::schema::{FieldDef, Schema};
use serde_json::{Value, json};

/// Tenant used by most tests.
pub const TENANT_1: &str = "tenant1";

/// A second tenant.
pub const TENANT_2: &str = "tenant2";

/// `{title: string required, rank: number}`.
pub fn item_schema() -> Schema {
    Schema::new()
        .field("title", FieldDef::string().required())
        .field("rank", FieldDef::number())
}

/// An item document.
pub fn item(title: &str, rank: i64) -> Value {
    json!({ "title": title, "rank": rank })
}

/// An item document already tagged with a tenant.
pub fn tagged_item(title: &str, rank: i64, tenant: &str) -> Value {
    json!({ "title": title, "rank": rank, "tenantId": tenant })
}

/// Extracts `field` from each document as a string.
pub fn strings(docs: &[helios_tenancy::types::Document], field: &str) -> Vec<String> {
    docs.iter()
        .filter_map(|d| d.get(field).and_then(Value::as_str).map(String::from))
        .collect()
}
