//! Tenant resolution for documents that predate tenant-scoped storage.

use serde_json::Value;

use crate::store::Fields;

/// Canonical, denormalized tenant field stamped on every tenant-scoped record.
pub const TENANT_FIELD: &str = "tenantId";

/// Field names older documents used for the owning academy.
pub const LEGACY_TENANT_ALIASES: [&str; 2] = ["academiaId", "gymId"];

/// Outcome of looking for a tenant id on a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantResolution {
    /// No tenant field carries a value.
    Missing,

    /// Every populated tenant field agrees on this value.
    Resolved(String),

    /// Populated tenant fields disagree.
    Conflicting(Vec<String>),
}

/// Resolve the owning tenant from the canonical field and the legacy aliases.
///
/// Divergent values are reported as [`TenantResolution::Conflicting`] rather than
/// letting one alias silently win.
#[must_use]
pub fn resolve_tenant(fields: &Fields) -> TenantResolution {
    let mut values: Vec<String> = Vec::new();

    for name in std::iter::once(TENANT_FIELD).chain(LEGACY_TENANT_ALIASES) {
        let Some(value) = fields.get(name).and_then(tenant_value) else {
            continue;
        };

        if !values.iter().any(|seen| *seen == value) {
            values.push(value);
        }
    }

    match values.len() {
        0 => TenantResolution::Missing,
        1 => values
            .pop()
            .map_or(TenantResolution::Missing, TenantResolution::Resolved),
        _ => TenantResolution::Conflicting(values),
    }
}

fn tenant_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
