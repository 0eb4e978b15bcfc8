//! Test Helpers

use jiff::Timestamp;
use serde_json::Value;

use crate::{
    domain::{
        identity::{IdentityClaims, Role},
        tenants::TenantId,
    },
    store::Fields,
};

/// Unwrap a JSON object literal into document fields.
pub(crate) fn fields(value: Value) -> Fields {
    match value {
        Value::Object(fields) => fields,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub(crate) fn tenant(value: &str) -> TenantId {
    TenantId::parse(value).expect("test tenant id should be valid")
}

/// Claims authenticated at the Unix epoch.
pub(crate) fn claims(user_id: &str, role: Role, tenant_id: Option<&str>) -> IdentityClaims {
    IdentityClaims {
        user_id: user_id.to_string(),
        email: None,
        role,
        tenant_id: tenant_id.map(tenant),
        authenticated_at: Timestamp::UNIX_EPOCH,
        last_activity: Timestamp::UNIX_EPOCH,
    }
}

/// Claims authenticated just now, for paths that validate against the clock.
pub(crate) fn fresh_claims(user_id: &str, role: Role, tenant_id: Option<&str>) -> IdentityClaims {
    IdentityClaims {
        authenticated_at: Timestamp::now(),
        last_activity: Timestamp::now(),
        ..claims(user_id, role, tenant_id)
    }
}
