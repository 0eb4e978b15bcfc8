//! Identity claims resolved from a decoded token.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{
        identity::errors::ClaimsError,
        tenants::{TenantId, resolution::TENANT_FIELD},
    },
    store::Fields,
};

/// Claim holding the member's role.
pub const ROLE_CLAIM: &str = "role";

/// Membership role inside an academy, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Student => 1,
            Self::Instructor => 2,
            Self::Admin => 3,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
        }
    }

    /// Whether this role is at least as privileged as `required`.
    #[must_use]
    pub const fn satisfies(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ClaimsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "instructor" => Ok(Self::Instructor),
            "admin" => Ok(Self::Admin),
            other => Err(ClaimsError::UnknownRole(other.to_string())),
        }
    }
}

/// A token as handed over by the external identity provider, already verified.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub uid: Option<String>,
    pub email: Option<String>,
    pub claims: Fields,
    pub auth_time: Timestamp,
}

/// The caller identity every access decision is made against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
    pub authenticated_at: Timestamp,

    /// Most recent activity; the session timeout is measured from here.
    pub last_activity: Timestamp,
}

impl IdentityClaims {
    /// Extract claims from a decoded token.
    ///
    /// A token without a tenant claim resolves to claims without a tenant;
    /// callers that need one decide whether that is an error.
    ///
    /// # Errors
    ///
    /// - [`ClaimsError::MissingUid`] when the token has no user id.
    /// - [`ClaimsError::NotPropagated`] when the role claim is absent.
    /// - [`ClaimsError::UnknownRole`] when the role is not recognised.
    /// - [`ClaimsError::InvalidTenant`] when the tenant claim is malformed.
    pub fn resolve(token: &DecodedToken) -> Result<Self, ClaimsError> {
        let user_id = token
            .uid
            .as_deref()
            .filter(|uid| !uid.is_empty())
            .ok_or(ClaimsError::MissingUid)?
            .to_string();

        let role = match token.claims.get(ROLE_CLAIM) {
            None | Some(Value::Null) => {
                return Err(ClaimsError::NotPropagated { claim: ROLE_CLAIM });
            }
            Some(Value::String(role)) => role.parse()?,
            Some(other) => return Err(ClaimsError::UnknownRole(other.to_string())),
        };

        let tenant_id = match token.claims.get(TENANT_FIELD).and_then(Value::as_str) {
            Some(tenant) => Some(TenantId::parse(tenant).map_err(ClaimsError::InvalidTenant)?),
            None => None,
        };

        Ok(Self {
            user_id,
            email: token.email.clone(),
            role,
            tenant_id,
            authenticated_at: token.auth_time,
            last_activity: token.auth_time,
        })
    }
}

/// Supplier of decoded tokens for the signed-in user.
#[automock]
#[async_trait]
pub trait ClaimsSource: Send + Sync {
    /// Fetch the current token, bypassing any cache when `force_refresh` is set.
    async fn fetch(&self, force_refresh: bool) -> Result<DecodedToken, ClaimsError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use crate::test::helpers::fields;

    use super::*;

    fn token(claims: Value) -> DecodedToken {
        DecodedToken {
            uid: Some("user-1".to_string()),
            email: Some("coach@example.com".to_string()),
            claims: fields(claims),
            auth_time: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn roles_are_ranked() {
        assert!(Role::Admin.satisfies(Role::Instructor));
        assert!(Role::Instructor.satisfies(Role::Instructor));
        assert!(!Role::Student.satisfies(Role::Instructor));
    }

    #[test]
    fn resolves_full_claims() -> TestResult {
        let claims = IdentityClaims::resolve(&token(
            json!({ "role": "instructor", "tenantId": "academy_0001" }),
        ))?;

        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.role, Role::Instructor);
        assert_eq!(
            claims.tenant_id.as_ref().map(TenantId::as_str),
            Some("academy_0001")
        );

        Ok(())
    }

    #[test]
    fn missing_tenant_claim_is_not_an_error() -> TestResult {
        let claims = IdentityClaims::resolve(&token(json!({ "role": "student" })))?;

        assert_eq!(claims.tenant_id, None);

        Ok(())
    }

    #[test]
    fn missing_role_is_not_propagated_yet() {
        let result = IdentityClaims::resolve(&token(json!({ "tenantId": "academy_0001" })));

        assert!(
            matches!(result, Err(ClaimsError::NotPropagated { claim: "role" })),
            "expected NotPropagated, got {result:?}"
        );
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result = IdentityClaims::resolve(&token(json!({ "role": "owner" })));

        assert!(
            matches!(result, Err(ClaimsError::UnknownRole(ref role)) if role == "owner"),
            "expected UnknownRole, got {result:?}"
        );
    }

    #[test]
    fn malformed_tenant_claim_is_rejected() {
        let result = IdentityClaims::resolve(&token(json!({ "role": "admin", "tenantId": "x" })));

        assert!(
            matches!(result, Err(ClaimsError::InvalidTenant(_))),
            "expected InvalidTenant, got {result:?}"
        );
    }

    #[test]
    fn missing_uid_is_rejected() {
        let mut token = token(json!({ "role": "admin" }));
        token.uid = None;

        let result = IdentityClaims::resolve(&token);

        assert!(
            matches!(result, Err(ClaimsError::MissingUid)),
            "expected MissingUid, got {result:?}"
        );
    }
}
