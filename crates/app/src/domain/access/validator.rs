//! Tenant access validation.
//!
//! Checks run in a fixed order: tenant id syntax, authentication and idle
//! time, tenant match, then role rank. The validator never touches storage and
//! never audits; callers record denied attempts.

use jiff::{SignedDuration, Timestamp};

use crate::domain::{
    access::errors::{AccessError, UnauthenticatedReason},
    identity::{IdentityClaims, Role},
    tenants::TenantId,
};

pub const DEFAULT_SESSION_TIMEOUT: SignedDuration = SignedDuration::from_mins(60);

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub tenant: Option<TenantId>,
    pub user_id: String,
    pub role: Role,

    /// Set when access crossed tenants under the super-admin bypass.
    pub bypassed: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TenantValidator {
    session_timeout: SignedDuration,
}

impl Default for TenantValidator {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TIMEOUT)
    }
}

impl TenantValidator {
    #[must_use]
    pub const fn new(session_timeout: SignedDuration) -> Self {
        Self { session_timeout }
    }

    #[must_use]
    pub const fn session_timeout(&self) -> SignedDuration {
        self.session_timeout
    }

    /// Validate access to `requested_tenant` as of now.
    ///
    /// # Errors
    ///
    /// Returns the first failed check as an [`AccessError`].
    pub fn validate_access(
        &self,
        requested_tenant: &str,
        claims: Option<&IdentityClaims>,
        required_roles: &[Role],
        super_admin_bypass: bool,
    ) -> Result<AccessGrant, AccessError> {
        self.validate_access_at(
            Timestamp::now(),
            requested_tenant,
            claims,
            required_roles,
            super_admin_bypass,
        )
    }

    /// Validate access to `requested_tenant` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns the first failed check as an [`AccessError`].
    pub fn validate_access_at(
        &self,
        now: Timestamp,
        requested_tenant: &str,
        claims: Option<&IdentityClaims>,
        required_roles: &[Role],
        super_admin_bypass: bool,
    ) -> Result<AccessGrant, AccessError> {
        let requested = TenantId::parse(requested_tenant).map_err(AccessError::InvalidTenantId)?;

        let claims = self.authenticated(now, claims)?;

        let matches = claims.tenant_id.as_ref() == Some(&requested);

        if !matches && !super_admin_bypass {
            return Err(AccessError::AccessDenied {
                requested: requested.into_string(),
                actual: claims.tenant_id.as_ref().map(|tenant| tenant.to_string()),
            });
        }

        check_role(claims.role, required_roles)?;

        Ok(AccessGrant {
            tenant: Some(requested),
            user_id: claims.user_id.clone(),
            role: claims.role,
            bypassed: !matches,
        })
    }

    /// Validate an operation that is not scoped to a tenant, as of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthenticated`] or [`AccessError::InsufficientRole`].
    pub fn validate_identity_at(
        &self,
        now: Timestamp,
        claims: Option<&IdentityClaims>,
        required_roles: &[Role],
    ) -> Result<AccessGrant, AccessError> {
        let claims = self.authenticated(now, claims)?;

        check_role(claims.role, required_roles)?;

        Ok(AccessGrant {
            tenant: None,
            user_id: claims.user_id.clone(),
            role: claims.role,
            bypassed: false,
        })
    }

    /// Validate an operation that is not scoped to a tenant, as of now.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthenticated`] or [`AccessError::InsufficientRole`].
    pub fn validate_identity(
        &self,
        claims: Option<&IdentityClaims>,
        required_roles: &[Role],
    ) -> Result<AccessGrant, AccessError> {
        self.validate_identity_at(Timestamp::now(), claims, required_roles)
    }

    fn authenticated<'a>(
        &self,
        now: Timestamp,
        claims: Option<&'a IdentityClaims>,
    ) -> Result<&'a IdentityClaims, AccessError> {
        let claims = claims.ok_or(AccessError::Unauthenticated {
            reason: UnauthenticatedReason::MissingClaims,
        })?;

        if now.duration_since(claims.last_activity) > self.session_timeout {
            return Err(AccessError::Unauthenticated {
                reason: UnauthenticatedReason::SessionExpired,
            });
        }

        Ok(claims)
    }
}

fn check_role(actual: Role, required_roles: &[Role]) -> Result<(), AccessError> {
    match required_roles.iter().copied().max() {
        Some(required) if !actual.satisfies(required) => {
            Err(AccessError::InsufficientRole { actual, required })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::test::helpers::claims;

    use super::*;

    const T1: &str = "academy_0001";
    const T2: &str = "academy_0002";

    fn now() -> Timestamp {
        Timestamp::UNIX_EPOCH + SignedDuration::from_mins(10)
    }

    #[test]
    fn short_tenant_id_fails_first() {
        let validator = TenantValidator::default();

        let result = validator.validate_access_at(now(), "abc", None, &[Role::Admin], false);

        assert!(
            matches!(result, Err(AccessError::InvalidTenantId(_))),
            "expected InvalidTenantId, got {result:?}"
        );
    }

    #[test]
    fn missing_claims_are_unauthenticated() {
        let result = TenantValidator::default().validate_access_at(now(), T1, None, &[], false);

        assert_eq!(
            result,
            Err(AccessError::Unauthenticated {
                reason: UnauthenticatedReason::MissingClaims
            })
        );
    }

    #[test]
    fn stale_claims_are_unauthenticated() {
        let claims = claims("user-1", Role::Admin, Some(T1));
        let late = claims.last_activity + SignedDuration::from_mins(61);

        let result = TenantValidator::default().validate_access_at(late, T1, Some(&claims), &[], false);

        assert_eq!(
            result,
            Err(AccessError::Unauthenticated {
                reason: UnauthenticatedReason::SessionExpired
            })
        );
    }

    #[test]
    fn other_tenant_is_denied_even_for_admins() {
        let claims = claims("user-1", Role::Admin, Some(T1));

        let result =
            TenantValidator::default().validate_access_at(now(), T2, Some(&claims), &[], false);

        assert!(
            matches!(result, Err(AccessError::AccessDenied { ref requested, .. }) if requested == T2),
            "expected AccessDenied, got {result:?}"
        );
    }

    #[test]
    fn claims_without_tenant_are_denied() {
        let claims = claims("user-1", Role::Student, None);

        let result =
            TenantValidator::default().validate_access_at(now(), T1, Some(&claims), &[], false);

        assert!(
            matches!(result, Err(AccessError::AccessDenied { actual: None, .. })),
            "expected AccessDenied, got {result:?}"
        );
    }

    #[test]
    fn super_admin_bypass_crosses_tenants() -> TestResult {
        let claims = claims("root", Role::Admin, Some(T1));

        let grant =
            TenantValidator::default().validate_access_at(now(), T2, Some(&claims), &[], true)?;

        assert!(grant.bypassed);
        assert_eq!(grant.tenant.as_ref().map(TenantId::as_str), Some(T2));

        Ok(())
    }

    #[test]
    fn student_cannot_perform_admin_operation() {
        let claims = claims("user-1", Role::Student, Some(T1));

        let result = TenantValidator::default().validate_access_at(
            now(),
            T1,
            Some(&claims),
            &[Role::Student, Role::Admin],
            false,
        );

        assert_eq!(
            result,
            Err(AccessError::InsufficientRole {
                actual: Role::Student,
                required: Role::Admin
            })
        );
    }

    #[test]
    fn matching_tenant_and_role_is_granted() -> TestResult {
        let claims = claims("user-1", Role::Instructor, Some(T1));

        let grant = TenantValidator::default().validate_access_at(
            now(),
            T1,
            Some(&claims),
            &[Role::Instructor],
            false,
        )?;

        assert!(!grant.bypassed);
        assert_eq!(grant.role, Role::Instructor);

        Ok(())
    }

    #[test]
    fn identity_validation_skips_tenant_comparison() -> TestResult {
        let claims = claims("user-1", Role::Admin, None);

        let grant =
            TenantValidator::default().validate_identity_at(now(), Some(&claims), &[Role::Admin])?;

        assert_eq!(grant.tenant, None);

        Ok(())
    }
}
