//! Interceptors run by the data access layer before every operation.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    sync::Arc,
};

use jiff::Timestamp;
use smallvec::{SmallVec, smallvec};

use crate::domain::{
    access::{
        errors::AccessError,
        validator::{AccessGrant, TenantValidator},
    },
    collections::Collection,
    identity::{IdentityClaims, Role},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Read,
    List,
    Update,
    Delete,
}

impl OperationKind {
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::List => "list",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Who is calling and what the operation demands of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessScope {
    pub claims: Option<IdentityClaims>,
    pub required_roles: SmallVec<[Role; 3]>,
    pub super_admin_bypass: bool,
}

impl AccessScope {
    /// Scope for an authenticated member; any role may proceed.
    #[must_use]
    pub fn for_claims(claims: IdentityClaims) -> Self {
        Self {
            claims: Some(claims),
            required_roles: smallvec![Role::Student],
            super_admin_bypass: false,
        }
    }

    /// Scope without claims; every check requiring authentication fails.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            claims: None,
            required_roles: SmallVec::new(),
            super_admin_bypass: false,
        }
    }

    #[must_use]
    pub fn requiring(mut self, roles: &[Role]) -> Self {
        self.required_roles = SmallVec::from_slice(roles);
        self
    }

    /// Allow crossing tenants. Only administrative tooling sets this.
    #[must_use]
    pub fn with_super_admin_bypass(mut self) -> Self {
        self.super_admin_bypass = true;
        self
    }

    /// User id recorded in audit entries.
    #[must_use]
    pub fn actor(&self) -> &str {
        self.claims
            .as_ref()
            .map_or("anonymous", |claims| claims.user_id.as_str())
    }
}

/// One operation about to hit the store.
#[derive(Debug, Clone, Copy)]
pub struct OperationRequest<'a> {
    pub kind: OperationKind,
    pub collection: Collection,

    /// Requested tenant as supplied by the caller; ignored for global collections.
    pub tenant: Option<&'a str>,
    pub scope: &'a AccessScope,
    pub now: Timestamp,
}

pub trait AccessInterceptor: Send + Sync {
    /// Inspect the request, failing to stop the operation.
    ///
    /// # Errors
    ///
    /// Returns an [`AccessError`] to reject the request.
    fn intercept(&self, request: &OperationRequest<'_>) -> Result<(), AccessError>;
}

/// Runs [`TenantValidator`] with the operation's declared roles.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantAccessInterceptor {
    validator: TenantValidator,
}

impl TenantAccessInterceptor {
    #[must_use]
    pub const fn new(validator: TenantValidator) -> Self {
        Self { validator }
    }

    /// Validate and return the grant.
    ///
    /// # Errors
    ///
    /// Returns the validator's [`AccessError`].
    pub fn grant(&self, request: &OperationRequest<'_>) -> Result<AccessGrant, AccessError> {
        let scope = request.scope;
        let claims = scope.claims.as_ref();

        match request.tenant {
            Some(tenant) if request.collection.is_isolated() => self.validator.validate_access_at(
                request.now,
                tenant,
                claims,
                &scope.required_roles,
                scope.super_admin_bypass,
            ),
            _ => self
                .validator
                .validate_identity_at(request.now, claims, &scope.required_roles),
        }
    }
}

impl AccessInterceptor for TenantAccessInterceptor {
    fn intercept(&self, request: &OperationRequest<'_>) -> Result<(), AccessError> {
        self.grant(request).map(|_| ())
    }
}

/// Ordered interceptors; the first failure wins.
#[derive(Clone)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn AccessInterceptor>>,
}

impl InterceptorChain {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// The default chain: a single [`TenantAccessInterceptor`].
    #[must_use]
    pub fn with_validator(validator: TenantValidator) -> Self {
        Self::empty().with(Arc::new(TenantAccessInterceptor::new(validator)))
    }

    #[must_use]
    pub fn with(mut self, interceptor: Arc<dyn AccessInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run every interceptor in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`AccessError`] raised.
    pub fn run(&self, request: &OperationRequest<'_>) -> Result<(), AccessError> {
        self.interceptors
            .iter()
            .try_for_each(|interceptor| interceptor.intercept(request))
    }
}

impl Default for InterceptorChain {
    fn default() -> Self {
        Self::with_validator(TenantValidator::default())
    }
}
