//! Access validation errors.

use std::fmt::{Display, Formatter, Result as FmtResult};

use thiserror::Error;

use crate::domain::{identity::Role, tenants::TenantIdError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    MissingClaims,
    SessionExpired,
}

impl Display for UnauthenticatedReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::MissingClaims => "no identity claims",
            Self::SessionExpired => "session expired",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("invalid tenant id")]
    InvalidTenantId(#[source] TenantIdError),

    #[error("unauthenticated: {reason}")]
    Unauthenticated { reason: UnauthenticatedReason },

    #[error("access to tenant `{requested}` denied")]
    AccessDenied {
        requested: String,
        actual: Option<String>,
    },

    #[error("role `{actual}` is insufficient, `{required}` required")]
    InsufficientRole { actual: Role, required: Role },
}

impl AccessError {
    /// Stable code recorded in audit entries.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidTenantId(_) => "INVALID_TENANT_ID",
            Self::Unauthenticated { .. } => "UNAUTHENTICATED",
            Self::AccessDenied { .. } => "ACCESS_DENIED",
            Self::InsufficientRole { .. } => "INSUFFICIENT_ROLE",
        }
    }
}
