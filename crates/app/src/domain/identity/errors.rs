//! Identity claims errors.

use thiserror::Error;

use crate::domain::tenants::TenantIdError;

#[derive(Debug, Clone, Error)]
pub enum ClaimsError {
    #[error("token carries no user id")]
    MissingUid,

    #[error("claim `{claim}` has not been propagated to the token yet")]
    NotPropagated { claim: &'static str },

    #[error("unknown role `{0}`")]
    UnknownRole(String),

    #[error("token carries an invalid tenant id")]
    InvalidTenant(#[source] TenantIdError),

    #[error("claims source failed: {0}")]
    Source(String),
}

impl ClaimsError {
    /// Whether fetching the token again may produce a different outcome.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotPropagated { .. } | Self::Source(_))
    }
}
