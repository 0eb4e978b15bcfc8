//! Data access errors.

use thiserror::Error;

use crate::{
    domain::{
        access::AccessError,
        collections::{Collection, UnknownCollection},
        tenants::TenantId,
    },
    store::StoreError,
};

#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error(transparent)]
    CollectionNotRegistered(#[from] UnknownCollection),

    #[error("collection `{collection}` requires a tenant id")]
    TenantIdRequired { collection: Collection },

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("record `{record_id}` in `{collection}` is stamped `{found}`, expected `{expected}`")]
    CrossTenantViolation {
        collection: Collection,
        record_id: String,
        expected: TenantId,
        found: String,
    },

    #[error("record `{id}` not found in `{collection}`")]
    NotFound { collection: Collection, id: String },

    #[error("records of `{collection}` cannot be deleted")]
    DeletionNotPermitted { collection: Collection },

    #[error("missing required fields for `{collection}`: {}", fields.join(", "))]
    MissingRequiredFields {
        collection: Collection,
        fields: Vec<&'static str>,
    },

    #[error("invalid references for `{collection}`: {}", errors.join("; "))]
    InvalidReferences {
        collection: Collection,
        errors: Vec<String>,
    },

    #[error("document store unavailable")]
    StoreUnavailable(#[from] StoreError),
}

impl DataAccessError {
    /// Stable code recorded in audit entries and shown to callers.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::CollectionNotRegistered(_) => "COLLECTION_NOT_REGISTERED",
            Self::TenantIdRequired { .. } => "TENANT_ID_REQUIRED",
            Self::Access(error) => error.code(),
            Self::CrossTenantViolation { .. } => "CROSS_TENANT_VIOLATION",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::DeletionNotPermitted { .. } => "DELETION_NOT_PERMITTED",
            Self::MissingRequiredFields { .. } => "MISSING_REQUIRED_FIELDS",
            Self::InvalidReferences { .. } => "INVALID_REFERENCES",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }
}
