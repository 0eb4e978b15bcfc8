//! Migration reports.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::domain::{collections::Collection, tenants::TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    Scanning,
    Grouping,
    Validating,
    BatchCommitting,
    Verified,
    PartiallyFailed,
}

impl Display for MigrationPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Scanning => "scanning",
            Self::Grouping => "grouping",
            Self::Validating => "validating",
            Self::BatchCommitting => "batch-committing",
            Self::Verified => "verified",
            Self::PartiallyFailed => "partially-failed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingTenant,
    InvalidTenant(String),
    ConflictingTenants(Vec<String>),
    MissingRequiredFields(Vec<&'static str>),
    InvalidReferences(Vec<String>),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::MissingTenant => f.write_str("no tenant field"),
            Self::InvalidTenant(value) => write!(f, "invalid tenant id `{value}`"),
            Self::ConflictingTenants(values) => {
                write!(f, "conflicting tenant ids: {}", values.join(", "))
            }
            Self::MissingRequiredFields(fields) => {
                write!(f, "missing required fields: {}", fields.join(", "))
            }
            Self::InvalidReferences(errors) => {
                write!(f, "invalid references: {}", errors.join("; "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub id: String,
    pub tenant: Option<TenantId>,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub tenant: TenantId,
    pub size: usize,
    pub error: Option<String>,
}

impl BatchOutcome {
    #[must_use]
    pub fn committed(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Consistent,
    Inconsistent,
}

impl Display for VerificationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Consistent => "consistent",
            Self::Inconsistent => "inconsistent",
        })
    }
}

/// Parity between a tenant's legacy subset and its tenant collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub collection: Collection,
    pub tenant: TenantId,
    pub legacy_count: usize,
    pub migrated_count: usize,
    pub missing_ids: Vec<String>,
    pub status: VerificationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub collection: Collection,
    pub processed: usize,
    pub migrated: usize,
    pub skipped: usize,

    /// Failed batches, plus tenant verifications that failed or are
    /// inconsistent for reasons the failed batches do not account for.
    pub errors: usize,
    pub error_details: Vec<String>,
    pub skipped_details: Vec<SkippedDocument>,
    pub batches: Vec<BatchOutcome>,
    pub verifications: Vec<VerificationReport>,
    pub phase: MigrationPhase,
}

impl MigrationReport {
    #[must_use]
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            processed: 0,
            migrated: 0,
            skipped: 0,
            errors: 0,
            error_details: Vec::new(),
            skipped_details: Vec::new(),
            batches: Vec::new(),
            verifications: Vec::new(),
            phase: MigrationPhase::Scanning,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors == 0
    }

    pub(crate) fn skip(&mut self, skipped: SkippedDocument) {
        self.skipped += 1;
        self.skipped_details.push(skipped);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionIntegrity {
    pub collection: Collection,
    pub sampled: usize,
    pub valid: usize,
    pub errors: Vec<SkippedDocument>,

    /// Set when the legacy collection could not be listed.
    pub read_error: Option<String>,
}

/// Validation-only pass over every planned collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    pub sample_size: Option<usize>,
    pub collections: Vec<CollectionIntegrity>,
    pub recommendations: Vec<String>,
}

impl IntegrityReport {
    #[must_use]
    pub fn total_errors(&self) -> usize {
        self.collections
            .iter()
            .map(|collection| {
                collection.errors.len() + usize::from(collection.read_error.is_some())
            })
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackReport {
    pub collection: Collection,
    pub tenant: TenantId,
    pub restored: usize,

    /// Tenant documents that were never migrated and stay where they are.
    pub untouched: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub collection: Collection,
    pub deleted: usize,

    /// Legacy documents kept because no migrated copy exists.
    pub retained: usize,
    pub batches: usize,
}
