//! Append-only audit trail.
//!
//! Entries are written under the tenant that owns the mutated resource and are
//! never updated. [`AuditLogService`] has no update or delete
//! operation; only [`AuditRetentionJob`] removes entries, and only past a
//! retention horizon with explicit confirmation.

pub mod emergency;
pub mod errors;
pub mod models;
pub mod report;
pub mod retention;
pub mod sanitize;
pub mod service;

pub use emergency::EmergencyAuditLog;
pub use errors::AuditError;
pub use models::*;
pub use report::{AuditReport, SecurityEvent, SecurityEventKind, build_report};
pub use retention::{AuditRetentionJob, RetentionReport};
pub use service::{AuditLogService, MockAuditLogService, StoreAuditLogService};
