//! Audit models.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{domain::tenants::TenantId, store::Fields};

/// Tenant-scoped collection holding audit entries.
pub const AUDIT_LOG_COLLECTION: &str = "auditLogs";

/// Tenant-scoped collection holding copies of sensitive entries.
pub const AUDIT_BACKUP_COLLECTION: &str = "auditBackup";

/// Resources whose mutations are always backed up.
pub const SENSITIVE_RESOURCES: [&str; 4] = ["payments", "users", "evaluations", "graduations"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Create,
    Read,
    Update,
    Delete,
    Login,
    LoginFailed,
    Logout,
    AccessDenied,
    Export,
    Migration,
    Rollback,
    Cleanup,
    RetentionPurge,
}

impl OperationType {
    pub const ALL: [Self; 13] = [
        Self::Create,
        Self::Read,
        Self::Update,
        Self::Delete,
        Self::Login,
        Self::LoginFailed,
        Self::Logout,
        Self::AccessDenied,
        Self::Export,
        Self::Migration,
        Self::Rollback,
        Self::Cleanup,
        Self::RetentionPurge,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Login => "LOGIN",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::Logout => "LOGOUT",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::Export => "EXPORT",
            Self::Migration => "MIGRATION",
            Self::Rollback => "ROLLBACK",
            Self::Cleanup => "CLEANUP",
            Self::RetentionPurge => "RETENTION_PURGE",
        }
    }
}

impl Display for OperationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|operation| operation.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown operation type `{s}`"))
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl AuditLevel {
    pub const ALL: [Self; 4] = [Self::Info, Self::Warning, Self::Error, Self::Critical];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl Display for AuditLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown audit level `{s}`"))
    }
}

/// What happened, as reported by the caller of the audit service.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    pub user_id: String,
    pub operation: OperationType,
    pub resource: String,
    pub resource_id: Option<String>,
    pub old_data: Option<Fields>,
    pub new_data: Option<Fields>,
    pub success: bool,
    pub error_code: Option<String>,
    pub level: AuditLevel,
}

impl OperationDescriptor {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        operation: OperationType,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            operation,
            resource: resource.into(),
            resource_id: None,
            old_data: None,
            new_data: None,
            success: true,
            error_code: None,
            level: AuditLevel::Info,
        }
    }

    #[must_use]
    pub fn resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn old_data(mut self, data: Fields) -> Self {
        self.old_data = Some(data);
        self
    }

    #[must_use]
    pub fn new_data(mut self, data: Fields) -> Self {
        self.new_data = Some(data);
        self
    }

    /// Mark the operation as failed; the level is raised to at least warning.
    #[must_use]
    pub fn failed(mut self, code: impl Into<String>) -> Self {
        self.success = false;
        self.error_code = Some(code.into());
        self.level = self.level.max(AuditLevel::Warning);
        self
    }

    #[must_use]
    pub fn level(mut self, level: AuditLevel) -> Self {
        self.level = level;
        self
    }
}

/// A persisted audit entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub tenant_id: TenantId,
    pub user_id: String,
    pub operation_type: OperationType,
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_data: Option<Fields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_data: Option<Fields>,
    pub timestamp: Timestamp,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub level: AuditLevel,
}

impl AuditLogEntry {
    /// Whether the entry is copied into the backup collection.
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        self.level == AuditLevel::Critical || SENSITIVE_RESOURCES.contains(&self.resource.as_str())
    }
}

/// Narrowing applied to [`get_logs`](super::AuditLogService::get_logs).
///
/// Results are returned newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilters {
    pub user_id: Option<String>,
    pub operation: Option<OperationType>,
    pub resource: Option<String>,
    pub level: Option<AuditLevel>,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub limit: Option<usize>,
}

impl AuditFilters {
    /// Whether `entry` falls inside the time window.
    #[must_use]
    pub fn in_window(&self, entry: &AuditLogEntry) -> bool {
        self.start.is_none_or(|start| entry.timestamp >= start)
            && self.end.is_none_or(|end| entry.timestamp <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_types_parse_case_insensitively() {
        assert_eq!("login_failed".parse(), Ok(OperationType::LoginFailed));
        assert_eq!("DELETE".parse(), Ok(OperationType::Delete));
        assert!("destroy".parse::<OperationType>().is_err());
    }

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(AuditLevel::Info < AuditLevel::Warning);
        assert!(AuditLevel::Error < AuditLevel::Critical);
        assert_eq!("critical".parse(), Ok(AuditLevel::Critical));
    }

    #[test]
    fn failure_raises_level_to_warning() {
        let descriptor =
            OperationDescriptor::new("user-1", OperationType::Update, "classes").failed("DENIED");

        assert!(!descriptor.success);
        assert_eq!(descriptor.level, AuditLevel::Warning);

        let descriptor = OperationDescriptor::new("user-1", OperationType::Delete, "users")
            .level(AuditLevel::Critical)
            .failed("DENIED");

        assert_eq!(descriptor.level, AuditLevel::Critical);
    }
}
