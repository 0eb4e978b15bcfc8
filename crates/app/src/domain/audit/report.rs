//! Audit report aggregation.

use std::collections::BTreeMap;

use jiff::Timestamp;
use rustc_hash::FxHashMap;

use crate::domain::{
    audit::models::{AuditLevel, AuditLogEntry, OperationType},
    collections::Collection,
    tenants::TenantId,
};

/// Error rate above which failing operations should be investigated.
pub const ERROR_RATE_THRESHOLD: f64 = 0.10;

/// Operations by one user above which activity looks automated.
pub const USER_ACTIVITY_THRESHOLD: usize = 1000;

/// Minimum total volume before a single user's share is considered.
pub const USER_SHARE_MIN_OPERATIONS: usize = 100;

/// Security event count above which access controls should be reviewed.
pub const SECURITY_EVENT_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityEventKind {
    AuthenticationFailure,
    AccessDenied,
    IdentityDeletion,
    ErrorEntry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecurityEvent {
    pub entry_id: String,
    pub kind: SecurityEventKind,
    pub user_id: String,
    pub timestamp: Timestamp,
    pub level: AuditLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditReport {
    pub tenant_id: TenantId,
    pub start: Timestamp,
    pub end: Timestamp,
    pub total_operations: usize,
    pub failed_operations: usize,
    pub error_rate: f64,
    pub by_level: BTreeMap<AuditLevel, usize>,
    pub by_operation: BTreeMap<OperationType, usize>,
    pub by_user: BTreeMap<String, usize>,
    pub by_resource: BTreeMap<String, usize>,
    pub security_events: Vec<SecurityEvent>,
    pub recommendations: Vec<String>,
}

fn classify(entry: &AuditLogEntry) -> Option<SecurityEventKind> {
    match entry.operation_type {
        OperationType::LoginFailed => Some(SecurityEventKind::AuthenticationFailure),
        OperationType::AccessDenied => Some(SecurityEventKind::AccessDenied),
        OperationType::Delete if entry.resource == Collection::Users.as_str() => {
            Some(SecurityEventKind::IdentityDeletion)
        }
        _ if entry.level >= AuditLevel::Error => Some(SecurityEventKind::ErrorEntry),
        _ => None,
    }
}

fn sorted<K: Ord>(counts: FxHashMap<K, usize>) -> BTreeMap<K, usize> {
    counts.into_iter().collect()
}

/// Aggregate the entries falling between `start` and `end`, inclusive.
#[must_use]
pub fn build_report(
    tenant: &TenantId,
    start: Timestamp,
    end: Timestamp,
    entries: &[AuditLogEntry],
) -> AuditReport {
    let mut by_level: FxHashMap<AuditLevel, usize> = FxHashMap::default();
    let mut by_operation: FxHashMap<OperationType, usize> = FxHashMap::default();
    let mut by_user: FxHashMap<String, usize> = FxHashMap::default();
    let mut by_resource: FxHashMap<String, usize> = FxHashMap::default();
    let mut security_events = Vec::new();
    let mut total = 0;
    let mut failed = 0;

    for entry in entries
        .iter()
        .filter(|entry| entry.timestamp >= start && entry.timestamp <= end)
    {
        total += 1;

        if !entry.success {
            failed += 1;
        }

        *by_level.entry(entry.level).or_default() += 1;
        *by_operation.entry(entry.operation_type).or_default() += 1;
        *by_user.entry(entry.user_id.clone()).or_default() += 1;
        *by_resource.entry(entry.resource.clone()).or_default() += 1;

        if let Some(kind) = classify(entry) {
            security_events.push(SecurityEvent {
                entry_id: entry.id.clone(),
                kind,
                user_id: entry.user_id.clone(),
                timestamp: entry.timestamp,
                level: entry.level,
            });
        }
    }

    security_events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let error_rate = if total == 0 {
        0.0
    } else {
        failed as f64 / total as f64
    };

    let by_user = sorted(by_user);

    let mut recommendations = Vec::new();

    if error_rate > ERROR_RATE_THRESHOLD {
        recommendations.push(format!(
            "error rate of {:.1}% exceeds {:.0}%: investigate failing operations",
            error_rate * 100.0,
            ERROR_RATE_THRESHOLD * 100.0
        ));
    }

    for (user, count) in &by_user {
        if *count > USER_ACTIVITY_THRESHOLD {
            recommendations.push(format!(
                "user `{user}` performed {count} operations: review for automated activity"
            ));
        } else if total >= USER_SHARE_MIN_OPERATIONS && count * 2 > total {
            recommendations.push(format!(
                "user `{user}` accounts for {count} of {total} operations: review for unusual activity"
            ));
        }
    }

    if security_events.len() > SECURITY_EVENT_THRESHOLD {
        recommendations.push(format!(
            "{} security events recorded: review access controls",
            security_events.len()
        ));
    }

    AuditReport {
        tenant_id: tenant.clone(),
        start,
        end,
        total_operations: total,
        failed_operations: failed,
        error_rate,
        by_level: sorted(by_level),
        by_operation: sorted(by_operation),
        by_user,
        by_resource: sorted(by_resource),
        security_events,
        recommendations,
    }
}
