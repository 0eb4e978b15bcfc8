//! Audit log service.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use serde_json::Value;
use tracing::{error, warn};

use crate::{
    domain::{
        audit::{
            emergency::EmergencyAuditLog,
            errors::AuditError,
            models::{
                AUDIT_BACKUP_COLLECTION, AUDIT_LOG_COLLECTION, AuditFilters, AuditLogEntry,
                OperationDescriptor,
            },
            report::{AuditReport, build_report},
            sanitize::sanitize,
        },
        tenants::TenantId,
    },
    store::{CollectionPath, DocumentStore, FieldFilter, Fields, Query, generate_document_id},
};

#[derive(Clone)]
pub struct StoreAuditLogService {
    store: Arc<dyn DocumentStore>,
    emergency: Arc<EmergencyAuditLog>,
}

impl StoreAuditLogService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, emergency: Arc<EmergencyAuditLog>) -> Self {
        Self { store, emergency }
    }

    #[must_use]
    pub fn emergency_log(&self) -> &Arc<EmergencyAuditLog> {
        &self.emergency
    }

    fn entry(tenant: &TenantId, descriptor: OperationDescriptor) -> AuditLogEntry {
        AuditLogEntry {
            id: generate_document_id(),
            tenant_id: tenant.clone(),
            user_id: descriptor.user_id,
            operation_type: descriptor.operation,
            resource: descriptor.resource,
            resource_id: descriptor.resource_id,
            old_data: descriptor.old_data.map(sanitize),
            new_data: descriptor.new_data.map(sanitize),
            timestamp: Timestamp::now(),
            success: descriptor.success,
            error_code: descriptor.error_code,
            level: descriptor.level,
        }
    }

    fn park(&self, entry: AuditLogEntry, reason: &dyn std::fmt::Display) {
        error!(
            tenant = %entry.tenant_id,
            operation = %entry.operation_type,
            resource = %entry.resource,
            "failed to persist audit entry, kept in emergency buffer: {reason}"
        );

        self.emergency.push(entry);
    }
}

#[async_trait]
impl AuditLogService for StoreAuditLogService {
    async fn log_operation(
        &self,
        tenant: &TenantId,
        descriptor: OperationDescriptor,
    ) -> Option<String> {
        let entry = Self::entry(tenant, descriptor);

        let data = match serde_json::to_value(&entry) {
            Ok(Value::Object(data)) => data,
            Ok(_) => {
                self.park(entry, &"entry did not serialize to an object");
                return None;
            }
            Err(error) => {
                self.park(entry, &error);
                return None;
            }
        };

        let path = CollectionPath::tenant(tenant, AUDIT_LOG_COLLECTION);

        if let Err(error) = self.store.set(&path, &entry.id, data.clone()).await {
            self.park(entry, &error);
            return None;
        }

        if entry.is_sensitive() {
            let backup = CollectionPath::tenant(tenant, AUDIT_BACKUP_COLLECTION);

            if let Err(error) = self.store.set(&backup, &entry.id, data).await {
                warn!(tenant = %tenant, id = %entry.id, "failed to back up audit entry: {error}");
            }
        }

        Some(entry.id)
    }

    async fn get_logs(
        &self,
        tenant: &TenantId,
        filters: &AuditFilters,
    ) -> Result<Vec<AuditLogEntry>, AuditError> {
        let mut query = Query::new();

        if let Some(user_id) = &filters.user_id {
            query = query.filter(FieldFilter::equals("userId", user_id.as_str()));
        }

        if let Some(operation) = filters.operation {
            query = query.filter(FieldFilter::equals("operationType", operation.as_str()));
        }

        if let Some(resource) = &filters.resource {
            query = query.filter(FieldFilter::equals("resource", resource.as_str()));
        }

        if let Some(level) = filters.level {
            query = query.filter(FieldFilter::equals("level", level.as_str()));
        }

        let path = CollectionPath::tenant(tenant, AUDIT_LOG_COLLECTION);

        let mut entries: Vec<AuditLogEntry> = self
            .store
            .query(&path, &query)
            .await?
            .into_iter()
            .filter_map(|doc| parse_entry(doc.id, doc.data))
            .filter(|entry| filters.in_window(entry))
            .collect();

        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        if let Some(limit) = filters.limit {
            entries.truncate(limit);
        }

        Ok(entries)
    }

    async fn generate_audit_report(
        &self,
        tenant: &TenantId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<AuditReport, AuditError> {
        if start > end {
            return Err(AuditError::InvalidRange { start, end });
        }

        let filters = AuditFilters {
            start: Some(start),
            end: Some(end),
            ..AuditFilters::default()
        };

        let entries = self.get_logs(tenant, &filters).await?;

        Ok(build_report(tenant, start, end, &entries))
    }
}

/// Decode a stored entry, skipping documents that are not audit entries.
pub(crate) fn parse_entry(id: String, data: Fields) -> Option<AuditLogEntry> {
    match serde_json::from_value::<AuditLogEntry>(Value::Object(data)) {
        Ok(entry) => Some(entry),
        Err(error) => {
            warn!(%id, "skipping malformed audit entry: {error}");
            None
        }
    }
}

/// Append-only audit trail. There is intentionally no way to change or remove
/// entries through this interface.
#[automock]
#[async_trait]
pub trait AuditLogService: Send + Sync {
    /// Record an operation. Never fails; returns the entry id when persisted.
    async fn log_operation(
        &self,
        tenant: &TenantId,
        descriptor: OperationDescriptor,
    ) -> Option<String>;

    /// Entries of one tenant matching `filters`, newest first.
    async fn get_logs(
        &self,
        tenant: &TenantId,
        filters: &AuditFilters,
    ) -> Result<Vec<AuditLogEntry>, AuditError>;

    /// Aggregate a tenant's entries between `start` and `end`, inclusive.
    async fn generate_audit_report(
        &self,
        tenant: &TenantId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<AuditReport, AuditError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use crate::{
        domain::audit::{
            models::{AuditLevel, OperationType},
            sanitize::REDACTED,
        },
        store::{MemoryDocumentStore, MockDocumentStore, StoreError},
        test::helpers::{fields, tenant},
    };

    use super::*;

    fn service(store: Arc<dyn DocumentStore>) -> StoreAuditLogService {
        StoreAuditLogService::new(store, Arc::new(EmergencyAuditLog::new(4)))
    }

    #[tokio::test]
    async fn entries_land_under_the_tenant() -> TestResult {
        let store = Arc::new(MemoryDocumentStore::new());
        let audit = service(store.clone());
        let t1 = tenant("academy_0001");

        let id = audit
            .log_operation(
                &t1,
                OperationDescriptor::new("user-1", OperationType::Create, "classes")
                    .resource_id("class-1")
                    .new_data(fields(json!({ "name": "Kids", "password": "x" }))),
            )
            .await
            .ok_or("entry was not persisted")?;

        let logs = audit.get_logs(&t1, &AuditFilters::default()).await?;

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, id);
        assert_eq!(
            logs[0].new_data.as_ref().and_then(|data| data.get("password")),
            Some(&json!(REDACTED))
        );

        let other = audit
            .get_logs(&tenant("academy_0002"), &AuditFilters::default())
            .await?;

        assert!(other.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn sensitive_entries_are_backed_up() -> TestResult {
        let store = Arc::new(MemoryDocumentStore::new());
        let audit = service(store.clone());
        let t1 = tenant("academy_0001");

        audit
            .log_operation(
                &t1,
                OperationDescriptor::new("user-1", OperationType::Update, "payments"),
            )
            .await;
        audit
            .log_operation(
                &t1,
                OperationDescriptor::new("user-1", OperationType::Update, "classes"),
            )
            .await;
        audit
            .log_operation(
                &t1,
                OperationDescriptor::new("user-1", OperationType::Delete, "classes")
                    .level(AuditLevel::Critical),
            )
            .await;

        let backups = store
            .count(&CollectionPath::tenant(&t1, AUDIT_BACKUP_COLLECTION))
            .await?;

        assert_eq!(backups, 2);

        Ok(())
    }

    #[tokio::test]
    async fn store_failure_falls_back_to_emergency_buffer() {
        let mut store = MockDocumentStore::new();
        store
            .expect_set()
            .returning(|_, _, _| Err(StoreError::unavailable(std::io::Error::other("down"))));

        let audit = service(Arc::new(store));

        let id = audit
            .log_operation(
                &tenant("academy_0001"),
                OperationDescriptor::new("user-1", OperationType::Create, "classes"),
            )
            .await;

        assert_eq!(id, None);
        assert_eq!(audit.emergency_log().len(), 1);
    }

    #[tokio::test]
    async fn filters_narrow_results() -> TestResult {
        let store = Arc::new(MemoryDocumentStore::new());
        let audit = service(store);
        let t1 = tenant("academy_0001");

        for (user, operation) in [
            ("user-1", OperationType::Create),
            ("user-2", OperationType::Create),
            ("user-1", OperationType::Delete),
        ] {
            audit
                .log_operation(&t1, OperationDescriptor::new(user, operation, "classes"))
                .await;
        }

        let filters = AuditFilters {
            user_id: Some("user-1".to_string()),
            ..AuditFilters::default()
        };

        assert_eq!(audit.get_logs(&t1, &filters).await?.len(), 2);

        let filters = AuditFilters {
            operation: Some(OperationType::Delete),
            ..AuditFilters::default()
        };

        assert_eq!(audit.get_logs(&t1, &filters).await?.len(), 1);

        let filters = AuditFilters {
            limit: Some(1),
            ..AuditFilters::default()
        };

        assert_eq!(audit.get_logs(&t1, &filters).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn inverted_report_range_is_rejected() {
        let audit = service(Arc::new(MemoryDocumentStore::new()));

        let result = audit
            .generate_audit_report(
                &tenant("academy_0001"),
                Timestamp::UNIX_EPOCH + jiff::SignedDuration::from_hours(1),
                Timestamp::UNIX_EPOCH,
            )
            .await;

        assert!(
            matches!(result, Err(AuditError::InvalidRange { .. })),
            "expected InvalidRange, got {result:?}"
        );
    }
}
