//! Retention purge of old audit entries.

use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use tracing::{info, instrument};

use crate::{
    domain::{
        audit::{
            errors::AuditError,
            models::{
                AUDIT_BACKUP_COLLECTION, AUDIT_LOG_COLLECTION, AuditLevel, OperationDescriptor,
                OperationType,
            },
            service::{AuditLogService, parse_entry},
        },
        tenants::TenantId,
    },
    store::{BatchOperation, CollectionPath, DocumentStore, MAX_BATCH_OPERATIONS},
};

/// Actor recorded for purges.
pub const RETENTION_ACTOR: &str = "system:retention";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub examined: usize,
    pub purged: usize,
    pub backups_purged: usize,
}

/// The only component allowed to delete audit entries.
pub struct AuditRetentionJob {
    store: Arc<dyn DocumentStore>,
    audit: Arc<dyn AuditLogService>,
}

impl AuditRetentionJob {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, audit: Arc<dyn AuditLogService>) -> Self {
        Self { store, audit }
    }

    /// Delete a tenant's entries older than `now - retention`.
    ///
    /// # Errors
    ///
    /// - [`AuditError::ConfirmationRequired`] unless `confirm` is set.
    /// - [`AuditError::InvalidRetention`] for a non-positive horizon.
    /// - [`AuditError::Store`] when listing or deleting fails.
    #[instrument(skip(self), fields(tenant = %tenant))]
    pub async fn purge(
        &self,
        tenant: &TenantId,
        retention: SignedDuration,
        now: Timestamp,
        confirm: bool,
    ) -> Result<RetentionReport, AuditError> {
        if !confirm {
            return Err(AuditError::ConfirmationRequired);
        }

        if !retention.is_positive() {
            return Err(AuditError::InvalidRetention);
        }

        let cutoff = now - retention;

        let (examined, purged) = self.purge_collection(tenant, AUDIT_LOG_COLLECTION, cutoff).await?;
        let (_, backups_purged) = self
            .purge_collection(tenant, AUDIT_BACKUP_COLLECTION, cutoff)
            .await?;

        info!(examined, purged, backups_purged, %cutoff, "audit retention purge finished");

        self.audit
            .log_operation(
                tenant,
                OperationDescriptor::new(
                    RETENTION_ACTOR,
                    OperationType::RetentionPurge,
                    AUDIT_LOG_COLLECTION,
                )
                .level(AuditLevel::Warning),
            )
            .await;

        Ok(RetentionReport {
            examined,
            purged,
            backups_purged,
        })
    }

    async fn purge_collection(
        &self,
        tenant: &TenantId,
        collection: &str,
        cutoff: Timestamp,
    ) -> Result<(usize, usize), AuditError> {
        let path = CollectionPath::tenant(tenant, collection);
        let documents = self.store.list(&path).await?;
        let examined = documents.len();

        let expired: Vec<BatchOperation> = documents
            .into_iter()
            .filter_map(|doc| parse_entry(doc.id, doc.data))
            .filter(|entry| entry.timestamp < cutoff)
            .map(|entry| BatchOperation::Delete {
                path: path.clone(),
                id: entry.id,
            })
            .collect();

        let purged = expired.len();

        for chunk in expired.chunks(MAX_BATCH_OPERATIONS) {
            self.store.commit_batch(chunk.to_vec()).await?;
        }

        Ok((examined, purged))
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        domain::audit::{MockAuditLogService, models::AuditLogEntry},
        store::MemoryDocumentStore,
        test::helpers::tenant,
    };

    use super::*;

    async fn seed(
        store: &MemoryDocumentStore,
        tenant: &TenantId,
        id: &str,
        timestamp: Timestamp,
    ) -> TestResult {
        let entry = AuditLogEntry {
            id: id.to_string(),
            tenant_id: tenant.clone(),
            user_id: "user-1".to_string(),
            operation_type: OperationType::Update,
            resource: "payments".to_string(),
            resource_id: None,
            old_data: None,
            new_data: None,
            timestamp,
            success: true,
            error_code: None,
            level: AuditLevel::Info,
        };

        let data = serde_json::to_value(&entry)?
            .as_object()
            .cloned()
            .ok_or("entry is not an object")?;

        store
            .set(
                &CollectionPath::tenant(tenant, AUDIT_LOG_COLLECTION),
                id,
                data.clone(),
            )
            .await?;
        store
            .set(
                &CollectionPath::tenant(tenant, AUDIT_BACKUP_COLLECTION),
                id,
                data,
            )
            .await?;

        Ok(())
    }

    #[tokio::test]
    async fn requires_confirmation() {
        let job = AuditRetentionJob::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MockAuditLogService::new()),
        );

        let result = job
            .purge(
                &tenant("academy_0001"),
                SignedDuration::from_hours(24),
                Timestamp::UNIX_EPOCH,
                false,
            )
            .await;

        assert!(
            matches!(result, Err(AuditError::ConfirmationRequired)),
            "expected ConfirmationRequired, got {result:?}"
        );
    }

    #[tokio::test]
    async fn purges_only_expired_entries() -> TestResult {
        let store = Arc::new(MemoryDocumentStore::new());
        let t1 = tenant("academy_0001");
        let now = Timestamp::UNIX_EPOCH + SignedDuration::from_hours(24 * 100);

        seed(&store, &t1, "old", Timestamp::UNIX_EPOCH).await?;
        seed(&store, &t1, "recent", now - SignedDuration::from_hours(1)).await?;

        let mut audit = MockAuditLogService::new();
        audit
            .expect_log_operation()
            .times(1)
            .returning(|_, _| Some("purge-entry".to_string()));

        let job = AuditRetentionJob::new(store.clone(), Arc::new(audit));

        let report = job
            .purge(&t1, SignedDuration::from_hours(24 * 30), now, true)
            .await?;

        assert_eq!(
            report,
            RetentionReport {
                examined: 2,
                purged: 1,
                backups_purged: 1,
            }
        );

        let remaining = store
            .list(&CollectionPath::tenant(&t1, AUDIT_LOG_COLLECTION))
            .await?;

        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "recent");

        Ok(())
    }
}
