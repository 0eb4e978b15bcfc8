//! Migration engine.

use std::{collections::BTreeMap, sync::Arc};

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::{
    domain::{
        audit::{AuditLogService, OperationDescriptor, OperationType},
        collections::Collection,
        integrity::ReferenceValidator,
        migrations::{
            errors::MigrationError,
            models::{
                BatchOutcome, CleanupReport, CollectionIntegrity, IntegrityReport,
                MigrationPhase, MigrationReport, RollbackReport, SkipReason, SkippedDocument,
                VerificationReport, VerificationStatus,
            },
            plan::{CollectionMigration, MigrationPlan},
        },
        tenants::{
            TenantId,
            resolution::{TENANT_FIELD, TenantResolution, resolve_tenant},
        },
    },
    store::{BatchOperation, Document, DocumentStore, Fields, MAX_BATCH_OPERATIONS},
};

/// Documents per committed batch, leaving headroom under the store limit.
pub const DEFAULT_BATCH_SIZE: usize = 450;

/// Metadata object stamped on every migrated document.
pub const MIGRATION_METADATA_FIELD: &str = "_migration";

/// Actor recorded in audit entries written by migrations.
pub const MIGRATION_ACTOR: &str = "system:migration";

type Groups = BTreeMap<TenantId, Vec<Document>>;

pub struct MigrationEngine {
    store: Arc<dyn DocumentStore>,
    references: ReferenceValidator,
    audit: Arc<dyn AuditLogService>,
    plan: MigrationPlan,
    batch_size: usize,
}

impl MigrationEngine {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, audit: Arc<dyn AuditLogService>) -> Self {
        Self {
            references: ReferenceValidator::new(Arc::clone(&store)).with_legacy_fallback(),
            store,
            audit,
            plan: MigrationPlan::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_plan(mut self, plan: MigrationPlan) -> Self {
        self.plan = plan;
        self
    }

    /// # Errors
    ///
    /// Returns [`MigrationError::InvalidBatchSize`] unless `1 <= size <= 500`.
    pub fn with_batch_size(mut self, size: usize) -> Result<Self, MigrationError> {
        if !(1..=MAX_BATCH_OPERATIONS).contains(&size) {
            return Err(MigrationError::InvalidBatchSize {
                size,
                max: MAX_BATCH_OPERATIONS,
            });
        }

        self.batch_size = size;

        Ok(self)
    }

    #[must_use]
    pub fn plan(&self) -> &MigrationPlan {
        &self.plan
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The planned migration into `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::NotTenantScoped`] for global collections.
    pub fn migration_for(
        &self,
        collection: Collection,
    ) -> Result<CollectionMigration, MigrationError> {
        if !collection.is_isolated() {
            return Err(MigrationError::NotTenantScoped { collection });
        }

        Ok(self
            .plan
            .find(collection)
            .unwrap_or(CollectionMigration::same(collection)))
    }

    /// Migrate one legacy collection.
    ///
    /// Per-document problems are skipped and per-batch failures recorded; only
    /// a failure to read the legacy collection aborts the job.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::NotTenantScoped`] for a global target and
    /// [`MigrationError::Store`] when scanning fails.
    #[instrument(skip(self), fields(source = %migration.source, target = %migration.target))]
    pub async fn migrate(
        &self,
        migration: CollectionMigration,
    ) -> Result<MigrationReport, MigrationError> {
        ensure_isolated(migration.target)?;

        let mut report = MigrationReport::new(migration.target);

        info!(phase = %report.phase, "scanning legacy collection");

        let documents = self.store.list(&migration.source.root_path()).await?;
        report.processed = documents.len();

        report.phase = MigrationPhase::Grouping;
        info!(phase = %report.phase, processed = report.processed, "grouping by tenant");

        let (groups, unresolved) = group_by_tenant(documents);

        for skipped in unresolved {
            report.skip(skipped);
        }

        report.phase = MigrationPhase::Validating;
        info!(phase = %report.phase, tenants = groups.len(), "validating documents");

        let mut eligible = Groups::new();

        for (tenant, documents) in groups {
            for document in documents {
                match self.validate(migration, &tenant, &document).await {
                    Some(reason) => report.skip(SkippedDocument {
                        id: document.id,
                        tenant: Some(tenant.clone()),
                        reason,
                    }),
                    None => eligible.entry(tenant.clone()).or_default().push(document),
                }
            }
        }

        report.phase = MigrationPhase::BatchCommitting;
        info!(
            phase = %report.phase,
            eligible = eligible.values().map(Vec::len).sum::<usize>(),
            batch_size = self.batch_size,
            "committing batches"
        );

        let mut failed_ids: FxHashMap<&TenantId, FxHashSet<String>> = FxHashMap::default();

        for (tenant, documents) in &eligible {
            let failed = self
                .commit_tenant(migration, tenant, documents, &mut report)
                .await;

            failed_ids.insert(tenant, failed);
        }

        for (tenant, documents) in &eligible {
            let expected = documents.iter().map(|doc| doc.id.clone()).collect();
            let failed = failed_ids.get(tenant);

            match self.verify_ids(migration, tenant, expected).await {
                Ok(verification) => {
                    if verification.status == VerificationStatus::Inconsistent
                        && !explained_by_failed_batches(&verification, failed)
                    {
                        report.errors += 1;
                        report.error_details.push(format!(
                            "tenant `{tenant}` is inconsistent: {} legacy, {} migrated, missing [{}]",
                            verification.legacy_count,
                            verification.migrated_count,
                            verification.missing_ids.join(", ")
                        ));
                    }

                    report.verifications.push(verification);
                }
                Err(error) => {
                    report.errors += 1;
                    report
                        .error_details
                        .push(format!("verification of tenant `{tenant}` failed: {error}"));
                }
            }
        }

        report.phase = if report.errors == 0 {
            MigrationPhase::Verified
        } else {
            MigrationPhase::PartiallyFailed
        };

        info!(
            phase = %report.phase,
            processed = report.processed,
            migrated = report.migrated,
            skipped = report.skipped,
            errors = report.errors,
            "migration finished"
        );

        Ok(report)
    }

    /// Run every planned migration in order.
    ///
    /// # Errors
    ///
    /// Stops at the first migration that cannot scan its source.
    pub async fn migrate_all(&self) -> Result<Vec<MigrationReport>, MigrationError> {
        let mut reports = Vec::with_capacity(self.plan.migrations().len());

        for migration in self.plan.migrations() {
            reports.push(self.migrate(*migration).await?);
        }

        Ok(reports)
    }

    /// Compare one tenant's legacy documents with its tenant collection.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Store`] when either collection cannot be read.
    #[instrument(skip(self), fields(target = %migration.target, tenant = %tenant))]
    pub async fn verify(
        &self,
        migration: CollectionMigration,
        tenant: &TenantId,
    ) -> Result<VerificationReport, MigrationError> {
        ensure_isolated(migration.target)?;

        let expected = self
            .store
            .list(&migration.source.root_path())
            .await?
            .into_iter()
            .filter(|doc| valid_tenant(&doc.data).as_ref() == Some(tenant))
            .map(|doc| doc.id)
            .collect();

        let verification = self.verify_ids(migration, tenant, expected).await?;

        info!(
            status = %verification.status,
            legacy = verification.legacy_count,
            migrated = verification.migrated_count,
            "verification finished"
        );

        Ok(verification)
    }

    /// Group and validate documents of every planned collection without writing.
    ///
    /// `sample_size` caps the documents examined per collection. A collection
    /// that cannot be read is reported with its read error.
    #[instrument(skip(self))]
    pub async fn dry_run_integrity(&self, sample_size: Option<usize>) -> IntegrityReport {
        let mut collections = Vec::with_capacity(self.plan.migrations().len());

        for migration in self.plan.migrations() {
            let mut documents = match self.store.list(&migration.source.root_path()).await {
                Ok(documents) => documents,
                Err(error) => {
                    warn!(collection = %migration.source, "cannot read legacy collection: {error}");

                    collections.push(CollectionIntegrity {
                        collection: migration.target,
                        sampled: 0,
                        valid: 0,
                        errors: Vec::new(),
                        read_error: Some(error.to_string()),
                    });
                    continue;
                }
            };

            if let Some(sample_size) = sample_size {
                documents.truncate(sample_size);
            }

            let sampled = documents.len();
            let (groups, mut errors) = group_by_tenant(documents);
            let mut valid = 0;

            for (tenant, documents) in groups {
                for document in documents {
                    match self.validate(*migration, &tenant, &document).await {
                        Some(reason) => errors.push(SkippedDocument {
                            id: document.id,
                            tenant: Some(tenant.clone()),
                            reason,
                        }),
                        None => valid += 1,
                    }
                }
            }

            info!(
                collection = %migration.target,
                sampled,
                valid,
                errors = errors.len(),
                "integrity checked"
            );

            collections.push(CollectionIntegrity {
                collection: migration.target,
                sampled,
                valid,
                errors,
                read_error: None,
            });
        }

        let recommendations = recommendations(&collections);

        IntegrityReport {
            sample_size,
            collections,
            recommendations,
        }
    }

    /// Copy a tenant's migrated documents back to the legacy collection,
    /// stripping migration metadata. Tenant documents are left in place.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::ConfirmationRequired`] unless confirmed, and
    /// [`MigrationError::Store`] on read or batch failures.
    #[instrument(skip(self), fields(target = %migration.target, tenant = %tenant))]
    pub async fn rollback(
        &self,
        migration: CollectionMigration,
        tenant: &TenantId,
        confirm: bool,
    ) -> Result<RollbackReport, MigrationError> {
        if !confirm {
            return Err(MigrationError::ConfirmationRequired {
                operation: "rollback",
            });
        }

        ensure_isolated(migration.target)?;

        let documents = self
            .store
            .list(&migration.target.tenant_path(tenant))
            .await?;
        let source = migration.source.root_path();
        let mut operations = Vec::new();
        let mut untouched = 0;

        for document in documents {
            match restore(migration, document) {
                Some((id, data)) => operations.push(BatchOperation::Set {
                    path: source.clone(),
                    id,
                    data,
                }),
                None => untouched += 1,
            }
        }

        let restored = operations.len();

        for chunk in operations.chunks(self.batch_size) {
            self.store.commit_batch(chunk.to_vec()).await?;
        }

        warn!(restored, untouched, "rolled back tenant documents to legacy collection");

        self.audit
            .log_operation(
                tenant,
                OperationDescriptor::new(
                    MIGRATION_ACTOR,
                    OperationType::Rollback,
                    migration.target.as_str(),
                )
                .new_data(summary(json!({ "restored": restored, "untouched": untouched }))),
            )
            .await;

        Ok(RollbackReport {
            collection: migration.target,
            tenant: tenant.clone(),
            restored,
            untouched,
        })
    }

    /// Delete legacy documents that have a migrated copy.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::ConfirmationRequired`] unless confirmed, and
    /// [`MigrationError::Store`] on read or batch failures.
    #[instrument(skip(self), fields(source = %migration.source))]
    pub async fn cleanup(
        &self,
        migration: CollectionMigration,
        confirm: bool,
    ) -> Result<CleanupReport, MigrationError> {
        if !confirm {
            return Err(MigrationError::ConfirmationRequired {
                operation: "cleanup",
            });
        }

        ensure_isolated(migration.target)?;

        let source = migration.source.root_path();
        let documents = self.store.list(&source).await?;
        let mut migrated_ids: FxHashMap<TenantId, FxHashSet<String>> = FxHashMap::default();
        let mut deleted_per_tenant: FxHashMap<TenantId, usize> = FxHashMap::default();
        let mut operations = Vec::new();
        let mut retained = 0;

        for document in documents {
            let Some(tenant) = valid_tenant(&document.data) else {
                retained += 1;
                continue;
            };

            if !migrated_ids.contains_key(&tenant) {
                let ids = self.migrated_ids(migration, &tenant).await?;
                migrated_ids.insert(tenant.clone(), ids);
            }

            let has_copy = migrated_ids
                .get(&tenant)
                .is_some_and(|ids| ids.contains(&document.id));

            if has_copy {
                *deleted_per_tenant.entry(tenant).or_default() += 1;
                operations.push(BatchOperation::Delete {
                    path: source.clone(),
                    id: document.id,
                });
            } else {
                retained += 1;
            }
        }

        let mut batches = 0;

        for chunk in operations.chunks(self.batch_size) {
            self.store.commit_batch(chunk.to_vec()).await?;
            batches += 1;
        }

        warn!(deleted = operations.len(), retained, batches, "cleaned up legacy collection");

        for (tenant, deleted) in &deleted_per_tenant {
            self.audit
                .log_operation(
                    tenant,
                    OperationDescriptor::new(
                        MIGRATION_ACTOR,
                        OperationType::Cleanup,
                        migration.source.as_str(),
                    )
                    .new_data(summary(json!({ "deleted": deleted }))),
                )
                .await;
        }

        Ok(CleanupReport {
            collection: migration.target,
            deleted: operations.len(),
            retained,
            batches,
        })
    }

    async fn validate(
        &self,
        migration: CollectionMigration,
        tenant: &TenantId,
        document: &Document,
    ) -> Option<SkipReason> {
        let spec = migration.target.spec();

        let missing: Vec<&'static str> = spec
            .required_fields
            .iter()
            .copied()
            .filter(|field| matches!(document.data.get(*field), None | Some(Value::Null)))
            .collect();

        if !missing.is_empty() {
            return Some(SkipReason::MissingRequiredFields(missing));
        }

        let errors = self
            .references
            .validate_references(&document.data, spec.references, tenant)
            .await;

        (!errors.is_empty()).then_some(SkipReason::InvalidReferences(errors))
    }

    async fn commit_tenant(
        &self,
        migration: CollectionMigration,
        tenant: &TenantId,
        documents: &[Document],
        report: &mut MigrationReport,
    ) -> FxHashSet<String> {
        let path = migration.target.tenant_path(tenant);
        let mut migrated = 0;
        let mut failed = FxHashSet::default();

        for chunk in documents.chunks(self.batch_size) {
            let operations = chunk
                .iter()
                .map(|document| BatchOperation::Set {
                    path: path.clone(),
                    id: document.id.clone(),
                    data: migrated_data(migration, tenant, document),
                })
                .collect();

            match self.store.commit_batch(operations).await {
                Ok(()) => {
                    migrated += chunk.len();
                    report.batches.push(BatchOutcome {
                        tenant: tenant.clone(),
                        size: chunk.len(),
                        error: None,
                    });
                }
                Err(error) => {
                    warn!(%tenant, size = chunk.len(), "batch failed: {error}");

                    failed.extend(chunk.iter().map(|document| document.id.clone()));
                    report.errors += 1;
                    report.error_details.push(format!(
                        "batch of {} documents for tenant `{tenant}` failed: {error}",
                        chunk.len()
                    ));
                    report.batches.push(BatchOutcome {
                        tenant: tenant.clone(),
                        size: chunk.len(),
                        error: Some(error.to_string()),
                    });
                }
            }
        }

        report.migrated += migrated;

        self.audit
            .log_operation(
                tenant,
                OperationDescriptor::new(
                    MIGRATION_ACTOR,
                    OperationType::Migration,
                    migration.target.as_str(),
                )
                .new_data(summary(json!({
                    "sourceCollection": migration.source.as_str(),
                    "migrated": migrated,
                    "failed": failed.len(),
                }))),
            )
            .await;

        failed
    }

    /// Ids in the tenant collection that were migrated from `migration.source`.
    async fn migrated_ids(
        &self,
        migration: CollectionMigration,
        tenant: &TenantId,
    ) -> Result<FxHashSet<String>, MigrationError> {
        Ok(self
            .store
            .list(&migration.target.tenant_path(tenant))
            .await?
            .into_iter()
            .filter(|doc| migrated_from(&doc.data, migration.source))
            .map(|doc| doc.id)
            .collect())
    }

    async fn verify_ids(
        &self,
        migration: CollectionMigration,
        tenant: &TenantId,
        expected: Vec<String>,
    ) -> Result<VerificationReport, MigrationError> {
        let migrated = self.migrated_ids(migration, tenant).await?;

        let missing_ids: Vec<String> = expected
            .iter()
            .filter(|id| !migrated.contains(*id))
            .cloned()
            .collect();

        let status = if missing_ids.is_empty() && migrated.len() == expected.len() {
            VerificationStatus::Consistent
        } else {
            VerificationStatus::Inconsistent
        };

        Ok(VerificationReport {
            collection: migration.target,
            tenant: tenant.clone(),
            legacy_count: expected.len(),
            migrated_count: migrated.len(),
            missing_ids,
            status,
        })
    }
}

/// A mismatch already reported through failed batches: every missing id was
/// in one of them and nothing else differs.
fn explained_by_failed_batches(
    verification: &VerificationReport,
    failed: Option<&FxHashSet<String>>,
) -> bool {
    let Some(failed) = failed.filter(|failed| !failed.is_empty()) else {
        return false;
    };

    verification.missing_ids.iter().all(|id| failed.contains(id))
        && verification.migrated_count + verification.missing_ids.len()
            == verification.legacy_count
}

fn ensure_isolated(collection: Collection) -> Result<(), MigrationError> {
    if collection.is_isolated() {
        Ok(())
    } else {
        Err(MigrationError::NotTenantScoped { collection })
    }
}

fn valid_tenant(data: &Fields) -> Option<TenantId> {
    match resolve_tenant(data) {
        TenantResolution::Resolved(raw) => TenantId::parse(raw).ok(),
        TenantResolution::Missing | TenantResolution::Conflicting(_) => None,
    }
}

fn group_by_tenant(documents: Vec<Document>) -> (Groups, Vec<SkippedDocument>) {
    let mut groups = Groups::new();
    let mut skipped = Vec::new();

    for document in documents {
        let reason = match resolve_tenant(&document.data) {
            TenantResolution::Resolved(raw) => match TenantId::parse(raw) {
                Ok(tenant) => {
                    groups.entry(tenant).or_default().push(document);
                    continue;
                }
                Err(error) => SkipReason::InvalidTenant(error.to_string()),
            },
            TenantResolution::Missing => SkipReason::MissingTenant,
            TenantResolution::Conflicting(values) => SkipReason::ConflictingTenants(values),
        };

        skipped.push(SkippedDocument {
            id: document.id,
            tenant: None,
            reason,
        });
    }

    (groups, skipped)
}

/// The tenant-scoped copy of a legacy document. Deterministic, so repeated
/// runs write identical data.
fn migrated_data(
    migration: CollectionMigration,
    tenant: &TenantId,
    document: &Document,
) -> Fields {
    let mut data = document.data.clone();
    let tenant_field_added = !data.contains_key(TENANT_FIELD);

    data.insert(TENANT_FIELD.to_string(), Value::from(tenant.as_str()));
    data.insert(
        MIGRATION_METADATA_FIELD.to_string(),
        json!({
            "sourceCollection": migration.source.as_str(),
            "sourceId": document.id,
            "tenantFieldAdded": tenant_field_added,
        }),
    );

    data
}

fn migrated_from(data: &Fields, source: Collection) -> bool {
    data.get(MIGRATION_METADATA_FIELD)
        .and_then(|metadata| metadata.get("sourceCollection"))
        .and_then(Value::as_str)
        == Some(source.as_str())
}

/// Undo [`migrated_data`]; `None` for documents not migrated from the source.
fn restore(migration: CollectionMigration, document: Document) -> Option<(String, Fields)> {
    if !migrated_from(&document.data, migration.source) {
        return None;
    }

    let mut data = document.data;
    let metadata = data.remove(MIGRATION_METADATA_FIELD)?;

    if metadata.get("tenantFieldAdded").and_then(Value::as_bool) == Some(true) {
        data.remove(TENANT_FIELD);
    }

    let id = metadata
        .get("sourceId")
        .and_then(Value::as_str)
        .map_or(document.id, str::to_string);

    Some((id, data))
}

fn summary(value: Value) -> Fields {
    match value {
        Value::Object(fields) => fields,
        _ => Fields::new(),
    }
}

fn recommendations(collections: &[CollectionIntegrity]) -> Vec<String> {
    let mut recommendations = Vec::new();

    for integrity in collections {
        if let Some(error) = &integrity.read_error {
            recommendations.push(format!(
                "{}: legacy collection could not be read ({error}); rerun once the store is reachable",
                integrity.collection
            ));
        }
    }

    for integrity in collections.iter().filter(|integrity| !integrity.errors.is_empty()) {
        recommendations.push(format!(
            "{}: fix {} of {} sampled documents before migrating",
            integrity.collection,
            integrity.errors.len(),
            integrity.sampled
        ));
    }

    let untenanted = collections
        .iter()
        .flat_map(|integrity| &integrity.errors)
        .filter(|error| {
            matches!(
                error.reason,
                SkipReason::MissingTenant | SkipReason::ConflictingTenants(_)
            )
        })
        .count();

    if untenanted > 0 {
        recommendations.push(format!(
            "{untenanted} documents have no single tenant: set tenantId before migrating"
        ));
    }

    if recommendations.is_empty() {
        recommendations.push("no integrity problems found".to_string());
    }

    recommendations
}
