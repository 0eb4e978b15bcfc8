//! Tenant data service.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    domain::{
        access::{AccessError, AccessScope, InterceptorChain, OperationKind, OperationRequest},
        audit::{AuditLevel, AuditLogService, OperationDescriptor, OperationType},
        collections::{CREATED_AT_FIELD, Collection, UPDATED_AT_FIELD},
        integrity::ReferenceValidator,
        records::{errors::DataAccessError, models::Record},
        tenants::{TenantId, resolution::TENANT_FIELD},
    },
    store::{CollectionPath, Document, DocumentStore, FieldFilter, Fields, Query, StoreError},
};

#[async_trait]
pub trait TenantDataService: Send + Sync {
    /// Create a record under a generated id.
    ///
    /// Tenant-scoped records are stamped with the tenant, overriding any value
    /// supplied by the caller.
    async fn create(
        &self,
        scope: &AccessScope,
        collection: Collection,
        tenant: Option<&str>,
        data: Fields,
    ) -> Result<Record, DataAccessError>;

    /// Fetch one record. Records stamped with another tenant are reported as
    /// missing.
    async fn get_by_id(
        &self,
        scope: &AccessScope,
        collection: Collection,
        tenant: Option<&str>,
        id: &str,
    ) -> Result<Option<Record>, DataAccessError>;

    /// Every record of the collection, newest first.
    async fn get_all(
        &self,
        scope: &AccessScope,
        collection: Collection,
        tenant: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, DataAccessError>;

    /// Records matching every filter, newest first.
    async fn get_where(
        &self,
        scope: &AccessScope,
        collection: Collection,
        tenant: Option<&str>,
        filters: Vec<FieldFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, DataAccessError>;

    /// Merge `data` into an existing record and return the result.
    async fn update(
        &self,
        scope: &AccessScope,
        collection: Collection,
        tenant: Option<&str>,
        id: &str,
        data: Fields,
    ) -> Result<Record, DataAccessError>;

    async fn delete(
        &self,
        scope: &AccessScope,
        collection: Collection,
        tenant: Option<&str>,
        id: &str,
    ) -> Result<(), DataAccessError>;
}

/// Where an authorized operation will land.
struct Target {
    collection: Collection,
    path: CollectionPath,
    tenant: Option<TenantId>,
}

#[derive(Clone)]
pub struct StoreTenantDataService {
    store: Arc<dyn DocumentStore>,
    audit: Arc<dyn AuditLogService>,
    references: ReferenceValidator,
    interceptors: InterceptorChain,
}

impl StoreTenantDataService {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        audit: Arc<dyn AuditLogService>,
        interceptors: InterceptorChain,
    ) -> Self {
        Self {
            references: ReferenceValidator::new(Arc::clone(&store)),
            store,
            audit,
            interceptors,
        }
    }

    /// Resolve the target path and run the interceptor chain.
    ///
    /// Nothing touches the store before this succeeds.
    async fn authorize(
        &self,
        kind: OperationKind,
        collection: Collection,
        tenant: Option<&str>,
        scope: &AccessScope,
    ) -> Result<Target, DataAccessError> {
        let requested = if collection.is_isolated() {
            Some(tenant.ok_or(DataAccessError::TenantIdRequired { collection })?)
        } else {
            None
        };

        let request = OperationRequest {
            kind,
            collection,
            tenant: requested,
            scope,
            now: Timestamp::now(),
        };

        if let Err(error) = self.interceptors.run(&request) {
            let parsed = requested.and_then(|raw| TenantId::parse(raw).ok());

            self.record(
                parsed.as_ref(),
                scope,
                OperationDescriptor::new(
                    scope.actor(),
                    OperationType::AccessDenied,
                    collection.as_str(),
                )
                .failed(error.code()),
            )
            .await;

            return Err(error.into());
        }

        let tenant = requested
            .map(TenantId::parse)
            .transpose()
            .map_err(AccessError::InvalidTenantId)?;

        let path = tenant.as_ref().map_or_else(
            || collection.root_path(),
            |tenant| collection.tenant_path(tenant),
        );

        Ok(Target {
            collection,
            path,
            tenant,
        })
    }

    /// Write an audit entry under the resource's tenant, falling back to the
    /// caller's tenant for global collections.
    async fn record(
        &self,
        tenant: Option<&TenantId>,
        scope: &AccessScope,
        descriptor: OperationDescriptor,
    ) {
        let tenant = tenant.or_else(|| {
            scope
                .claims
                .as_ref()
                .and_then(|claims| claims.tenant_id.as_ref())
        });

        match tenant {
            Some(tenant) => {
                self.audit.log_operation(tenant, descriptor).await;
            }
            None => debug!(
                operation = %descriptor.operation,
                resource = %descriptor.resource,
                "no tenant to audit under"
            ),
        }
    }

    async fn report_cross_tenant(
        &self,
        target: &Target,
        scope: &AccessScope,
        kind: OperationKind,
        id: &str,
        found: &str,
    ) {
        warn!(
            collection = %target.collection,
            id,
            found,
            expected = ?target.tenant.as_ref().map(TenantId::as_str),
            "record stamped with a different tenant than its path"
        );

        self.record(
            target.tenant.as_ref(),
            scope,
            OperationDescriptor::new(
                scope.actor(),
                operation_type(kind),
                target.collection.as_str(),
            )
            .resource_id(id)
            .failed("CROSS_TENANT_VIOLATION")
            .level(AuditLevel::Critical),
        )
        .await;
    }

    async fn validate(
        &self,
        target: &Target,
        data: &Fields,
        creating: bool,
    ) -> Result<(), DataAccessError> {
        let spec = target.collection.spec();

        if creating {
            let missing: Vec<&'static str> = spec
                .required_fields
                .iter()
                .copied()
                .filter(|field| data.get(*field).is_none_or(is_blank))
                .collect();

            if !missing.is_empty() {
                return Err(DataAccessError::MissingRequiredFields {
                    collection: target.collection,
                    fields: missing,
                });
            }
        }

        if let Some(tenant) = &target.tenant {
            let errors = self
                .references
                .validate_references(data, spec.references, tenant)
                .await;

            if !errors.is_empty() {
                return Err(DataAccessError::InvalidReferences {
                    collection: target.collection,
                    errors,
                });
            }
        }

        Ok(())
    }

    /// Fetch a record for mutation, enforcing existence and the tenant stamp.
    async fn fetch_owned(
        &self,
        target: &Target,
        scope: &AccessScope,
        kind: OperationKind,
        id: &str,
    ) -> Result<Document, DataAccessError> {
        let existing = self
            .store
            .get(&target.path, id)
            .await?
            .ok_or_else(|| DataAccessError::NotFound {
                collection: target.collection,
                id: id.to_string(),
            })?;

        let Some(expected) = &target.tenant else {
            return Ok(existing);
        };

        if let Err(found) = stamp_check(&existing.data, Some(expected)) {
            self.report_cross_tenant(target, scope, kind, id, &found)
                .await;

            return Err(DataAccessError::CrossTenantViolation {
                collection: target.collection,
                record_id: id.to_string(),
                expected: expected.clone(),
                found,
            });
        }

        Ok(existing)
    }

    async fn list(
        &self,
        scope: &AccessScope,
        collection: Collection,
        tenant: Option<&str>,
        filters: Vec<FieldFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, DataAccessError> {
        let target = self
            .authorize(OperationKind::List, collection, tenant, scope)
            .await?;

        let documents = if filters.is_empty() {
            self.store.list(&target.path).await?
        } else {
            let query = filters
                .into_iter()
                .fold(Query::new(), |query, filter| query.filter(filter));

            self.store.query(&target.path, &query).await?
        };

        let mut records = Vec::with_capacity(documents.len());

        for document in documents {
            if let Err(found) = stamp_check(&document.data, target.tenant.as_ref()) {
                self.report_cross_tenant(&target, scope, OperationKind::List, &document.id, &found)
                    .await;

                continue;
            }

            records.push(Record::from(document));
        }

        records.sort_by_key(|record| std::cmp::Reverse(record.created_at()));

        if let Some(limit) = limit {
            records.truncate(limit);
        }

        Ok(records)
    }
}

#[async_trait]
impl TenantDataService for StoreTenantDataService {
    async fn create(
        &self,
        scope: &AccessScope,
        collection: Collection,
        tenant: Option<&str>,
        mut data: Fields,
    ) -> Result<Record, DataAccessError> {
        let target = self
            .authorize(OperationKind::Create, collection, tenant, scope)
            .await?;

        if let Some(tenant) = &target.tenant {
            data.insert(TENANT_FIELD.to_string(), Value::from(tenant.as_str()));
        }

        self.validate(&target, &data, true).await?;

        let now = Value::from(Timestamp::now().to_string());
        data.insert(CREATED_AT_FIELD.to_string(), now.clone());
        data.insert(UPDATED_AT_FIELD.to_string(), now);

        let created = self.store.create(&target.path, data).await?;

        self.record(
            target.tenant.as_ref(),
            scope,
            OperationDescriptor::new(scope.actor(), OperationType::Create, collection.as_str())
                .resource_id(created.id.as_str())
                .new_data(created.data.clone()),
        )
        .await;

        Ok(created.into())
    }

    async fn get_by_id(
        &self,
        scope: &AccessScope,
        collection: Collection,
        tenant: Option<&str>,
        id: &str,
    ) -> Result<Option<Record>, DataAccessError> {
        let target = self
            .authorize(OperationKind::Read, collection, tenant, scope)
            .await?;

        let Some(document) = self.store.get(&target.path, id).await? else {
            return Ok(None);
        };

        if let Err(found) = stamp_check(&document.data, target.tenant.as_ref()) {
            self.report_cross_tenant(&target, scope, OperationKind::Read, id, &found)
                .await;

            return Ok(None);
        }

        Ok(Some(document.into()))
    }

    async fn get_all(
        &self,
        scope: &AccessScope,
        collection: Collection,
        tenant: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, DataAccessError> {
        self.list(scope, collection, tenant, Vec::new(), limit).await
    }

    async fn get_where(
        &self,
        scope: &AccessScope,
        collection: Collection,
        tenant: Option<&str>,
        filters: Vec<FieldFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, DataAccessError> {
        self.list(scope, collection, tenant, filters, limit).await
    }

    async fn update(
        &self,
        scope: &AccessScope,
        collection: Collection,
        tenant: Option<&str>,
        id: &str,
        mut data: Fields,
    ) -> Result<Record, DataAccessError> {
        let target = self
            .authorize(OperationKind::Update, collection, tenant, scope)
            .await?;

        let existing = self
            .fetch_owned(&target, scope, OperationKind::Update, id)
            .await?;

        data.remove(CREATED_AT_FIELD);

        if let Some(tenant) = &target.tenant {
            data.insert(TENANT_FIELD.to_string(), Value::from(tenant.as_str()));
        }

        self.validate(&target, &data, false).await?;

        data.insert(
            UPDATED_AT_FIELD.to_string(),
            Value::from(Timestamp::now().to_string()),
        );

        let updated = self
            .store
            .update(&target.path, id, data)
            .await
            .map_err(|error| match error {
                StoreError::NotFound => DataAccessError::NotFound {
                    collection,
                    id: id.to_string(),
                },
                other => other.into(),
            })?;

        self.record(
            target.tenant.as_ref(),
            scope,
            OperationDescriptor::new(scope.actor(), OperationType::Update, collection.as_str())
                .resource_id(id)
                .old_data(existing.data)
                .new_data(updated.data.clone()),
        )
        .await;

        Ok(updated.into())
    }

    async fn delete(
        &self,
        scope: &AccessScope,
        collection: Collection,
        tenant: Option<&str>,
        id: &str,
    ) -> Result<(), DataAccessError> {
        let target = self
            .authorize(OperationKind::Delete, collection, tenant, scope)
            .await?;

        if !collection.spec().deletable {
            return Err(DataAccessError::DeletionNotPermitted { collection });
        }

        let existing = self
            .fetch_owned(&target, scope, OperationKind::Delete, id)
            .await?;

        self.store.delete(&target.path, id).await?;

        self.record(
            target.tenant.as_ref(),
            scope,
            OperationDescriptor::new(scope.actor(), OperationType::Delete, collection.as_str())
                .resource_id(id)
                .old_data(existing.data),
        )
        .await;

        Ok(())
    }
}

const fn operation_type(kind: OperationKind) -> OperationType {
    match kind {
        OperationKind::Create => OperationType::Create,
        OperationKind::Read | OperationKind::List => OperationType::Read,
        OperationKind::Update => OperationType::Update,
        OperationKind::Delete => OperationType::Delete,
    }
}

/// Compare a record's tenant stamp with the tenant of its path.
///
/// Global records always pass. Returns the offending stamp on mismatch.
fn stamp_check(data: &Fields, tenant: Option<&TenantId>) -> Result<(), String> {
    let Some(tenant) = tenant else {
        return Ok(());
    };

    match data.get(TENANT_FIELD) {
        Some(Value::String(stamp)) if stamp == tenant.as_str() => Ok(()),
        Some(Value::String(stamp)) => Err(stamp.clone()),
        Some(other) => Err(other.to_string()),
        None => Err("<missing>".to_string()),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}
