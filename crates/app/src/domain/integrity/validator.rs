//! Reference validation.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::{
    domain::{
        collections::{Collection, ReferenceConstraint},
        tenants::{
            TenantId,
            resolution::{TenantResolution, resolve_tenant},
        },
    },
    store::{CollectionPath, Document, DocumentStore, Fields, StoreError},
};

/// Checks that reference fields point at records visible to the same tenant.
///
/// Validation never fails as a whole: every problem, store failures included,
/// becomes one human-readable message in the returned list.
#[derive(Clone)]
pub struct ReferenceValidator {
    store: Arc<dyn DocumentStore>,
    legacy_fallback: bool,
}

enum Lookup {
    Found,
    Missing,
    OtherTenant(Option<String>),
}

impl ReferenceValidator {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            legacy_fallback: false,
        }
    }

    /// Also accept tenant-scoped targets still sitting in their legacy root
    /// collection, provided they resolve to the same tenant.
    #[must_use]
    pub fn with_legacy_fallback(mut self) -> Self {
        self.legacy_fallback = true;
        self
    }

    pub async fn validate_references(
        &self,
        record: &Fields,
        constraints: &[ReferenceConstraint],
        tenant: &TenantId,
    ) -> Vec<String> {
        let mut errors = Vec::new();

        for constraint in constraints {
            let id = match record.get(constraint.field) {
                None | Some(Value::Null) => continue,
                Some(Value::String(id)) if id.trim().is_empty() => continue,
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                Some(other) => {
                    errors.push(format!(
                        "{}: expected a record id, found {other}",
                        constraint.field
                    ));
                    continue;
                }
            };

            match self.lookup(constraint.target, &id, tenant).await {
                Ok(Lookup::Found) => {}
                Ok(Lookup::Missing) => errors.push(format!(
                    "{}: referenced {} `{id}` does not exist",
                    constraint.field, constraint.target
                )),
                Ok(Lookup::OtherTenant(owner)) => errors.push(format!(
                    "{}: referenced {} `{id}` belongs to tenant `{}`",
                    constraint.field,
                    constraint.target,
                    owner.as_deref().unwrap_or("unknown")
                )),
                Err(error) => {
                    warn!(field = constraint.field, %id, "reference lookup failed: {error}");

                    errors.push(format!(
                        "{}: could not check {} `{id}`: {error}",
                        constraint.field, constraint.target
                    ));
                }
            }
        }

        errors
    }

    async fn lookup(
        &self,
        target: Collection,
        id: &str,
        tenant: &TenantId,
    ) -> Result<Lookup, StoreError> {
        if !target.is_isolated() {
            return Ok(self
                .fetch(&target.root_path(), id)
                .await?
                .map_or(Lookup::Missing, |doc| owned_by(&doc, tenant, true)));
        }

        if let Some(doc) = self.fetch(&target.tenant_path(tenant), id).await? {
            return Ok(owned_by(&doc, tenant, true));
        }

        if !self.legacy_fallback {
            return Ok(Lookup::Missing);
        }

        Ok(self
            .fetch(&target.root_path(), id)
            .await?
            .map_or(Lookup::Missing, |doc| owned_by(&doc, tenant, false)))
    }

    async fn fetch(
        &self,
        path: &CollectionPath,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        self.store.get(path, id).await
    }
}

/// Whether `doc` belongs to `tenant`. Documents without any tenant field pass
/// only when `untagged_ok` is set.
fn owned_by(doc: &Document, tenant: &TenantId, untagged_ok: bool) -> Lookup {
    match resolve_tenant(&doc.data) {
        TenantResolution::Resolved(owner) if owner == tenant.as_str() => Lookup::Found,
        TenantResolution::Resolved(owner) => Lookup::OtherTenant(Some(owner)),
        TenantResolution::Missing if untagged_ok => Lookup::Found,
        TenantResolution::Missing | TenantResolution::Conflicting(_) => Lookup::OtherTenant(None),
    }
}
