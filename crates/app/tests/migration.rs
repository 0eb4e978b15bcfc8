//! Legacy migration tests

use std::sync::Arc;

use academy_app::{
    context::{AppContext, AppSettings},
    domain::{
        audit::{AuditFilters, OperationType},
        collections::Collection,
        migrations::{CollectionMigration, SkipReason, VerificationStatus},
        tenants::TenantId,
    },
    store::{DocumentStore, Fields, MemoryDocumentStore},
};
use serde_json::json;
use testresult::TestResult;

const T1: &str = "academy_0001";
const T2: &str = "academy_0002";

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap_or_default()
}

async fn seeded() -> TestResult<(Arc<MemoryDocumentStore>, AppContext)> {
    let store = Arc::new(MemoryDocumentStore::new());

    for student in ["ana", "bruno"] {
        store
            .set(
                &Collection::Users.root_path(),
                student,
                fields(json!({ "email": format!("{student}@example.com"), "role": "student" })),
            )
            .await?;
    }

    let ctx = AppContext::from_store(store.clone(), AppSettings::default())?;

    Ok((store, ctx))
}

async fn legacy(
    store: &MemoryDocumentStore,
    collection: Collection,
    id: &str,
    data: serde_json::Value,
) -> TestResult {
    store.set(&collection.root_path(), id, fields(data)).await?;

    Ok(())
}

#[tokio::test]
async fn payment_without_tenant_is_skipped_and_never_migrated() -> TestResult {
    let (store, ctx) = seeded().await?;

    legacy(
        &store,
        Collection::Payments,
        "pay-1",
        json!({ "academiaId": T1, "studentId": "ana", "planId": "", "amount": 120 }),
    )
    .await?;
    legacy(
        &store,
        Collection::Payments,
        "pay-orphan",
        json!({ "studentId": "bruno", "amount": 90 }),
    )
    .await?;

    let report = ctx
        .migrations
        .migrate(CollectionMigration::same(Collection::Payments))
        .await?;

    assert_eq!(report.processed, 2);
    assert_eq!(report.migrated, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.errors, 0);
    assert_eq!(report.skipped_details[0].id, "pay-orphan");
    assert_eq!(report.skipped_details[0].reason, SkipReason::MissingTenant);

    for tenant in [T1, T2] {
        let path = Collection::Payments.tenant_path(&TenantId::parse(tenant)?);

        assert_eq!(store.get(&path, "pay-orphan").await?, None);
    }

    let migrated = store
        .get(
            &Collection::Payments.tenant_path(&TenantId::parse(T1)?),
            "pay-1",
        )
        .await?
        .ok_or("pay-1 should be migrated")?;

    assert_eq!(migrated.str_field("tenantId"), Some(T1));

    Ok(())
}

#[tokio::test]
async fn dangling_reference_fails_dry_run_and_migration_alike() -> TestResult {
    let (store, ctx) = seeded().await?;

    legacy(
        &store,
        Collection::CheckIns,
        "check-1",
        json!({ "gymId": T1, "studentId": "ana" }),
    )
    .await?;
    legacy(
        &store,
        Collection::CheckIns,
        "check-ghost",
        json!({ "gymId": T1, "studentId": "ghost" }),
    )
    .await?;

    let integrity = ctx.migrations.dry_run_integrity(None).await;

    let check_ins = integrity
        .collections
        .iter()
        .find(|collection| collection.collection == Collection::CheckIns)
        .ok_or("check-ins should be reported")?;

    assert_eq!(check_ins.sampled, 2);
    assert_eq!(check_ins.valid, 1);
    assert_eq!(check_ins.errors.len(), 1);
    assert_eq!(check_ins.errors[0].id, "check-ghost");
    assert_eq!(integrity.total_errors(), 1);

    let tenant = TenantId::parse(T1)?;
    let path = Collection::CheckIns.tenant_path(&tenant);

    assert_eq!(store.count(&path).await?, 0, "dry run must not write");

    let report = ctx
        .migrations
        .migrate(CollectionMigration::same(Collection::CheckIns))
        .await?;

    assert_eq!(report.migrated, 1);
    assert_eq!(report.skipped, 1);
    assert!(
        matches!(
            report.skipped_details[0].reason,
            SkipReason::InvalidReferences(_)
        ),
        "unexpected skip {:?}",
        report.skipped_details[0]
    );
    assert_eq!(store.get(&path, "check-ghost").await?, None);

    Ok(())
}

#[tokio::test]
async fn rerunning_a_migration_changes_nothing() -> TestResult {
    let (store, ctx) = seeded().await?;

    for (id, tenant) in [("c-1", T1), ("c-2", T1), ("c-3", T2)] {
        legacy(
            &store,
            Collection::Classes,
            id,
            json!({ "academiaId": tenant, "name": format!("Class {id}") }),
        )
        .await?;
    }

    let migration = CollectionMigration::same(Collection::Classes);
    let first = ctx.migrations.migrate(migration).await?;

    let t1 = Collection::Classes.tenant_path(&TenantId::parse(T1)?);
    let t2 = Collection::Classes.tenant_path(&TenantId::parse(T2)?);
    let before = (store.list(&t1).await?, store.list(&t2).await?);

    let second = ctx.migrations.migrate(migration).await?;
    let after = (store.list(&t1).await?, store.list(&t2).await?);

    assert_eq!(first.migrated, 3);
    assert_eq!(second.migrated, 3);
    assert!(second.is_success());
    assert_eq!(before, after);

    for tenant in [T1, T2] {
        let verification = ctx
            .migrations
            .verify(migration, &TenantId::parse(tenant)?)
            .await?;

        assert_eq!(verification.status, VerificationStatus::Consistent);
    }

    Ok(())
}

#[tokio::test]
async fn rollback_then_cleanup_round_trip() -> TestResult {
    let (store, ctx) = seeded().await?;
    let tenant = TenantId::parse(T1)?;

    legacy(
        &store,
        Collection::Plans,
        "plan-1",
        json!({ "academiaId": T1, "name": "Monthly", "price": 120 }),
    )
    .await?;
    legacy(
        &store,
        Collection::Plans,
        "plan-unowned",
        json!({ "name": "Drop-in", "price": 30 }),
    )
    .await?;

    let migration = CollectionMigration::same(Collection::Plans);
    ctx.migrations.migrate(migration).await?;

    store
        .delete(&Collection::Plans.root_path(), "plan-1")
        .await?;

    let rollback = ctx.migrations.rollback(migration, &tenant, true).await?;

    assert_eq!(rollback.restored, 1);

    let restored = store
        .get(&Collection::Plans.root_path(), "plan-1")
        .await?
        .ok_or("plan-1 should be restored")?;

    assert_eq!(restored.str_field("name"), Some("Monthly"));
    assert_eq!(
        store.count(&Collection::Plans.tenant_path(&tenant)).await?,
        1,
        "rollback keeps the tenant copy"
    );

    let cleanup = ctx.migrations.cleanup(migration, true).await?;

    assert_eq!(cleanup.deleted, 1);
    assert_eq!(cleanup.retained, 1);
    assert_eq!(store.get(&Collection::Plans.root_path(), "plan-1").await?, None);
    assert!(
        store
            .get(&Collection::Plans.root_path(), "plan-unowned")
            .await?
            .is_some()
    );

    let trail = ctx
        .audit
        .get_logs(&tenant, &AuditFilters::default())
        .await?;

    for operation in [
        OperationType::Migration,
        OperationType::Rollback,
        OperationType::Cleanup,
    ] {
        assert!(
            trail.iter().any(|entry| entry.operation_type == operation),
            "missing {operation} entry"
        );
    }

    Ok(())
}

#[tokio::test]
async fn destructive_operations_require_confirmation() -> TestResult {
    let (_store, ctx) = seeded().await?;
    let migration = CollectionMigration::same(Collection::Classes);

    assert!(
        ctx.migrations
            .rollback(migration, &TenantId::parse(T1)?, false)
            .await
            .is_err()
    );
    assert!(ctx.migrations.cleanup(migration, false).await.is_err());

    Ok(())
}
