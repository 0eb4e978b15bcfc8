//! Tenant isolation tests

use std::sync::Arc;

use academy_app::{
    context::{AppContext, AppSettings},
    domain::{
        access::{AccessError, AccessScope},
        audit::{AuditFilters, OperationType},
        collections::Collection,
        identity::{IdentityClaims, Role},
        records::DataAccessError,
        tenants::TenantId,
    },
    store::{DocumentStore, Fields, MemoryDocumentStore, MockDocumentStore},
};
use jiff::Timestamp;
use serde_json::json;
use testresult::TestResult;

const T1: &str = "academy_0001";
const T2: &str = "academy_0002";

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap_or_default()
}

fn member(user_id: &str, role: Role, tenant: &str) -> TestResult<AccessScope> {
    Ok(AccessScope::for_claims(IdentityClaims {
        user_id: user_id.to_string(),
        email: None,
        role,
        tenant_id: Some(TenantId::parse(tenant)?),
        authenticated_at: Timestamp::now(),
        last_activity: Timestamp::now(),
    }))
}

fn context() -> TestResult<(Arc<MemoryDocumentStore>, AppContext)> {
    let store = Arc::new(MemoryDocumentStore::new());
    let ctx = AppContext::from_store(store.clone(), AppSettings::default())?;

    Ok((store, ctx))
}

#[tokio::test]
async fn records_are_only_visible_to_their_tenant() -> TestResult {
    let (_store, ctx) = context()?;
    let instructor = member("coach-1", Role::Instructor, T1)?;
    let admin_t2 = member("admin-2", Role::Admin, T2)?;

    let created = ctx
        .records
        .create(
            &instructor,
            Collection::Classes,
            Some(T1),
            fields(json!({ "name": "Fundamentals" })),
        )
        .await?;

    let own = ctx
        .records
        .get_all(&instructor, Collection::Classes, Some(T1), None)
        .await?;

    assert_eq!(
        own.iter().map(|record| record.id.as_str()).collect::<Vec<_>>(),
        [created.id.as_str()]
    );

    let other = ctx
        .records
        .get_all(&admin_t2, Collection::Classes, Some(T2), None)
        .await?;

    assert!(other.is_empty(), "tenant 2 saw {other:?}");

    Ok(())
}

#[tokio::test]
async fn members_cannot_reach_into_another_tenant() -> TestResult {
    let (store, ctx) = context()?;
    let instructor = member("coach-1", Role::Instructor, T1)?;

    let result = ctx
        .records
        .create(
            &instructor,
            Collection::Classes,
            Some(T2),
            fields(json!({ "name": "Intruder" })),
        )
        .await;

    assert!(
        matches!(
            result,
            Err(DataAccessError::Access(AccessError::AccessDenied { .. }))
        ),
        "expected AccessDenied, got {result:?}"
    );

    let t2 = TenantId::parse(T2)?;

    assert_eq!(store.count(&Collection::Classes.tenant_path(&t2)).await?, 0);

    let denials = ctx
        .audit
        .get_logs(
            &t2,
            &AuditFilters {
                operation: Some(OperationType::AccessDenied),
                ..AuditFilters::default()
            },
        )
        .await?;

    assert_eq!(denials.len(), 1);
    assert_eq!(denials[0].user_id, "coach-1");

    Ok(())
}

#[tokio::test]
async fn short_tenant_id_fails_before_any_store_call() {
    // No expectations: any store call panics.
    let store = MockDocumentStore::new();

    let ctx = match AppContext::from_store(Arc::new(store), AppSettings::default()) {
        Ok(ctx) => ctx,
        Err(error) => panic!("context should build: {error}"),
    };

    let result = ctx
        .records
        .get_all(&AccessScope::anonymous(), Collection::Classes, Some("abc"), None)
        .await;

    assert!(
        matches!(
            result,
            Err(DataAccessError::Access(AccessError::InvalidTenantId(_)))
        ),
        "expected InvalidTenantId, got {result:?}"
    );
}

#[tokio::test]
async fn students_cannot_run_admin_operations() -> TestResult {
    let (store, ctx) = context()?;
    let student = member("student-1", Role::Student, T1)?.requiring(&[Role::Admin]);

    let result = ctx
        .records
        .create(
            &student,
            Collection::Plans,
            Some(T1),
            fields(json!({ "name": "Monthly", "price": 120 })),
        )
        .await;

    assert!(
        matches!(
            result,
            Err(DataAccessError::Access(AccessError::InsufficientRole {
                actual: Role::Student,
                ..
            }))
        ),
        "expected InsufficientRole, got {result:?}"
    );

    let t1 = TenantId::parse(T1)?;

    assert_eq!(store.count(&Collection::Plans.tenant_path(&t1)).await?, 0);

    Ok(())
}

#[tokio::test]
async fn expired_sessions_are_rejected() -> TestResult {
    let (_store, ctx) = context()?;
    let stale = AccessScope::for_claims(IdentityClaims {
        user_id: "coach-1".to_string(),
        email: None,
        role: Role::Instructor,
        tenant_id: Some(TenantId::parse(T1)?),
        authenticated_at: Timestamp::UNIX_EPOCH,
        last_activity: Timestamp::UNIX_EPOCH,
    });

    let result = ctx
        .records
        .get_all(&stale, Collection::Classes, Some(T1), None)
        .await;

    assert!(
        matches!(
            result,
            Err(DataAccessError::Access(AccessError::Unauthenticated { .. }))
        ),
        "expected Unauthenticated, got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn mutations_leave_an_audit_trail() -> TestResult {
    let (_store, ctx) = context()?;
    let admin = member("admin-1", Role::Admin, T1)?;

    let created = ctx
        .records
        .create(
            &admin,
            Collection::Plans,
            Some(T1),
            fields(json!({ "name": "Monthly", "price": 120 })),
        )
        .await?;

    ctx.records
        .update(
            &admin,
            Collection::Plans,
            Some(T1),
            &created.id,
            fields(json!({ "price": 140 })),
        )
        .await?;

    ctx.records
        .delete(&admin, Collection::Plans, Some(T1), &created.id)
        .await?;

    let entries = ctx
        .audit
        .get_logs(&TenantId::parse(T1)?, &AuditFilters::default())
        .await?;

    let mut operations = entries
        .iter()
        .map(|entry| entry.operation_type)
        .collect::<Vec<_>>();
    operations.sort();

    let mut expected = vec![OperationType::Create, OperationType::Update, OperationType::Delete];
    expected.sort();

    assert_eq!(operations, expected);
    assert!(entries.iter().all(|entry| entry.resource == "plans"));

    Ok(())
}
