use academy_app::domain::{collections::Collection, migrations::VerificationStatus, tenants::TenantId};
use clap::Args;

use super::config::ConnectionArgs;

#[derive(Debug, Args)]
pub(crate) struct VerifyArgs {
    /// Collection to verify
    pub collection: Collection,

    /// Tenant whose documents are compared
    pub tenant_id: TenantId,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub(crate) async fn run(args: VerifyArgs) -> Result<(), String> {
    let ctx = args.connection.context().await?;

    let migration = ctx
        .migrations
        .migration_for(args.collection)
        .map_err(|error| error.to_string())?;

    let report = ctx
        .migrations
        .verify(migration, &args.tenant_id)
        .await
        .map_err(|error| format!("verification failed: {error}"))?;

    println!("collection: {}", report.collection);
    println!("tenant_id: {}", report.tenant);
    println!("legacy_count: {}", report.legacy_count);
    println!("migrated_count: {}", report.migrated_count);
    println!("status: {}", report.status);

    for id in &report.missing_ids {
        println!("missing: {id}");
    }

    if report.status == VerificationStatus::Inconsistent {
        return Err(format!(
            "{} is inconsistent for tenant {}",
            report.collection, report.tenant
        ));
    }

    Ok(())
}
