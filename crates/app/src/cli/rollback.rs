use academy_app::domain::{collections::Collection, tenants::TenantId};
use clap::Args;

use super::config::ConnectionArgs;

#[derive(Debug, Args)]
pub(crate) struct RollbackArgs {
    /// Collection to roll back
    pub collection: Collection,

    /// Tenant whose migrated documents are copied back
    pub tenant_id: TenantId,

    /// Acknowledge that legacy documents will be overwritten
    #[arg(long, required = true)]
    pub confirm: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub(crate) async fn run(args: RollbackArgs) -> Result<(), String> {
    let ctx = args.connection.context().await?;

    let migration = ctx
        .migrations
        .migration_for(args.collection)
        .map_err(|error| error.to_string())?;

    let report = ctx
        .migrations
        .rollback(migration, &args.tenant_id, args.confirm)
        .await
        .map_err(|error| format!("rollback failed: {error}"))?;

    println!("collection: {}", report.collection);
    println!("tenant_id: {}", report.tenant);
    println!("restored: {}", report.restored);
    println!("untouched: {}", report.untouched);

    Ok(())
}
