use academy_app::domain::tenants::TenantId;
use clap::Args;
use jiff::{SignedDuration, Timestamp};

use crate::cli::config::ConnectionArgs;

#[derive(Debug, Args)]
pub(crate) struct PurgeArgs {
    /// Tenant whose old entries are deleted
    pub tenant_id: TenantId,

    /// Entries older than this many days are deleted
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub retention_days: u32,

    /// Acknowledge that audit entries will be permanently deleted
    #[arg(long, required = true)]
    pub confirm: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub(crate) async fn run(args: PurgeArgs) -> Result<(), String> {
    let ctx = args.connection.context().await?;

    let retention = SignedDuration::from_hours(i64::from(args.retention_days) * 24);

    let report = ctx
        .retention
        .purge(&args.tenant_id, retention, Timestamp::now(), args.confirm)
        .await
        .map_err(|error| format!("audit purge failed: {error}"))?;

    println!("tenant_id: {}", args.tenant_id);
    println!("examined: {}", report.examined);
    println!("purged: {}", report.purged);
    println!("backups_purged: {}", report.backups_purged);

    Ok(())
}
