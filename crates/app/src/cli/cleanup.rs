use academy_app::domain::collections::Collection;
use clap::Args;

use super::config::ConnectionArgs;

#[derive(Debug, Args)]
pub(crate) struct CleanupArgs {
    /// Legacy collection to prune
    pub collection: Collection,

    /// Acknowledge that migrated legacy documents will be deleted
    #[arg(long, required = true)]
    pub confirm: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub(crate) async fn run(args: CleanupArgs) -> Result<(), String> {
    let ctx = args.connection.context().await?;

    let migration = ctx
        .migrations
        .migration_for(args.collection)
        .map_err(|error| error.to_string())?;

    let report = ctx
        .migrations
        .cleanup(migration, args.confirm)
        .await
        .map_err(|error| format!("cleanup failed: {error}"))?;

    println!("collection: {}", report.collection);
    println!("deleted: {}", report.deleted);
    println!("retained: {}", report.retained);
    println!("batches: {}", report.batches);

    Ok(())
}
