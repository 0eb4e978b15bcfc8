use std::str::FromStr;

use academy_app::domain::{
    collections::{Collection, UnknownCollection},
    migrations::MigrationReport,
};
use clap::Args;

use super::config::ConnectionArgs;

/// A single collection or the whole plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MigrateTarget {
    All,
    Collection(Collection),
}

impl FromStr for MigrateTarget {
    type Err = UnknownCollection;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "all" {
            return Ok(Self::All);
        }

        value.parse().map(Self::Collection)
    }
}

#[derive(Debug, Args)]
pub(crate) struct MigrateArgs {
    /// Collection name, or `all` for every planned collection
    pub target: MigrateTarget,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub(crate) async fn run(args: MigrateArgs) -> Result<(), String> {
    let ctx = args.connection.context().await?;

    let reports = match args.target {
        MigrateTarget::All => ctx.migrations.migrate_all().await,
        MigrateTarget::Collection(collection) => {
            let migration = ctx
                .migrations
                .migration_for(collection)
                .map_err(|error| error.to_string())?;

            ctx.migrations.migrate(migration).await.map(|report| vec![report])
        }
    }
    .map_err(|error| format!("migration failed: {error}"))?;

    for report in &reports {
        print_report(report);
    }

    let failed: usize = reports.iter().map(|report| report.errors).sum();

    if failed > 0 {
        return Err(format!("migration finished with {failed} errors"));
    }

    Ok(())
}

fn print_report(report: &MigrationReport) {
    println!("collection: {}", report.collection);
    println!("phase: {}", report.phase);
    println!("processed: {}", report.processed);
    println!("migrated: {}", report.migrated);
    println!("skipped: {}", report.skipped);
    println!("errors: {}", report.errors);

    for skipped in &report.skipped_details {
        println!("skipped_document: {} ({})", skipped.id, skipped.reason);
    }

    for detail in &report.error_details {
        println!("error: {detail}");
    }

    for verification in &report.verifications {
        println!(
            "verification: {} {} legacy={} migrated={}",
            verification.tenant,
            verification.status,
            verification.legacy_count,
            verification.migrated_count
        );
    }

    println!();
}
