use clap::Args;

use super::config::ConnectionArgs;

#[derive(Debug, Args)]
pub(crate) struct DryRunArgs {
    /// Maximum documents examined per collection
    #[arg(long)]
    pub sample_size: Option<usize>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub(crate) async fn run(args: DryRunArgs) -> Result<(), String> {
    let ctx = args.connection.context().await?;

    let report = ctx.migrations.dry_run_integrity(args.sample_size).await;

    for collection in &report.collections {
        if let Some(error) = &collection.read_error {
            println!("{}: unreadable ({error})", collection.collection);
            continue;
        }

        println!(
            "{}: sampled={} valid={} errors={}",
            collection.collection,
            collection.sampled,
            collection.valid,
            collection.errors.len()
        );

        for error in &collection.errors {
            let tenant = error.tenant.as_ref().map_or("-", |tenant| tenant.as_str());
            println!("  {} [{tenant}]: {}", error.id, error.reason);
        }
    }

    println!("total_errors: {}", report.total_errors());

    for recommendation in &report.recommendations {
        println!("recommendation: {recommendation}");
    }

    Ok(())
}
