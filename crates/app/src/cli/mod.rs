use clap::{Parser, Subcommand};

mod audit;
mod cleanup;
mod config;
mod dry_run;
mod migrate;
mod rollback;
mod verify;

use academy_app::observability;

#[derive(Debug, Parser)]
#[command(name = "academy-app", about = "Academy data administration CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    logging: config::LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Migrate a legacy collection, or `all`, into tenant namespaces
    Migrate(migrate::MigrateArgs),

    /// Compare a tenant's legacy documents with its migrated copies
    Verify(verify::VerifyArgs),

    /// Validate legacy documents without writing anything
    DryRunIntegrity(dry_run::DryRunArgs),

    /// Copy a tenant's migrated documents back to the legacy collection
    Rollback(rollback::RollbackArgs),

    /// Delete legacy documents that have been migrated
    Cleanup(cleanup::CleanupArgs),

    /// Inspect and maintain the audit trail
    Audit(audit::AuditCommand),
}

impl Cli {
    pub(crate) fn init_logging(&self) -> Result<(), String> {
        observability::init_logging(&self.logging.log_level, self.logging.log_format)
            .map_err(|error| format!("failed to initialise logging: {error}"))
    }

    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Migrate(args) => migrate::run(args).await,
            Commands::Verify(args) => verify::run(args).await,
            Commands::DryRunIntegrity(args) => dry_run::run(args).await,
            Commands::Rollback(args) => rollback::run(args).await,
            Commands::Cleanup(args) => cleanup::run(args).await,
            Commands::Audit(command) => audit::run(command).await,
        }
    }
}
