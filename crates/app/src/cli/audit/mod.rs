use clap::{Args, Subcommand};

mod logs;
mod purge;
mod report;

#[derive(Debug, Args)]
pub(crate) struct AuditCommand {
    #[command(subcommand)]
    command: AuditSubcommand,
}

#[derive(Debug, Subcommand)]
enum AuditSubcommand {
    /// List a tenant's audit entries, newest first
    Logs(logs::LogsArgs),

    /// Summarise a tenant's audit entries over a time window
    Report(report::ReportArgs),

    /// Delete entries older than the retention horizon
    Purge(purge::PurgeArgs),
}

pub(crate) async fn run(command: AuditCommand) -> Result<(), String> {
    match command.command {
        AuditSubcommand::Logs(args) => logs::run(args).await,
        AuditSubcommand::Report(args) => report::run(args).await,
        AuditSubcommand::Purge(args) => purge::run(args).await,
    }
}
