use academy_app::domain::tenants::TenantId;
use clap::Args;
use jiff::Timestamp;

use crate::cli::config::ConnectionArgs;

#[derive(Debug, Args)]
pub(crate) struct ReportArgs {
    /// Tenant to report on
    pub tenant_id: TenantId,

    /// Window start (RFC 3339)
    #[arg(long)]
    pub start: Timestamp,

    /// Window end (RFC 3339)
    #[arg(long)]
    pub end: Timestamp,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub(crate) async fn run(args: ReportArgs) -> Result<(), String> {
    let ctx = args.connection.context().await?;

    let report = ctx
        .audit
        .generate_audit_report(&args.tenant_id, args.start, args.end)
        .await
        .map_err(|error| format!("failed to build audit report: {error}"))?;

    println!("tenant_id: {}", report.tenant_id);
    println!("start: {}", report.start);
    println!("end: {}", report.end);
    println!("total_operations: {}", report.total_operations);
    println!("failed_operations: {}", report.failed_operations);
    println!("error_rate: {:.2}%", report.error_rate * 100.0);

    for (level, count) in &report.by_level {
        println!("level.{level}: {count}");
    }

    for (operation, count) in &report.by_operation {
        println!("operation.{operation}: {count}");
    }

    for (resource, count) in &report.by_resource {
        println!("resource.{resource}: {count}");
    }

    for (user, count) in &report.by_user {
        println!("user.{user}: {count}");
    }

    println!("security_events: {}", report.security_events.len());

    for event in &report.security_events {
        println!(
            "  {} {:?} {} {}",
            event.timestamp, event.kind, event.user_id, event.entry_id
        );
    }

    for recommendation in &report.recommendations {
        println!("recommendation: {recommendation}");
    }

    Ok(())
}
