use academy_app::domain::{
    audit::{AuditFilters, AuditLevel, OperationType},
    tenants::TenantId,
};
use clap::Args;
use jiff::Timestamp;

use crate::cli::config::ConnectionArgs;

#[derive(Debug, Args)]
pub(crate) struct LogsArgs {
    /// Tenant whose entries are listed
    pub tenant_id: TenantId,

    /// Only entries recorded for this user
    #[arg(long)]
    pub user: Option<String>,

    /// Only entries of this operation type (e.g. CREATE, ACCESS_DENIED)
    #[arg(long)]
    pub operation: Option<OperationType>,

    /// Only entries for this resource
    #[arg(long)]
    pub resource: Option<String>,

    /// Only entries at this level
    #[arg(long)]
    pub level: Option<AuditLevel>,

    /// Earliest timestamp (RFC 3339)
    #[arg(long)]
    pub start: Option<Timestamp>,

    /// Latest timestamp (RFC 3339)
    #[arg(long)]
    pub end: Option<Timestamp>,

    /// Maximum entries returned
    #[arg(long, default_value_t = 100)]
    pub limit: usize,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub(crate) async fn run(args: LogsArgs) -> Result<(), String> {
    let ctx = args.connection.context().await?;

    let filters = AuditFilters {
        user_id: args.user,
        operation: args.operation,
        resource: args.resource,
        level: args.level,
        start: args.start,
        end: args.end,
        limit: Some(args.limit),
    };

    let entries = ctx
        .audit
        .get_logs(&args.tenant_id, &filters)
        .await
        .map_err(|error| format!("failed to read audit log: {error}"))?;

    for entry in &entries {
        let outcome = match (&entry.error_code, entry.success) {
            (_, true) => "ok".to_string(),
            (Some(code), false) => code.clone(),
            (None, false) => "failed".to_string(),
        };

        println!(
            "{} {} {} {} {}{} {outcome}",
            entry.timestamp,
            entry.level,
            entry.user_id,
            entry.operation_type,
            entry.resource,
            entry
                .resource_id
                .as_ref()
                .map(|id| format!("/{id}"))
                .unwrap_or_default(),
        );
    }

    println!("entries: {}", entries.len());

    Ok(())
}
