use std::sync::Arc;

use academy_app::{
    context::{AppContext, AppSettings},
    domain::{
        access::DEFAULT_SESSION_TIMEOUT, audit::emergency::DEFAULT_EMERGENCY_CAPACITY,
        migrations::DEFAULT_BATCH_SIZE,
    },
    observability::LogFormat,
};
use clap::Args;
use jiff::SignedDuration;

/// Logging settings.
#[derive(Debug, Args)]
pub(crate) struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(
        long,
        env = "LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Compact,
        global = true
    )]
    pub log_format: LogFormat,
}

/// Connection and service settings shared by every command.
#[derive(Debug, Args)]
pub(crate) struct ConnectionArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Minutes after authentication before claims are considered stale
    #[arg(
        long,
        env = "SESSION_TIMEOUT_MINUTES",
        default_value_t = DEFAULT_SESSION_TIMEOUT.as_mins()
    )]
    session_timeout_minutes: i64,

    /// Documents per migration batch (1-500)
    #[arg(long, env = "MIGRATION_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    migration_batch_size: usize,

    /// Audit entries kept in memory when the store rejects them
    #[arg(long, env = "AUDIT_EMERGENCY_CAPACITY", default_value_t = DEFAULT_EMERGENCY_CAPACITY)]
    audit_emergency_capacity: usize,
}

impl ConnectionArgs {
    pub(crate) fn settings(&self) -> AppSettings {
        AppSettings {
            session_timeout: SignedDuration::from_mins(self.session_timeout_minutes),
            migration_batch_size: self.migration_batch_size,
            emergency_capacity: self.audit_emergency_capacity,
        }
    }

    pub(crate) async fn context(&self) -> Result<Arc<AppContext>, String> {
        AppContext::from_database_url(&self.database_url, self.settings())
            .await
            .map(Arc::new)
            .map_err(|error| format!("failed to initialise application: {error}"))
    }
}
