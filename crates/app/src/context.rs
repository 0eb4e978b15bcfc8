//! App Context

use std::sync::Arc;

use jiff::SignedDuration;
use sqlx::migrate::MigrateError;
use thiserror::Error;

use crate::{
    database,
    domain::{
        access::{DEFAULT_SESSION_TIMEOUT, InterceptorChain, TenantValidator},
        audit::{
            AuditLogService, AuditRetentionJob, EmergencyAuditLog, StoreAuditLogService,
            emergency::DEFAULT_EMERGENCY_CAPACITY,
        },
        identity::{AuthSessionManager, ClaimsSource},
        migrations::{DEFAULT_BATCH_SIZE, MigrationEngine, MigrationError},
        records::{StoreTenantDataService, TenantDataService},
    },
    store::{DocumentStore, PgDocumentStore},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to apply database migrations")]
    Migrations(#[source] MigrateError),

    #[error("invalid migration settings")]
    Migration(#[from] MigrationError),
}

/// Library-side settings; the CLI fills them from flags and environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppSettings {
    pub session_timeout: SignedDuration,
    pub migration_batch_size: usize,
    pub emergency_capacity: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            migration_batch_size: DEFAULT_BATCH_SIZE,
            emergency_capacity: DEFAULT_EMERGENCY_CAPACITY,
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub settings: AppSettings,
    pub store: Arc<dyn DocumentStore>,
    pub validator: TenantValidator,
    pub emergency_log: Arc<EmergencyAuditLog>,
    pub audit: Arc<dyn AuditLogService>,
    pub records: Arc<dyn TenantDataService>,
    pub migrations: Arc<MigrationEngine>,
    pub retention: Arc<AuditRetentionJob>,
    pub sessions: Option<Arc<AuthSessionManager>>,
}

impl AppContext {
    /// Wire every service over `store`.
    ///
    /// # Errors
    ///
    /// Returns an error when the migration batch size is out of range.
    pub fn from_store(
        store: Arc<dyn DocumentStore>,
        settings: AppSettings,
    ) -> Result<Self, AppInitError> {
        let validator = TenantValidator::new(settings.session_timeout);
        let emergency_log = Arc::new(EmergencyAuditLog::new(settings.emergency_capacity));

        let audit: Arc<dyn AuditLogService> = Arc::new(StoreAuditLogService::new(
            Arc::clone(&store),
            Arc::clone(&emergency_log),
        ));

        let migrations = MigrationEngine::new(Arc::clone(&store), Arc::clone(&audit))
            .with_batch_size(settings.migration_batch_size)?;

        Ok(Self {
            records: Arc::new(StoreTenantDataService::new(
                Arc::clone(&store),
                Arc::clone(&audit),
                InterceptorChain::with_validator(validator),
            )),
            retention: Arc::new(AuditRetentionJob::new(Arc::clone(&store), Arc::clone(&audit))),
            migrations: Arc::new(migrations),
            settings,
            store,
            validator,
            emergency_log,
            audit,
            sessions: None,
        })
    }

    /// Build application context from a database URL, applying pending
    /// schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error when connecting, migrating or wiring services fails.
    pub async fn from_database_url(url: &str, settings: AppSettings) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        database::run_migrations(&pool)
            .await
            .map_err(AppInitError::Migrations)?;

        Self::from_store(Arc::new(PgDocumentStore::new(pool)), settings)
    }

    /// Attach the session manager for an interactive identity source.
    #[must_use]
    pub fn with_claims_source(mut self, source: Arc<dyn ClaimsSource>) -> Self {
        self.sessions = Some(Arc::new(AuthSessionManager::new(
            source,
            self.settings.session_timeout,
        )));
        self
    }
}
