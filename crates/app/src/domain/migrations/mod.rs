//! Migration of legacy, tenant-less collections into tenant namespaces.
//!
//! A migration is stateless: it reads the legacy root collection, groups
//! documents by the tenant they name, validates them and writes copies under
//! `tenant/{tenantId}/{collection}` with the source id preserved. Running it
//! again rewrites identical documents. Legacy data is only removed by an
//! explicit, confirmed cleanup.

pub mod engine;
pub mod errors;
pub mod models;
pub mod plan;

pub use engine::{DEFAULT_BATCH_SIZE, MIGRATION_ACTOR, MigrationEngine};
pub use errors::MigrationError;
pub use models::*;
pub use plan::{CollectionMigration, MigrationPlan};
