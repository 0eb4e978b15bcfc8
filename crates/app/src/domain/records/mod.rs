//! Tenant-scoped data access.
//!
//! [`TenantDataService`] is the only path application code takes to records.
//! Every call runs the interceptor chain, resolves the physical path from the
//! collection registry and re-checks the tenant stamp of whatever it reads.

pub mod errors;
pub mod models;
pub mod service;

pub use errors::DataAccessError;
pub use models::Record;
pub use service::{StoreTenantDataService, TenantDataService};
