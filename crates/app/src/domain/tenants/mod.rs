//! Tenants

pub mod errors;
pub mod records;
pub mod resolution;

pub use errors::TenantIdError;
pub use records::TenantId;
