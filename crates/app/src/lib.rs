//! Tenant-isolated data access, migration and audit for academy data.

pub mod context;
pub mod database;
pub mod domain;
pub mod observability;
pub mod retry;
pub mod store;

#[cfg(test)]
mod test;
