//! Academy Domain Concerns

pub mod access;
pub mod audit;
pub mod collections;
pub mod identity;
pub mod integrity;
pub mod migrations;
pub mod records;
pub mod tenants;
