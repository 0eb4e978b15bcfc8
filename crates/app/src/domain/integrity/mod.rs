//! Referential integrity between records.

mod validator;

pub use validator::ReferenceValidator;
