//! Tenant identifier errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantIdError {
    #[error("tenant id `{value}` has {length} characters, expected 10 to 50")]
    Length { value: String, length: usize },

    #[error("tenant id `{value}` contains invalid character `{character}`")]
    Character { value: String, character: char },
}
