//! Migration errors.

use thiserror::Error;

use crate::{
    domain::collections::{Collection, UnknownCollection},
    store::StoreError,
};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    UnknownCollection(#[from] UnknownCollection),

    #[error("collection `{collection}` is global and is not migrated")]
    NotTenantScoped { collection: Collection },

    #[error("{operation} requires explicit confirmation")]
    ConfirmationRequired { operation: &'static str },

    #[error("batch size {size} must be between 1 and {max}")]
    InvalidBatchSize { size: usize, max: usize },

    #[error("document store failed")]
    Store(#[from] StoreError),
}
