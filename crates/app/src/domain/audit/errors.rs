//! Audit errors.

use jiff::Timestamp;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit storage failed")]
    Store(#[from] StoreError),

    #[error("report range is empty: {start} is after {end}")]
    InvalidRange { start: Timestamp, end: Timestamp },

    #[error("retention horizon must be positive")]
    InvalidRetention,

    #[error("purging audit entries requires explicit confirmation")]
    ConfirmationRequired,
}
