//! Record models.

use jiff::Timestamp;
use serde_json::Value;

use crate::{
    domain::{collections::CREATED_AT_FIELD, tenants::resolution::TENANT_FIELD},
    store::{Document, Fields},
};

/// A record as returned to application code.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub data: Fields,
}

impl Record {
    /// The denormalized tenant stamp, if any.
    #[must_use]
    pub fn tenant_stamp(&self) -> Option<&str> {
        self.data.get(TENANT_FIELD).and_then(Value::as_str)
    }

    /// Creation time, `None` when absent or unparseable.
    #[must_use]
    pub fn created_at(&self) -> Option<Timestamp> {
        self.data
            .get(CREATED_AT_FIELD)
            .and_then(Value::as_str)
            .and_then(|value| value.parse().ok())
    }
}

impl From<Document> for Record {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            data: document.data,
        }
    }
}
