//! Document store models.

use std::{
    cmp::Ordering,
    fmt::{Display, Formatter, Result as FmtResult},
};

use serde_json::{Map, Value};

use crate::domain::tenants::TenantId;

/// Field map of a schemaless document.
pub type Fields = Map<String, Value>;

/// Largest number of operations the store accepts in one atomic batch.
pub const MAX_BATCH_OPERATIONS: usize = 500;

/// Physical address of a collection inside the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Path segment under which every tenant namespace lives.
    pub const TENANT_ROOT: &'static str = "tenant";

    /// Root-level collection, used for global and legacy data.
    #[must_use]
    pub fn root(collection: &str) -> Self {
        Self(collection.to_string())
    }

    /// Collection inside a tenant namespace: `tenant/{tenant}/{collection}`.
    #[must_use]
    pub fn tenant(tenant: &TenantId, collection: &str) -> Self {
        Self(format!("{}/{tenant}/{collection}", Self::TENANT_ROOT))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    #[must_use]
    pub fn new(id: impl Into<String>, data: Fields) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(Value::as_str)
    }
}

/// Filters the store is able to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    /// `field == value`
    Equals { field: String, value: Value },

    /// `field` is an array containing `value`.
    ArrayContains { field: String, value: Value },
}

impl FieldFilter {
    #[must_use]
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ArrayContains {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Evaluate the filter against a document's fields.
    #[must_use]
    pub fn matches(&self, data: &Fields) -> bool {
        match self {
            Self::Equals { field, value } => data.get(field) == Some(value),
            Self::ArrayContains { field, value } => data
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Filtered, optionally ordered and limited read of one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn matches(&self, data: &Fields) -> bool {
        self.filters.iter().all(|filter| filter.matches(data))
    }
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOperation {
    /// Create or fully replace a document.
    Set {
        path: CollectionPath,
        id: String,
        data: Fields,
    },

    /// Remove a document; missing documents are ignored.
    Delete { path: CollectionPath, id: String },
}

/// Total order over optional JSON values used for sorting query results.
///
/// Missing and `null` values sort first, then booleans, numbers, strings and
/// anything else (compared by its serialized form).
#[must_use]
pub fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_) | Value::Object(_)) => 4,
        }
    }

    match (left, right) {
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (
            Some(a @ (Value::Array(_) | Value::Object(_))),
            Some(b @ (Value::Array(_) | Value::Object(_))),
        ) => a.to_string().cmp(&b.to_string()),
        _ => rank(left).cmp(&rank(right)),
    }
}
