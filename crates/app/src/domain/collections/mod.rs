//! Collections
//!
//! Every logical collection the data layer may touch is a [`Collection`] variant.
//! Its static [`CollectionSpec`] says whether it is tenant-isolated, which fields
//! a record must carry and which fields reference other records. Audit
//! collections are absent: they are only reachable through the
//! audit service.

mod registry;

pub use registry::*;

/// Creation timestamp stamped on every record (RFC 3339).
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Last-update timestamp stamped on every record (RFC 3339).
pub const UPDATED_AT_FIELD: &str = "updatedAt";
