//! Document store access.
//!
//! The store is an opaque, schemaless collection/document engine. Everything above
//! this module talks to it through [`DocumentStore`], which only promises atomic
//! batches, equality and array-membership filters, and eventually consistent
//! listing. Compound filtering with ordering is not relied upon.

mod errors;
mod memory;
mod models;
mod postgres;

use async_trait::async_trait;
use mockall::automock;

pub use errors::StoreError;
pub use memory::MemoryDocumentStore;
pub use models::*;
pub use postgres::PgDocumentStore;

#[automock]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a single document, `None` when it does not exist.
    async fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Document>, StoreError>;

    /// List every document of a collection.
    async fn list(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError>;

    /// Run a filtered query against a collection.
    async fn query(&self, path: &CollectionPath, query: &Query)
    -> Result<Vec<Document>, StoreError>;

    /// Insert a document under a store-generated id.
    async fn create(&self, path: &CollectionPath, data: Fields) -> Result<Document, StoreError>;

    /// Create or fully replace the document with the given id.
    async fn set(&self, path: &CollectionPath, id: &str, data: Fields) -> Result<(), StoreError>;

    /// Merge fields into an existing document and return the merged result.
    async fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        data: Fields,
    ) -> Result<Document, StoreError>;

    /// Remove a document. Removing a missing document is not an error.
    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), StoreError>;

    /// Number of documents in a collection.
    async fn count(&self, path: &CollectionPath) -> Result<u64, StoreError>;

    /// Apply all operations atomically, or none of them.
    async fn commit_batch(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;
}

/// Generate an id for a new document.
pub(crate) fn generate_document_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}
