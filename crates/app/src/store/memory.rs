//! In-memory document store.
//!
//! Collections are kept in ordered maps behind a tokio `RwLock`, so listing is
//! deterministic (by document id) and batches apply under a single write lock.
//! Nothing is durable; this backs tests and local dry runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{
    BatchOperation, CollectionPath, DocumentStore, Document, Fields, MAX_BATCH_OPERATIONS, Query,
    SortDirection, StoreError, compare_values, generate_document_id,
};

type Documents = BTreeMap<String, Fields>;

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<BTreeMap<CollectionPath, Documents>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of every non-empty collection.
    pub async fn paths(&self) -> Vec<CollectionPath> {
        self.collections
            .read()
            .await
            .iter()
            .filter(|(_, documents)| !documents.is_empty())
            .map(|(path, _)| path.clone())
            .collect()
    }
}

fn to_documents(collection: Option<&Documents>) -> Vec<Document> {
    collection
        .map(|documents| {
            documents
                .iter()
                .map(|(id, data)| Document::new(id.clone(), data.clone()))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(path)
            .and_then(|documents| documents.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn list(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        Ok(to_documents(self.collections.read().await.get(path)))
    }

    async fn query(
        &self,
        path: &CollectionPath,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        let mut documents: Vec<Document> = to_documents(self.collections.read().await.get(path))
            .into_iter()
            .filter(|document| query.matches(&document.data))
            .collect();

        if let Some(order) = &query.order_by {
            documents.sort_by(|a, b| {
                let ordering = compare_values(a.data.get(&order.field), b.data.get(&order.field));

                match order.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            documents.truncate(limit);
        }

        Ok(documents)
    }

    async fn create(&self, path: &CollectionPath, data: Fields) -> Result<Document, StoreError> {
        let id = generate_document_id();
        let mut collections = self.collections.write().await;
        let documents = collections.entry(path.clone()).or_default();

        if documents.contains_key(&id) {
            return Err(StoreError::AlreadyExists);
        }

        documents.insert(id.clone(), data.clone());

        Ok(Document::new(id, data))
    }

    async fn set(&self, path: &CollectionPath, id: &str, data: Fields) -> Result<(), StoreError> {
        self.collections
            .write()
            .await
            .entry(path.clone())
            .or_default()
            .insert(id.to_string(), data);

        Ok(())
    }

    async fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        data: Fields,
    ) -> Result<Document, StoreError> {
        let mut collections = self.collections.write().await;

        let existing = collections
            .get_mut(path)
            .and_then(|documents| documents.get_mut(id))
            .ok_or(StoreError::NotFound)?;

        existing.extend(data);

        Ok(Document::new(id, existing.clone()))
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), StoreError> {
        if let Some(documents) = self.collections.write().await.get_mut(path) {
            documents.remove(id);
        }

        Ok(())
    }

    async fn count(&self, path: &CollectionPath) -> Result<u64, StoreError> {
        let count = self
            .collections
            .read()
            .await
            .get(path)
            .map_or(0, BTreeMap::len);

        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn commit_batch(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        if operations.len() > MAX_BATCH_OPERATIONS {
            return Err(StoreError::BatchTooLarge {
                size: operations.len(),
                max: MAX_BATCH_OPERATIONS,
            });
        }

        let mut collections = self.collections.write().await;

        for operation in operations {
            match operation {
                BatchOperation::Set { path, id, data } => {
                    collections.entry(path).or_default().insert(id, data);
                }
                BatchOperation::Delete { path, id } => {
                    if let Some(documents) = collections.get_mut(&path) {
                        documents.remove(&id);
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use crate::{store::FieldFilter, test::helpers::fields};

    use super::*;

    fn classes() -> CollectionPath {
        CollectionPath::root("classes")
    }

    #[tokio::test]
    async fn create_then_get_returns_document() -> TestResult {
        let store = MemoryDocumentStore::new();

        let created = store
            .create(&classes(), fields(json!({ "name": "Kids BJJ" })))
            .await?;

        let fetched = store.get(&classes(), &created.id).await?;

        assert_eq!(fetched, Some(created));

        Ok(())
    }

    #[tokio::test]
    async fn get_unknown_document_returns_none() -> TestResult {
        let store = MemoryDocumentStore::new();

        assert!(store.get(&classes(), "missing").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn update_merges_fields() -> TestResult {
        let store = MemoryDocumentStore::new();

        store
            .set(&classes(), "c1", fields(json!({ "name": "Judo", "level": 1 })))
            .await?;

        let merged = store
            .update(&classes(), "c1", fields(json!({ "level": 2 })))
            .await?;

        assert_eq!(merged.data, fields(json!({ "name": "Judo", "level": 2 })));

        Ok(())
    }

    #[tokio::test]
    async fn update_missing_document_fails() {
        let store = MemoryDocumentStore::new();

        let result = store
            .update(&classes(), "missing", fields(json!({ "level": 2 })))
            .await;

        assert!(
            matches!(result, Err(StoreError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn query_filters_orders_and_limits() -> TestResult {
        let store = MemoryDocumentStore::new();

        for (id, rank, status) in [("a", 3, "active"), ("b", 1, "active"), ("c", 2, "paused")] {
            store
                .set(&classes(), id, fields(json!({ "rank": rank, "status": status })))
                .await?;
        }

        let results = store
            .query(
                &classes(),
                &Query::new()
                    .filter(FieldFilter::equals("status", "active"))
                    .order_by("rank", SortDirection::Descending)
                    .limit(1),
            )
            .await?;

        let ids: Vec<&str> = results.iter().map(|doc| doc.id.as_str()).collect();

        assert_eq!(ids, vec!["a"]);

        Ok(())
    }

    #[tokio::test]
    async fn collections_are_independent_per_path() -> TestResult {
        let store = MemoryDocumentStore::new();

        store
            .set(&CollectionPath::root("a"), "1", fields(json!({})))
            .await?;

        assert_eq!(store.count(&CollectionPath::root("a")).await?, 1);
        assert_eq!(store.count(&CollectionPath::root("b")).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_without_writes() -> TestResult {
        let store = MemoryDocumentStore::new();

        let operations = (0..=MAX_BATCH_OPERATIONS)
            .map(|index| BatchOperation::Set {
                path: classes(),
                id: index.to_string(),
                data: Fields::new(),
            })
            .collect();

        let result = store.commit_batch(operations).await;

        assert!(
            matches!(result, Err(StoreError::BatchTooLarge { .. })),
            "expected BatchTooLarge, got {result:?}"
        );
        assert_eq!(store.count(&classes()).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn batch_applies_sets_and_deletes() -> TestResult {
        let store = MemoryDocumentStore::new();

        store.set(&classes(), "old", fields(json!({}))).await?;

        store
            .commit_batch(vec![
                BatchOperation::Set {
                    path: classes(),
                    id: "new".to_string(),
                    data: fields(json!({ "name": "Boxing" })),
                },
                BatchOperation::Delete {
                    path: classes(),
                    id: "old".to_string(),
                },
            ])
            .await?;

        assert!(store.get(&classes(), "old").await?.is_none());
        assert!(store.get(&classes(), "new").await?.is_some());

        Ok(())
    }
}
