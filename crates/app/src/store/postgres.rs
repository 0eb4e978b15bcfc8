//! PostgreSQL-backed document store.
//!
//! Every document is one row of the `documents` table keyed by
//! `(collection_path, document_id)` with its fields in a JSONB column.

use async_trait::async_trait;
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use serde_json::Value;
use sqlx::{
    FromRow, PgPool, Postgres, QueryBuilder, Row, postgres::PgRow, query, query_as,
    query_scalar, types::Json,
};

use crate::store::{
    BatchOperation, CollectionPath, Document, DocumentStore, FieldFilter, Fields,
    MAX_BATCH_OPERATIONS, Query, SortDirection, StoreError, generate_document_id,
};

const GET_DOCUMENT_SQL: &str = include_str!("sql/get_document.sql");
const LIST_DOCUMENTS_SQL: &str = include_str!("sql/list_documents.sql");
const INSERT_DOCUMENT_SQL: &str = include_str!("sql/insert_document.sql");
const UPSERT_DOCUMENT_SQL: &str = include_str!("sql/upsert_document.sql");
const MERGE_DOCUMENT_SQL: &str = include_str!("sql/merge_document.sql");
const DELETE_DOCUMENT_SQL: &str = include_str!("sql/delete_document.sql");
const COUNT_DOCUMENTS_SQL: &str = include_str!("sql/count_documents.sql");

#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Document>, StoreError> {
        query_as::<Postgres, Document>(GET_DOCUMENT_SQL)
            .bind(path.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn list(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        query_as::<Postgres, Document>(LIST_DOCUMENTS_SQL)
            .bind(path.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn query(
        &self,
        path: &CollectionPath,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT document_id, data FROM documents WHERE collection_path = ",
        );

        builder.push_bind(path.as_str().to_string());

        for filter in &query.filters {
            match filter {
                FieldFilter::Equals { field, value } => {
                    builder
                        .push(" AND data -> ")
                        .push_bind(field.clone())
                        .push(" = ")
                        .push_bind(Json(value.clone()));
                }
                FieldFilter::ArrayContains { field, value } => {
                    builder
                        .push(" AND data -> ")
                        .push_bind(field.clone())
                        .push(" @> ")
                        .push_bind(Json(Value::Array(vec![value.clone()])));
                }
            }
        }

        match &query.order_by {
            Some(order) => {
                builder
                    .push(" ORDER BY data -> ")
                    .push_bind(order.field.clone())
                    .push(match order.direction {
                        SortDirection::Ascending => " ASC",
                        SortDirection::Descending => " DESC",
                    });
            }
            None => {
                builder.push(" ORDER BY document_id");
            }
        }

        if let Some(limit) = query.limit {
            builder
                .push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        builder
            .build_query_as::<Document>()
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn create(&self, path: &CollectionPath, data: Fields) -> Result<Document, StoreError> {
        query_as::<Postgres, Document>(INSERT_DOCUMENT_SQL)
            .bind(path.as_str())
            .bind(generate_document_id())
            .bind(Json(data))
            .bind(SqlxTimestamp::from(Timestamp::now()))
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn set(&self, path: &CollectionPath, id: &str, data: Fields) -> Result<(), StoreError> {
        query(UPSERT_DOCUMENT_SQL)
            .bind(path.as_str())
            .bind(id)
            .bind(Json(data))
            .bind(SqlxTimestamp::from(Timestamp::now()))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        data: Fields,
    ) -> Result<Document, StoreError> {
        query_as::<Postgres, Document>(MERGE_DOCUMENT_SQL)
            .bind(path.as_str())
            .bind(id)
            .bind(Json(data))
            .bind(SqlxTimestamp::from(Timestamp::now()))
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), StoreError> {
        query(DELETE_DOCUMENT_SQL)
            .bind(path.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count(&self, path: &CollectionPath) -> Result<u64, StoreError> {
        let count: i64 = query_scalar(COUNT_DOCUMENTS_SQL)
            .bind(path.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn commit_batch(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        if operations.len() > MAX_BATCH_OPERATIONS {
            return Err(StoreError::BatchTooLarge {
                size: operations.len(),
                max: MAX_BATCH_OPERATIONS,
            });
        }

        let now = Timestamp::now();
        let mut tx = self.pool.begin().await?;

        for operation in operations {
            match operation {
                BatchOperation::Set { path, id, data } => {
                    query(UPSERT_DOCUMENT_SQL)
                        .bind(path.as_str())
                        .bind(id)
                        .bind(Json(data))
                        .bind(SqlxTimestamp::from(now))
                        .execute(&mut *tx)
                        .await?;
                }
                BatchOperation::Delete { path, id } => {
                    query(DELETE_DOCUMENT_SQL)
                        .bind(path.as_str())
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for Document {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("document_id")?,
            data: row.try_get::<Json<Fields>, _>("data")?.0,
        })
    }
}
