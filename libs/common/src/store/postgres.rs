//! PostgreSQL backend storing each document as a JSONB row

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{DocumentPath, DocumentStore, Fields};
use crate::{
    database,
    error::{DatabaseError, StoreError, StoreResult},
};

const CREATE_DOCUMENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id UUID NOT NULL,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (collection, id)
    )
"#;

/// Document store backed by a `documents` table
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Create a new store on an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `documents` table if it does not exist yet
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(CREATE_DOCUMENTS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        info!("Document table is ready");
        Ok(())
    }
}

// Ids we never issued cannot exist in the table.
fn parse_id(path: &DocumentPath) -> StoreResult<Uuid> {
    Uuid::parse_str(path.id()).map_err(|_| StoreError::NotFound(path.to_string()))
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<DocumentPath> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(fields))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(DocumentPath::new(collection, id.to_string()))
    }

    async fn update(&self, path: &DocumentPath, fields: Fields) -> StoreResult<()> {
        let id = parse_id(path)?;

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = data || $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(path.collection())
        .bind(id)
        .bind(Value::Object(fields))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(path.to_string()));
        }

        Ok(())
    }

    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Fields>> {
        let Ok(id) = parse_id(path) else {
            return Ok(None);
        };

        let data: Option<Value> = sqlx::query_scalar(
            r#"
            SELECT data
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(path.collection())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        match data {
            Some(Value::Object(fields)) => Ok(Some(fields)),
            Some(other) => Err(StoreError::Malformed(format!(
                "document {} is not a JSON object: {}",
                path, other
            ))),
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(database::health_check(&self.pool).await?)
    }
}
