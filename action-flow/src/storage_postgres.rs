use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};

use crate::{
    error::{FlowError, Result},
    storage::{Session, SessionStorage},
};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS action_flow_sessions (
    id TEXT PRIMARY KEY,
    data JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)"#;

/// PostgreSQL-backed SessionStorage, one JSONB row per session
pub struct PostgresSessionStorage {
    pool: PgPool,
}

impl PostgresSessionStorage {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| FlowError::StorageError(format!("Failed to connect: {e}")))?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: PgPool) -> Result<Self> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| FlowError::StorageError(format!("Failed to create table: {e}")))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl SessionStorage for PostgresSessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        let data = serde_json::to_value(&session)?;
        sqlx::query(
            r#"
            INSERT INTO action_flow_sessions (id, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&session.id)
        .bind(data)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| FlowError::StorageError(format!("Failed to save session: {e}")))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT data FROM action_flow_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| FlowError::StorageError(format!("Failed to load session: {e}")))?;

        match row {
            Some(row) => {
                let data: serde_json::Value = row
                    .try_get("data")
                    .map_err(|e| FlowError::StorageError(e.to_string()))?;
                Ok(Some(serde_json::from_value(data)?))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM action_flow_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| FlowError::StorageError(format!("Failed to delete session: {e}")))?;
        Ok(())
    }
}
