use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use tracing::info;

use crate::{
    error::{Result, WizardError},
    state::WizardState,
    storage::{SessionKey, SessionStorage},
};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS wizard_sessions (
    key TEXT PRIMARY KEY,
    state JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Wizard state kept in a Postgres JSONB column, one row per flow instance
pub struct PostgresSessionStorage {
    pool: PgPool,
}

impl PostgresSessionStorage {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(storage_error)?;

        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(storage_error)?;

        info!("wizard_sessions table ready");
        Ok(Self { pool })
    }
}

fn storage_error(e: sqlx::Error) -> WizardError {
    WizardError::StorageError(e.to_string())
}

#[async_trait]
impl SessionStorage for PostgresSessionStorage {
    async fn get(&self, key: &SessionKey) -> Result<Option<WizardState>> {
        let row = sqlx::query("SELECT state FROM wizard_sessions WHERE key = $1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        match row {
            Some(row) => {
                let state: Value = row.try_get("state").map_err(storage_error)?;
                Ok(Some(WizardState::from_value(state)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, key: &SessionKey, state: WizardState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wizard_sessions (key, state, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET state = EXCLUDED.state, updated_at = NOW()
            "#,
        )
        .bind(key.as_str())
        .bind(state.into_value())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> Result<()> {
        sqlx::query("DELETE FROM wizard_sessions WHERE key = $1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}
