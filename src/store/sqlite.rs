use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{migrate::MigrateDatabase, Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::{ProcedureStore, StoreError};
use crate::domain::{
    ActorId, DecisionAction, DecisionId, Procedure, ProcedureId, ProcedureType, ProcedureTypeId,
    ValidationDecision,
};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend {
            message: format!("corrupt record: {}", err),
        }
    }
}

fn corrupt(what: &str, value: &str) -> StoreError {
    StoreError::Backend {
        message: format!("corrupt {} column: {}", what, value),
    }
}

/// SQLite-backed store.
///
/// Procedures and catalog entries are stored as JSON bodies next to the
/// columns the compare-and-set and catalog checks need.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database and optionally run migrations.
    pub async fn connect(database_url: &str, max_connections: u32, auto_migrate: bool) -> Result<Self, StoreError> {
        let in_memory = database_url.contains(":memory:");

        if !in_memory && !sqlx::Sqlite::database_exists(database_url).await? {
            info!("Creating database at {}", database_url);
            sqlx::Sqlite::create_database(database_url).await?;
        }

        // Every connection to `:memory:` opens its own database.
        let max_connections = if in_memory { 1 } else { max_connections.max(1) };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        if auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| StoreError::Backend { message: e.to_string() })?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl ProcedureStore for SqliteStore {
    async fn procedure_type(&self, id: ProcedureTypeId) -> Result<ProcedureType, StoreError> {
        let row = sqlx::query("SELECT body FROM procedure_types WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                Ok(serde_json::from_str(&body)?)
            }
            None => Err(StoreError::ProcedureTypeNotFound { procedure_type_id: id }),
        }
    }

    async fn save_procedure_type(&self, procedure_type: &ProcedureType) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT body FROM procedure_types WHERE id = ?1")
            .bind(procedure_type.id.to_string())
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(row) = existing {
            let body: String = row.get("body");
            let existing: ProcedureType = serde_json::from_str(&body)?;

            let completed: i64 = sqlx::query(
                r#"
                SELECT COUNT(*) AS n FROM procedures
                WHERE procedure_type_id = ?1 AND operational_status = 'completed'
                "#,
            )
            .bind(procedure_type.id.to_string())
            .fetch_one(&mut *tx)
            .await?
            .get("n");

            if completed > 0 && existing.pricing_differs(procedure_type) {
                return Err(StoreError::CatalogImmutable {
                    procedure_type_id: procedure_type.id,
                });
            }
        }

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO procedure_types (id, body, updated_at)
            VALUES (?1, ?2, datetime('now'))
            "#,
        )
        .bind(procedure_type.id.to_string())
        .bind(serde_json::to_string(procedure_type)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn load(&self, id: ProcedureId) -> Result<Procedure, StoreError> {
        let row = sqlx::query("SELECT body FROM procedures WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                Ok(serde_json::from_str(&body)?)
            }
            None => Err(StoreError::NotFound { procedure_id: id }),
        }
    }

    async fn insert(&self, procedure: &Procedure) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO procedures
                (id, procedure_type_id, validation_status, operational_status, version, body, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
            "#,
        )
        .bind(procedure.id.to_string())
        .bind(procedure.procedure_type_id.to_string())
        .bind(procedure.validation_status.as_str())
        .bind(procedure.status.as_str())
        .bind(procedure.version as i64)
        .bind(serde_json::to_string(procedure)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists {
                procedure_id: procedure.id,
            });
        }
        Ok(())
    }

    async fn commit(
        &self,
        procedure: &Procedure,
        expected_version: u64,
        decision: Option<&ValidationDecision>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE procedures
            SET procedure_type_id = ?1,
                validation_status = ?2,
                operational_status = ?3,
                version = ?4,
                body = ?5,
                updated_at = datetime('now')
            WHERE id = ?6 AND version = ?7
            "#,
        )
        .bind(procedure.procedure_type_id.to_string())
        .bind(procedure.validation_status.as_str())
        .bind(procedure.status.as_str())
        .bind(procedure.version as i64)
        .bind(serde_json::to_string(procedure)?)
        .bind(procedure.id.to_string())
        .bind(expected_version as i64)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM procedures WHERE id = ?1")
                .bind(procedure.id.to_string())
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
            tx.rollback().await?;

            return Err(if exists {
                StoreError::VersionConflict {
                    procedure_id: procedure.id,
                    expected: expected_version,
                }
            } else {
                StoreError::NotFound {
                    procedure_id: procedure.id,
                }
            });
        }

        if let Some(decision) = decision {
            sqlx::query(
                r#"
                INSERT INTO validation_decisions (id, procedure_id, actor, action, reason, decided_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(decision.id.to_string())
            .bind(decision.procedure_id.to_string())
            .bind(decision.actor.as_str())
            .bind(decision.action.as_str())
            .bind(&decision.reason)
            .bind(decision.decided_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn decisions(&self, id: ProcedureId) -> Result<Vec<ValidationDecision>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, procedure_id, actor, action, reason, decided_at
            FROM validation_decisions
            WHERE procedure_id = ?1
            ORDER BY seq ASC
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let decision_id: String = row.get("id");
                let actor: String = row.get("actor");
                let action: String = row.get("action");
                let reason: String = row.get("reason");
                let decided_at: String = row.get("decided_at");

                Ok(ValidationDecision {
                    id: DecisionId(Uuid::parse_str(&decision_id).map_err(|_| corrupt("decision id", &decision_id))?),
                    procedure_id: id,
                    actor: ActorId::new(actor),
                    action: DecisionAction::parse(&action).ok_or_else(|| corrupt("action", &action))?,
                    reason,
                    decided_at: DateTime::parse_from_rfc3339(&decided_at)
                        .map_err(|_| corrupt("decided_at", &decided_at))?
                        .with_timezone(&Utc),
                })
            })
            .collect()
    }

    async fn close(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }
}
