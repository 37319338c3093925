use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::core::recommendations::{RecommendationStore, StoreError};
use crate::models::{SavedMatch, SavedMatchStatus};

/// Column type for saved match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "saved_match_status", rename_all = "lowercase")]
pub enum StatusColumn {
    Interested,
    Visited,
    Rejected,
    Negotiating,
}

impl From<SavedMatchStatus> for StatusColumn {
    fn from(value: SavedMatchStatus) -> Self {
        match value {
            SavedMatchStatus::Interested => StatusColumn::Interested,
            SavedMatchStatus::Visited => StatusColumn::Visited,
            SavedMatchStatus::Rejected => StatusColumn::Rejected,
            SavedMatchStatus::Negotiating => StatusColumn::Negotiating,
        }
    }
}

impl From<StatusColumn> for SavedMatchStatus {
    fn from(value: StatusColumn) -> Self {
        match value {
            StatusColumn::Interested => SavedMatchStatus::Interested,
            StatusColumn::Visited => SavedMatchStatus::Visited,
            StatusColumn::Rejected => SavedMatchStatus::Rejected,
            StatusColumn::Negotiating => SavedMatchStatus::Negotiating,
        }
    }
}

const SAVED_COLUMNS: &str = "lead_id, property_id, property_title, added_date, status, match_score";

/// PostgreSQL store for saved matches
///
/// One row per `(lead_id, property_id)`, enforced by the primary key. Saves
/// use `INSERT ... ON CONFLICT DO NOTHING` so repeated saves never touch an
/// existing row.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    fn row_to_saved(row: &PgRow) -> Result<SavedMatch, StoreError> {
        let status: StatusColumn = row.try_get("status")?;
        Ok(SavedMatch {
            lead_id: row.try_get("lead_id")?,
            property_id: row.try_get("property_id")?,
            property_title: row.try_get("property_title")?,
            added_date: row.try_get("added_date")?,
            status: status.into(),
            match_score: row.try_get("match_score")?,
        })
    }
}

#[async_trait]
impl RecommendationStore for PostgresClient {
    async fn insert_if_absent(&self, record: SavedMatch) -> Result<SavedMatch, StoreError> {
        let insert = format!(
            r#"
            INSERT INTO saved_matches ({SAVED_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (lead_id, property_id) DO NOTHING
            RETURNING {SAVED_COLUMNS}
            "#
        );

        let inserted = sqlx::query(&insert)
            .bind(&record.lead_id)
            .bind(&record.property_id)
            .bind(&record.property_title)
            .bind(record.added_date)
            .bind(StatusColumn::from(record.status))
            .bind(record.match_score)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            tracing::debug!("Inserted saved match {} -> {}", record.lead_id, record.property_id);
            return Self::row_to_saved(&row);
        }

        // Key already present: hand back the stored row untouched
        let select = format!(
            "SELECT {SAVED_COLUMNS} FROM saved_matches WHERE lead_id = $1 AND property_id = $2"
        );
        let row = sqlx::query(&select)
            .bind(&record.lead_id)
            .bind(&record.property_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                StoreError::Unavailable(format!(
                    "Saved match {} -> {} vanished during save",
                    record.lead_id, record.property_id
                ))
            })?;

        Self::row_to_saved(&row)
    }

    async fn delete(&self, lead_id: &str, property_id: &str) -> Result<bool, StoreError> {
        let query = r#"
            DELETE FROM saved_matches
            WHERE lead_id = $1 AND property_id = $2
        "#;

        let result = sqlx::query(query)
            .bind(lead_id)
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_status(
        &self,
        lead_id: &str,
        property_id: &str,
        status: SavedMatchStatus,
    ) -> Result<Option<SavedMatch>, StoreError> {
        let query = format!(
            r#"
            UPDATE saved_matches
            SET status = $3
            WHERE lead_id = $1 AND property_id = $2
            RETURNING {SAVED_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(lead_id)
            .bind(property_id)
            .bind(StatusColumn::from(status))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_saved).transpose()
    }

    async fn list(&self, lead_id: &str) -> Result<Vec<SavedMatch>, StoreError> {
        let query = format!(
            "SELECT {SAVED_COLUMNS} FROM saved_matches WHERE lead_id = $1 ORDER BY added_date DESC"
        );

        let rows = sqlx::query(&query).bind(lead_id).fetch_all(&self.pool).await?;

        let saved = rows.iter().map(Self::row_to_saved).collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Lead {} has {} saved matches", lead_id, saved.len());

        Ok(saved)
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
