use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{SaveMeta, SavedMatch, SavedMatchStatus};

/// Errors surfaced by saved-match storage
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed storage for saved matches, one record per `(lead_id, property_id)`
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Insert unless the key exists; returns the record now stored
    async fn insert_if_absent(&self, record: SavedMatch) -> Result<SavedMatch, StoreError>;

    /// Delete by key; returns whether a record existed
    async fn delete(&self, lead_id: &str, property_id: &str) -> Result<bool, StoreError>;

    /// Overwrite the status of an existing record
    async fn set_status(
        &self,
        lead_id: &str,
        property_id: &str,
        status: SavedMatchStatus,
    ) -> Result<Option<SavedMatch>, StoreError>;

    /// All records for a lead, newest first
    async fn list(&self, lead_id: &str) -> Result<Vec<SavedMatch>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

/// Save/remove/status operations on top of a [`RecommendationStore`]
///
/// Matching never calls into this type; saved matches only change when a
/// caller asks.
#[derive(Clone)]
pub struct RecommendationService {
    store: Arc<dyn RecommendationStore>,
}

impl RecommendationService {
    pub fn new(store: Arc<dyn RecommendationStore>) -> Self {
        Self { store }
    }

    /// Idempotent upsert. An existing record is returned unchanged.
    pub async fn save(
        &self,
        lead_id: &str,
        property_id: &str,
        meta: SaveMeta,
    ) -> Result<SavedMatch, StoreError> {
        let record = SavedMatch {
            lead_id: lead_id.to_string(),
            property_id: property_id.to_string(),
            property_title: meta.property_title.unwrap_or_else(|| property_id.to_string()),
            added_date: Utc::now(),
            status: SavedMatchStatus::Interested,
            match_score: meta.match_score,
        };

        let stored = self.store.insert_if_absent(record).await?;
        tracing::debug!("Saved match {} -> {} ({:?})", lead_id, property_id, stored.status);
        Ok(stored)
    }

    /// Remove a saved match; a missing record is not an error
    pub async fn remove(&self, lead_id: &str, property_id: &str) -> Result<(), StoreError> {
        let existed = self.store.delete(lead_id, property_id).await?;
        if !existed {
            tracing::debug!("Remove for unsaved match {} -> {} ignored", lead_id, property_id);
        }
        Ok(())
    }

    /// Caller-driven status change; no transition rules are enforced
    pub async fn update_status(
        &self,
        lead_id: &str,
        property_id: &str,
        status: SavedMatchStatus,
    ) -> Result<SavedMatch, StoreError> {
        self.store
            .set_status(lead_id, property_id, status)
            .await?
            .ok_or_else(|| {
                StoreError::NotFound(format!("No saved match for {} -> {}", lead_id, property_id))
            })
    }

    pub async fn list(&self, lead_id: &str) -> Result<Vec<SavedMatch>, StoreError> {
        self.store.list(lead_id).await
    }

    pub async fn health_check(&self) -> bool {
        self.store.health_check().await.unwrap_or(false)
    }
}

/// Process-local store, used when no database is configured and in tests
#[derive(Default)]
pub struct InMemoryRecommendationStore {
    records: RwLock<HashMap<(String, String), SavedMatch>>,
}

impl InMemoryRecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RecommendationStore for InMemoryRecommendationStore {
    async fn insert_if_absent(&self, record: SavedMatch) -> Result<SavedMatch, StoreError> {
        let key = (record.lead_id.clone(), record.property_id.clone());
        let mut records = self.records.write().await;
        Ok(records.entry(key).or_insert(record).clone())
    }

    async fn delete(&self, lead_id: &str, property_id: &str) -> Result<bool, StoreError> {
        let key = (lead_id.to_string(), property_id.to_string());
        Ok(self.records.write().await.remove(&key).is_some())
    }

    async fn set_status(
        &self,
        lead_id: &str,
        property_id: &str,
        status: SavedMatchStatus,
    ) -> Result<Option<SavedMatch>, StoreError> {
        let key = (lead_id.to_string(), property_id.to_string());
        let mut records = self.records.write().await;
        Ok(records.get_mut(&key).map(|record| {
            record.status = status;
            record.clone()
        }))
    }

    async fn list(&self, lead_id: &str) -> Result<Vec<SavedMatch>, StoreError> {
        let records = self.records.read().await;
        let mut saved: Vec<SavedMatch> = records
            .values()
            .filter(|r| r.lead_id == lead_id)
            .cloned()
            .collect();
        saved.sort_by(|a, b| b.added_date.cmp(&a.added_date));
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (RecommendationService, Arc<InMemoryRecommendationStore>) {
        let store = Arc::new(InMemoryRecommendationStore::new());
        (RecommendationService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let (service, store) = service();
        let meta = SaveMeta {
            property_title: Some("T2 Alfama".to_string()),
            match_score: Some(88),
        };

        let first = service.save("lead1", "propA", meta.clone()).await.unwrap();
        service.update_status("lead1", "propA", SavedMatchStatus::Visited).await.unwrap();
        let second = service.save("lead1", "propA", meta).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(first.status, SavedMatchStatus::Interested);
        // the second save must not reset the status
        assert_eq!(second.status, SavedMatchStatus::Visited);
        assert_eq!(second.added_date, first.added_date);
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let (service, _) = service();
        assert!(service.remove("lead1", "nothing").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_status_missing_is_not_found() {
        let (service, _) = service();
        let result = service.update_status("lead1", "propA", SavedMatchStatus::Rejected).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_is_per_lead() {
        let (service, _) = service();
        service.save("lead1", "a", SaveMeta::default()).await.unwrap();
        service.save("lead1", "b", SaveMeta::default()).await.unwrap();
        service.save("lead2", "a", SaveMeta::default()).await.unwrap();

        let saved = service.list("lead1").await.unwrap();
        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|s| s.lead_id == "lead1"));
        assert_eq!(saved.iter().find(|s| s.property_id == "b").unwrap().property_title, "b");
    }
}
