use serde::{Deserialize, Serialize};
use crate::models::domain::{MatchResult, SavedMatch};

/// Response for the find matches endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindMatchesResponse {
    pub run_id: String,
    pub matches: Vec<MatchResult>,
    pub total_candidates: usize,
    pub eligible_candidates: usize,
    pub oracle_applied: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Saved matches for a lead
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMatchesResponse {
    pub lead_id: String,
    pub saved: Vec<SavedMatch>,
    pub count: usize,
}

/// Acknowledgement for a remove call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveMatchResponse {
    pub success: bool,
}
