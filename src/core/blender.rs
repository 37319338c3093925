use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;

use crate::core::scoring::{round_half_up, ScoreCard};
use crate::models::{BuyerRequirement, PropertyCandidate, ScoreFactor};

/// Errors from the ranking oracle. All of them are recovered by the blender.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Oracle returned error: {0}")]
    ApiError(String),

    #[error("Oracle timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed oracle response: {0}")]
    Malformed(String),
}

/// Candidate summary sent to the oracle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    pub property_id: String,
    pub summary: String,
    pub deterministic_score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    pub requirement_summary: String,
    pub candidate_summaries: Vec<CandidateSummary>,
}

/// One validated oracle entry
#[derive(Debug, Clone, PartialEq)]
pub struct OracleMatch {
    pub property_id: String,
    pub ai_score: u8,
    pub rationale: String,
}

/// Opaque re-ranking service
///
/// Implementations return the raw response body; shape validation happens in
/// [`parse_oracle_response`] so every implementation is held to the same
/// contract.
#[async_trait]
pub trait RankingOracle: Send + Sync {
    async fn rank(&self, request: &OracleRequest) -> Result<Value, OracleError>;
}

/// Candidate with its deterministic score card
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub property: PropertyCandidate,
    pub card: ScoreCard,
}

/// Candidate after blending
#[derive(Debug, Clone)]
pub struct BlendedCandidate {
    pub property: PropertyCandidate,
    pub deterministic_score: u8,
    pub breakdown: Vec<ScoreFactor>,
    pub blended_score: u8,
    pub ai_score: Option<u8>,
    pub rationale: String,
}

impl From<ScoredCandidate> for BlendedCandidate {
    fn from(scored: ScoredCandidate) -> Self {
        Self {
            property: scored.property,
            deterministic_score: scored.card.score,
            breakdown: scored.card.breakdown,
            blended_score: scored.card.score,
            ai_score: None,
            rationale: String::new(),
        }
    }
}

#[derive(Debug)]
pub struct BlendOutcome {
    pub candidates: Vec<BlendedCandidate>,
    pub oracle_applied: bool,
}

/// Blends oracle scores into the deterministic ranking
#[derive(Debug, Clone, Copy)]
pub struct Blender {
    pub top_n: usize,
    pub timeout: Duration,
}

impl Blender {
    pub fn new(top_n: usize, timeout: Duration) -> Self {
        Self { top_n, timeout }
    }

    /// Merge oracle scores into the top-N candidates
    ///
    /// Input order is preserved. Any oracle failure, including a timeout or a
    /// non-conforming response, leaves every blended score equal to its
    /// deterministic score.
    pub async fn blend(
        &self,
        requirement: &BuyerRequirement,
        scored: Vec<ScoredCandidate>,
        oracle: Option<&dyn RankingOracle>,
    ) -> BlendOutcome {
        let mut candidates: Vec<BlendedCandidate> = scored.into_iter().map(Into::into).collect();

        let Some(oracle) = oracle else {
            return BlendOutcome { candidates, oracle_applied: false };
        };
        if self.top_n == 0 || candidates.is_empty() {
            return BlendOutcome { candidates, oracle_applied: false };
        }

        let top = top_indices(&candidates, self.top_n);
        let request = OracleRequest {
            requirement_summary: requirement.summary(),
            candidate_summaries: top
                .iter()
                .map(|&i| CandidateSummary {
                    property_id: candidates[i].property.id.clone(),
                    summary: candidates[i].property.summary(),
                    deterministic_score: candidates[i].deterministic_score,
                })
                .collect(),
        };

        let response = match tokio::time::timeout(self.timeout, oracle.rank(&request)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout(self.timeout)),
        };

        let matches = match response.and_then(|value| parse_oracle_response(&value)) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("Ranking oracle unavailable, keeping deterministic scores: {}", e);
                return BlendOutcome { candidates, oracle_applied: false };
            }
        };

        let allowed: HashSet<&str> = request
            .candidate_summaries
            .iter()
            .map(|c| c.property_id.as_str())
            .collect();

        let mut by_id: HashMap<String, OracleMatch> = HashMap::new();
        for m in matches {
            if allowed.contains(m.property_id.as_str()) && !by_id.contains_key(&m.property_id) {
                by_id.insert(m.property_id.clone(), m);
            }
        }

        tracing::debug!(
            "Oracle scored {} of {} candidates sent",
            by_id.len(),
            request.candidate_summaries.len()
        );

        apply_oracle_scores(&mut candidates, &by_id);

        BlendOutcome { candidates, oracle_applied: true }
    }
}

/// Indices of the `n` best deterministic scores; ties keep input order
fn top_indices(candidates: &[BlendedCandidate], n: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..candidates.len()).collect();
    indices.sort_by(|&a, &b| {
        candidates[b]
            .deterministic_score
            .cmp(&candidates[a].deterministic_score)
    });
    indices.truncate(n);
    indices
}

/// Average oracle and deterministic scores where the oracle answered
pub fn apply_oracle_scores(candidates: &mut [BlendedCandidate], scores: &HashMap<String, OracleMatch>) {
    for candidate in candidates.iter_mut() {
        if let Some(m) = scores.get(&candidate.property.id) {
            let blended = round_half_up((candidate.deterministic_score as f64 + m.ai_score as f64) / 2.0);
            candidate.blended_score = blended.clamp(0.0, 100.0) as u8;
            candidate.ai_score = Some(m.ai_score);
            candidate.rationale = m.rationale.clone();
        }
    }
}

/// Validate a raw oracle response
///
/// Expected shape: `{ "matches": [{ "propertyId", "aiScore", "rationale"? }] }`.
/// Any deviation rejects the whole response.
pub fn parse_oracle_response(value: &Value) -> Result<Vec<OracleMatch>, OracleError> {
    let entries = value
        .get("matches")
        .and_then(|m| m.as_array())
        .ok_or_else(|| OracleError::Malformed("Missing matches array".into()))?;

    entries
        .iter()
        .map(|entry| {
            let property_id = entry
                .get("propertyId")
                .and_then(|p| p.as_str())
                .ok_or_else(|| OracleError::Malformed("propertyId must be a string".into()))?;

            let ai_score = entry
                .get("aiScore")
                .and_then(|s| s.as_f64())
                .ok_or_else(|| OracleError::Malformed("aiScore must be a number".into()))?;
            if !(0.0..=100.0).contains(&ai_score) {
                return Err(OracleError::Malformed(format!("aiScore {} out of range", ai_score)));
            }

            let rationale = match entry.get("rationale") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(text)) => text.clone(),
                Some(_) => {
                    return Err(OracleError::Malformed("rationale must be a string".into()));
                }
            };

            Ok(OracleMatch {
                property_id: property_id.to_string(),
                ai_score: round_half_up(ai_score) as u8,
                rationale,
            })
        })
        .collect()
}
