use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use crate::core::blender::{parse_oracle_response, OracleError, OracleRequest, RankingOracle};
use crate::services::cache::{CacheKey, CacheManager};

/// Ranking oracle reached over HTTP
///
/// POSTs `{ requirementSummary, candidateSummaries }` and hands the raw JSON
/// body back to the blender for validation.
pub struct HttpRankingOracle {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpRankingOracle {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> Result<Self, OracleError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl RankingOracle for HttpRankingOracle {
    async fn rank(&self, request: &OracleRequest) -> Result<Value, OracleError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(OracleError::ApiError(format!(
                "Ranking request failed: {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| OracleError::Malformed(format!("Invalid JSON: {}", e)))
    }
}

/// Oracle wrapper that reuses responses for identical requests
///
/// Only responses that pass validation are cached; cache failures fall
/// through to the inner oracle.
pub struct CachedOracle {
    inner: Arc<dyn RankingOracle>,
    cache: Arc<CacheManager>,
}

impl CachedOracle {
    pub fn new(inner: Arc<dyn RankingOracle>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }

    /// SHA-256 of the requirement and the candidates sent, hex encoded
    ///
    /// Keys are shared through Redis, so the digest must not vary between
    /// builds or processes.
    pub fn fingerprint(request: &OracleRequest) -> String {
        let mut hasher = Sha256::new();
        update_field(&mut hasher, request.requirement_summary.as_bytes());
        for candidate in &request.candidate_summaries {
            update_field(&mut hasher, candidate.property_id.as_bytes());
            update_field(&mut hasher, candidate.summary.as_bytes());
            update_field(&mut hasher, &[candidate.deterministic_score]);
        }
        format!("{:x}", hasher.finalize())
    }
}

// Length prefix keeps ("ab", "c") and ("a", "bc") apart
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

#[async_trait]
impl RankingOracle for CachedOracle {
    async fn rank(&self, request: &OracleRequest) -> Result<Value, OracleError> {
        let key = CacheKey::oracle(&Self::fingerprint(request));

        if let Ok(cached) = self.cache.get::<Value>(&key).await {
            tracing::debug!("Oracle cache hit: {}", key);
            return Ok(cached);
        }

        let response = self.inner.rank(request).await?;

        // A body the blender would reject must not be replayed
        match parse_oracle_response(&response) {
            Ok(_) => {
                if let Err(e) = self.cache.set(&key, &response).await {
                    tracing::warn!("Failed to cache oracle response: {}", e);
                }
            }
            Err(e) => tracing::debug!("Not caching oracle response: {}", e),
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blender::CandidateSummary;
    use mockito::Matcher;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request() -> OracleRequest {
        OracleRequest {
            requirement_summary: "budget up to 300000, in lisboa".to_string(),
            candidate_summaries: vec![CandidateSummary {
                property_id: "p1".to_string(),
                summary: "T2 in Lisboa".to_string(),
                deterministic_score: 80,
            }],
        }
    }

    #[tokio::test]
    async fn test_http_oracle_posts_contract() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rank")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(json!({
                "requirementSummary": "budget up to 300000, in lisboa",
                "candidateSummaries": [{ "propertyId": "p1" }]
            })))
            .with_status(200)
            .with_body(json!({ "matches": [{ "propertyId": "p1", "aiScore": 70, "rationale": "ok" }] }).to_string())
            .create_async()
            .await;

        let oracle = HttpRankingOracle::new(
            format!("{}/rank", server.url()),
            Some("secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let value = oracle.rank(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(value["matches"][0]["aiScore"], 70);
    }

    #[tokio::test]
    async fn test_http_oracle_error_status() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/rank").with_status(503).create_async().await;

        let oracle = HttpRankingOracle::new(format!("{}/rank", server.url()), None, Duration::from_secs(5)).unwrap();

        assert!(matches!(oracle.rank(&request()).await, Err(OracleError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_http_oracle_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/rank").with_status(200).with_body("not json").create_async().await;

        let oracle = HttpRankingOracle::new(format!("{}/rank", server.url()), None, Duration::from_secs(5)).unwrap();

        assert!(matches!(oracle.rank(&request()).await, Err(OracleError::Malformed(_))));
    }

    struct CountingOracle(AtomicUsize);

    #[async_trait]
    impl RankingOracle for CountingOracle {
        async fn rank(&self, _request: &OracleRequest) -> Result<Value, OracleError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "matches": [] }))
        }
    }

    #[tokio::test]
    async fn test_cached_oracle_reuses_response() {
        let inner = Arc::new(CountingOracle(AtomicUsize::new(0)));
        let cache = Arc::new(CacheManager::local(100, 60));
        let oracle = CachedOracle::new(inner.clone(), cache);

        oracle.rank(&request()).await.unwrap();
        oracle.rank(&request()).await.unwrap();

        assert_eq!(inner.0.load(Ordering::SeqCst), 1);
    }

    /// Answers with a rejected body first, then a valid one
    struct FlakyOracle(AtomicUsize);

    #[async_trait]
    impl RankingOracle for FlakyOracle {
        async fn rank(&self, _request: &OracleRequest) -> Result<Value, OracleError> {
            if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(json!({ "error": "overloaded" }))
            } else {
                Ok(json!({ "matches": [{ "propertyId": "p1", "aiScore": 64 }] }))
            }
        }
    }

    #[tokio::test]
    async fn test_cached_oracle_skips_invalid_response() {
        let inner = Arc::new(FlakyOracle(AtomicUsize::new(0)));
        let cache = Arc::new(CacheManager::local(100, 60));
        let oracle = CachedOracle::new(inner.clone(), cache);

        let first = oracle.rank(&request()).await.unwrap();
        assert!(parse_oracle_response(&first).is_err());

        let second = oracle.rank(&request()).await.unwrap();
        let parsed = parse_oracle_response(&second).unwrap();
        assert_eq!(parsed[0].ai_score, 64);
        assert_eq!(inner.0.load(Ordering::SeqCst), 2);

        // The valid body is the one kept
        oracle.rank(&request()).await.unwrap();
        assert_eq!(inner.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fingerprint_depends_on_candidates() {
        let mut other = request();
        other.candidate_summaries[0].deterministic_score = 81;
        assert_ne!(CachedOracle::fingerprint(&request()), CachedOracle::fingerprint(&other));
        assert_eq!(CachedOracle::fingerprint(&request()), CachedOracle::fingerprint(&request()));
    }

    #[test]
    fn test_fingerprint_is_fixed_length_hex() {
        let fingerprint = CachedOracle::fingerprint(&request());
        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));

        // Field boundaries are part of the digest
        let mut shifted = request();
        shifted.requirement_summary = "budget up to 300000, in lisbo".to_string();
        shifted.candidate_summaries[0].property_id = "ap1".to_string();
        assert_ne!(CachedOracle::fingerprint(&request()), CachedOracle::fingerprint(&shifted));
    }
}
