use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::core::pipeline::{InventorySource, RequirementSource, SourceError};
use crate::models::{BuyerProfile, Lead, PropertyCandidate, PropertyRecord};

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<AppwriteError> for SourceError {
    fn from(value: AppwriteError) -> Self {
        match value {
            AppwriteError::NotFound(message) => SourceError::NotFound(message),
            other => SourceError::Unavailable(other.to_string()),
        }
    }
}

/// Appwrite API client
///
/// Handles all communication with the Appwrite backend including:
/// - Listing the active property inventory
/// - Fetching leads
/// - Fetching buyer profiles linked to leads
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
    page_size: usize,
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub properties: String,
    pub leads: String,
    pub buyer_profiles: String,
}

const DEFAULT_PAGE_SIZE: usize = 100;
// Upper bound on pages fetched for one inventory snapshot
const MAX_PAGES: usize = 50;

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
        timeout: Duration,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        )
    }

    /// Build `queries[]=` parameters in Appwrite's query syntax
    fn encode_queries(queries: &[String]) -> String {
        queries
            .iter()
            .map(|q| format!("queries[]={}", urlencoding::encode(q)))
            .collect::<Vec<_>>()
            .join("&")
    }

    async fn get_json(&self, url: &str) -> Result<Value, AppwriteError> {
        let response = self
            .client
            .get(url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppwriteError::NotFound(url.to_string()));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppwriteError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Appwrite request failed: {} - {}", status, body);
            return Err(AppwriteError::ApiError(format!("Request failed: {}", status)));
        }

        Ok(response.json().await?)
    }

    fn documents(json: &Value) -> Result<&Vec<Value>, AppwriteError> {
        json.get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))
    }

    fn parse_document<T: DeserializeOwned>(doc: &Value, what: &str) -> Result<T, AppwriteError> {
        // Older SDKs wrap attributes in a `data` object
        let data = doc.get("data").unwrap_or(doc);
        serde_json::from_value(data.clone())
            .map_err(|e| AppwriteError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    /// List every active, available property, page by page
    ///
    /// Documents that fail to parse or carry no price are skipped with a
    /// warning rather than failing the snapshot.
    pub async fn list_properties(&self) -> Result<Vec<PropertyCandidate>, AppwriteError> {
        let url = self.documents_url(&self.collections.properties);
        let mut properties = Vec::new();

        for page in 0..MAX_PAGES {
            let queries = vec![
                r#"equal("status", ["active"])"#.to_string(),
                r#"equal("availability", ["available"])"#.to_string(),
                format!("limit({})", self.page_size),
                format!("offset({})", page * self.page_size),
            ];
            let full_url = format!("{}?{}", url, Self::encode_queries(&queries));

            let json = self.get_json(&full_url).await?;
            let documents = Self::documents(&json)?;
            let fetched = documents.len();

            for doc in documents {
                let candidate = Self::parse_document::<PropertyRecord>(doc, "property").and_then(|record| {
                    PropertyCandidate::try_from(record).map_err(|e| AppwriteError::InvalidResponse(e.to_string()))
                });
                match candidate {
                    Ok(candidate) => properties.push(candidate),
                    Err(e) => tracing::warn!("Skipping property document: {}", e),
                }
            }

            if fetched < self.page_size {
                break;
            }
        }

        tracing::debug!("Fetched {} properties from Appwrite", properties.len());

        Ok(properties)
    }

    /// Fetch a lead by document id
    pub async fn get_lead(&self, lead_id: &str) -> Result<Lead, AppwriteError> {
        let url = format!(
            "{}/{}",
            self.documents_url(&self.collections.leads),
            urlencoding::encode(lead_id)
        );

        tracing::debug!("Fetching lead: {}", lead_id);

        let doc = self.get_json(&url).await.map_err(|e| match e {
            AppwriteError::NotFound(_) => AppwriteError::NotFound(format!("Lead {} not found", lead_id)),
            other => other,
        })?;

        Self::parse_document(&doc, "lead")
    }

    /// Fetch the buyer profile linked to a lead, if any
    pub async fn get_buyer_profile(&self, lead: &Lead) -> Result<Option<BuyerProfile>, AppwriteError> {
        if let Some(profile_id) = lead.buyer_profile_id.as_deref() {
            let url = format!(
                "{}/{}",
                self.documents_url(&self.collections.buyer_profiles),
                urlencoding::encode(profile_id)
            );
            return match self.get_json(&url).await {
                Ok(doc) => Self::parse_document(&doc, "buyer profile").map(Some),
                Err(AppwriteError::NotFound(_)) => {
                    tracing::warn!("Lead {} links missing buyer profile {}", lead.id, profile_id);
                    Ok(None)
                }
                Err(e) => Err(e),
            };
        }

        let queries = vec![format!(r#"equal("leadId", ["{}"])"#, lead.id), "limit(1)".to_string()];
        let url = format!(
            "{}?{}",
            self.documents_url(&self.collections.buyer_profiles),
            Self::encode_queries(&queries)
        );

        let json = self.get_json(&url).await?;
        match Self::documents(&json)?.first() {
            Some(doc) => Self::parse_document(doc, "buyer profile").map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl InventorySource for AppwriteClient {
    async fn list_active_properties(&self) -> Result<Vec<PropertyCandidate>, SourceError> {
        Ok(self.list_properties().await?)
    }
}

#[async_trait]
impl RequirementSource for AppwriteClient {
    async fn get_lead(&self, lead_id: &str) -> Result<Lead, SourceError> {
        Ok(AppwriteClient::get_lead(self, lead_id).await?)
    }

    async fn get_buyer_profile(&self, lead: &Lead) -> Result<Option<BuyerProfile>, SourceError> {
        Ok(AppwriteClient::get_buyer_profile(self, lead).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingType, PropertyType};
    use mockito::Matcher;
    use serde_json::json;

    fn collections() -> AppwriteCollections {
        AppwriteCollections {
            properties: "properties".to_string(),
            leads: "leads".to_string(),
            buyer_profiles: "buyer_profiles".to_string(),
        }
    }

    fn client(base_url: String) -> AppwriteClient {
        AppwriteClient::new(
            base_url,
            "test_key".to_string(),
            "test_project".to_string(),
            "crm".to_string(),
            collections(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_appwrite_client_creation() {
        let client = client("https://appwrite.test/v1".to_string());

        assert_eq!(client.base_url, "https://appwrite.test/v1");
        assert_eq!(client.api_key, "test_key");
        assert_eq!(
            client.documents_url("leads"),
            "https://appwrite.test/v1/databases/crm/collections/leads/documents"
        );
    }

    #[tokio::test]
    async fn test_list_properties_skips_bad_documents() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/databases/crm/collections/properties/documents".to_string()))
            .match_header("X-Appwrite-Key", "test_key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "total": 2,
                    "documents": [
                        { "$id": "p1", "title": "T2", "price": 250000, "city": "Lisboa",
                          "status": "active", "availability": "available", "bedrooms": null },
                        { "title": "missing id" }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let properties = client(server.url()).list_properties().await.unwrap();

        mock.assert_async().await;
        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].id, "p1");
        assert_eq!(properties[0].bedrooms, None);
    }

    #[tokio::test]
    async fn test_list_properties_skips_unpriced_and_reads_loose_types() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/databases/crm/collections/properties/documents".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "total": 2,
                    "documents": [
                        { "$id": "free", "title": "Sem preço", "city": "Lisboa",
                          "status": "active", "availability": "available" },
                        { "$id": "p2", "price": 320000, "listingType": "Venda",
                          "propertyType": "Moradia", "city": "Sintra",
                          "status": "active", "availability": "available" }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let properties = client(server.url()).list_properties().await.unwrap();

        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].id, "p2");
        assert_eq!(properties[0].listing_type, ListingType::Sale);
        assert_eq!(properties[0].property_type, PropertyType::House);
    }

    #[tokio::test]
    async fn test_get_lead_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/crm/collections/leads/documents/nope")
            .with_status(404)
            .create_async()
            .await;

        let result = client(server.url()).get_lead("nope").await;
        assert!(matches!(result, Err(AppwriteError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_buyer_profile_absent() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/databases/crm/collections/buyer_profiles/documents".to_string()))
            .with_status(200)
            .with_body(json!({ "total": 0, "documents": [] }).to_string())
            .create_async()
            .await;

        let lead = Lead { id: "lead-1".to_string(), ..Default::default() };
        let profile = client(server.url()).get_buyer_profile(&lead).await.unwrap();
        assert!(profile.is_none());
    }
}
