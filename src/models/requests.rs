use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to rank the inventory for a lead
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindMatchesRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "lead_id", rename = "leadId")]
    pub lead_id: String,
    /// Falls back to the configured default when absent
    #[serde(default)]
    #[validate(range(min = 1))]
    pub limit: Option<u16>,
    #[serde(default = "default_use_ai", alias = "use_ai", rename = "useAi")]
    pub use_ai: bool,
}

fn default_use_ai() -> bool {
    true
}

/// Request to save a property for a lead
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveMatchRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "lead_id", rename = "leadId")]
    pub lead_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "property_id", rename = "propertyId")]
    pub property_id: String,
    #[serde(alias = "property_title", rename = "propertyTitle", default)]
    pub property_title: Option<String>,
    #[serde(alias = "match_score", rename = "matchScore", default)]
    #[validate(range(min = 0, max = 100))]
    pub match_score: Option<i32>,
}

/// Request to remove a saved property from a lead
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RemoveMatchRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "lead_id", rename = "leadId")]
    pub lead_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "property_id", rename = "propertyId")]
    pub property_id: String,
}

/// Request to move a saved match to another status
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "lead_id", rename = "leadId")]
    pub lead_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "property_id", rename = "propertyId")]
    pub property_id: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_matches_defaults() {
        let req: FindMatchesRequest = serde_json::from_str(r#"{"leadId": "lead-1"}"#).unwrap();
        assert_eq!(req.limit, None);
        assert!(req.use_ai);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_save_request_rejects_empty_ids() {
        let req = SaveMatchRequest {
            lead_id: String::new(),
            property_id: "p1".to_string(),
            property_title: None,
            match_score: None,
        };
        assert!(req.validate().is_err());
    }
}
