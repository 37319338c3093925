use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// Transaction a property is listed for, or a buyer is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    Rent,
    #[default]
    Both,
}

impl ListingType {
    /// Parse the loose spellings found on lead records
    pub fn parse_loose(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "sale" | "buy" | "purchase" | "venda" | "compra" => Some(Self::Sale),
            "rent" | "rental" | "lease" | "arrendamento" | "aluguer" => Some(Self::Rent),
            "both" | "any" | "ambos" => Some(Self::Both),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    House,
    Villa,
    Townhouse,
    Land,
    Commercial,
    Office,
    Retail,
    Warehouse,
    Farm,
    #[serde(other)]
    Other,
}

/// Free-text property type labels seen on leads and property records
pub const PROPERTY_TYPE_SYNONYMS: &[(&str, PropertyType)] = &[
    ("apartment", PropertyType::Apartment),
    ("apartamento", PropertyType::Apartment),
    ("flat", PropertyType::Apartment),
    ("condo", PropertyType::Apartment),
    ("studio", PropertyType::Apartment),
    ("penthouse", PropertyType::Apartment),
    ("house", PropertyType::House),
    ("casa", PropertyType::House),
    ("moradia", PropertyType::House),
    ("villa", PropertyType::Villa),
    ("vivenda", PropertyType::Villa),
    ("townhouse", PropertyType::Townhouse),
    ("land", PropertyType::Land),
    ("plot", PropertyType::Land),
    ("terreno", PropertyType::Land),
    ("commercial", PropertyType::Commercial),
    ("comercial", PropertyType::Commercial),
    ("office", PropertyType::Office),
    ("escritorio", PropertyType::Office),
    ("escritório", PropertyType::Office),
    ("shop", PropertyType::Retail),
    ("store", PropertyType::Retail),
    ("retail", PropertyType::Retail),
    ("loja", PropertyType::Retail),
    ("warehouse", PropertyType::Warehouse),
    ("armazem", PropertyType::Warehouse),
    ("armazém", PropertyType::Warehouse),
    ("farm", PropertyType::Farm),
    ("quinta", PropertyType::Farm),
];

impl PropertyType {
    /// Map a free-form label such as "Apartment" or "moradia" to a type
    pub fn parse_loose(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        if value == "other" {
            return Some(Self::Other);
        }
        PROPERTY_TYPE_SYNONYMS
            .iter()
            .find(|(label, _)| *label == value)
            .map(|(_, property_type)| *property_type)
    }
}

fn loose_listing_type<'de, D>(deserializer: D) -> Result<Option<ListingType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| v.as_str()).and_then(ListingType::parse_loose))
}

fn loose_property_type<'de, D>(deserializer: D) -> Result<Option<PropertyType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| v.as_str()).and_then(PropertyType::parse_loose))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    Active,
    #[default]
    Inactive,
    #[serde(other)]
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Reserved,
    Sold,
    Rented,
    #[default]
    #[serde(other)]
    Unavailable,
}

/// Which resolver branch produced a requirement; selects the scoring table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequirementOrigin {
    Profile,
    Lead,
    #[default]
    None,
}

/// Normalized buyer requirement. Every field is optional; absence means
/// unconstrained.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerRequirement {
    #[serde(default)]
    pub listing_type: ListingType,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    /// Lower-cased place names
    #[serde(default)]
    pub locations: BTreeSet<String>,
    #[serde(default)]
    pub property_types: BTreeSet<PropertyType>,
    pub bedrooms_min: Option<u32>,
    pub bedrooms_max: Option<u32>,
    pub bathrooms_min: Option<u32>,
    pub area_min: Option<f64>,
    pub area_max: Option<f64>,
    #[serde(default)]
    pub origin: RequirementOrigin,
}

impl BuyerRequirement {
    /// True when no constraint at all is set (listing type `both` counts as none)
    pub fn is_empty(&self) -> bool {
        self.listing_type == ListingType::Both
            && self.budget_min.is_none()
            && self.budget_max.is_none()
            && self.locations.is_empty()
            && self.property_types.is_empty()
            && self.bedrooms_min.is_none()
            && self.bedrooms_max.is_none()
            && self.bathrooms_min.is_none()
            && self.area_min.is_none()
            && self.area_max.is_none()
    }

    /// One-line human summary, sent to the ranking oracle
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        match self.listing_type {
            ListingType::Sale => parts.push("for sale".to_string()),
            ListingType::Rent => parts.push("for rent".to_string()),
            ListingType::Both => {}
        }
        match (self.budget_min, self.budget_max) {
            (Some(min), Some(max)) => parts.push(format!("budget {:.0}-{:.0}", min, max)),
            (None, Some(max)) => parts.push(format!("budget up to {:.0}", max)),
            (Some(min), None) => parts.push(format!("budget from {:.0}", min)),
            (None, None) => {}
        }
        if !self.locations.is_empty() {
            let locations: Vec<&str> = self.locations.iter().map(String::as_str).collect();
            parts.push(format!("in {}", locations.join(" or ")));
        }
        if !self.property_types.is_empty() {
            let types: Vec<String> = self
                .property_types
                .iter()
                .map(|t| format!("{:?}", t).to_lowercase())
                .collect();
            parts.push(types.join("/"));
        }
        if let Some(min) = self.bedrooms_min {
            parts.push(format!("{}+ bedrooms", min));
        }
        if let Some(max) = self.bedrooms_max {
            parts.push(format!("at most {} bedrooms", max));
        }
        if let Some(min) = self.bathrooms_min {
            parts.push(format!("{}+ bathrooms", min));
        }
        if let Some(min) = self.area_min {
            parts.push(format!("from {:.0} m2", min));
        }
        if let Some(max) = self.area_max {
            parts.push(format!("up to {:.0} m2", max));
        }

        if parts.is_empty() {
            "no stated requirements".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Property document as stored in the backend. Most fields are optional and
/// read defensively; see [`PropertyCandidate`] for the normalized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRecord {
    #[serde(rename = "$id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "listingType", default, deserialize_with = "loose_listing_type")]
    pub listing_type: Option<ListingType>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(rename = "propertyType", default, deserialize_with = "loose_property_type")]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(rename = "usefulArea", default)]
    pub useful_area: Option<f64>,
    #[serde(rename = "squareFeet", default)]
    pub square_feet: Option<f64>,
    #[serde(default)]
    pub status: Option<PropertyStatus>,
    #[serde(default)]
    pub availability: Option<Availability>,
    #[serde(default)]
    pub amenities: Option<Vec<String>>,
}

/// Immutable snapshot of a property at matching time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyCandidate {
    pub id: String,
    pub title: String,
    pub listing_type: ListingType,
    pub price: f64,
    pub property_type: PropertyType,
    pub city: String,
    pub state: String,
    pub address: String,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub usable_area: Option<f64>,
    pub status: PropertyStatus,
    pub availability: Availability,
}

impl PropertyCandidate {
    pub fn is_listed(&self) -> bool {
        self.status == PropertyStatus::Active && self.availability == Availability::Available
    }

    /// Lower-cased `city state`, the haystack for location scoring
    pub fn locality(&self) -> String {
        format!("{} {}", self.city, self.state).to_lowercase()
    }

    /// Lower-cased `city state address`, the haystack for location filtering
    pub fn full_location(&self) -> String {
        format!("{} {} {}", self.city, self.state, self.address).to_lowercase()
    }

    /// Short description sent to the ranking oracle
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} ({:?}, {:?}) in {}, {} for {:.0}",
            self.title,
            self.property_type,
            self.listing_type,
            self.city,
            self.state,
            self.price
        );
        if let Some(bedrooms) = self.bedrooms {
            summary.push_str(&format!(", {} bedrooms", bedrooms));
        }
        if let Some(bathrooms) = self.bathrooms {
            summary.push_str(&format!(", {} bathrooms", bathrooms));
        }
        if let Some(area) = self.usable_area {
            summary.push_str(&format!(", {:.0} m2", area));
        }
        summary
    }
}

/// Why a stored property cannot take part in matching
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("property {0} has no price")]
    MissingPrice(String),
}

impl TryFrom<PropertyRecord> for PropertyCandidate {
    type Error = RecordError;

    fn try_from(record: PropertyRecord) -> Result<Self, Self::Error> {
        // An unknown price would pass every budget ceiling
        let price = match record.price {
            Some(price) if price.is_finite() => price,
            _ => return Err(RecordError::MissingPrice(record.id)),
        };
        let usable_area = record.useful_area.or(record.square_feet);
        Ok(Self {
            title: record.title.unwrap_or_else(|| record.id.clone()),
            id: record.id,
            listing_type: record.listing_type.unwrap_or(ListingType::Sale),
            price,
            property_type: record.property_type.unwrap_or(PropertyType::Other),
            city: record.city.unwrap_or_default(),
            state: record.state.unwrap_or_default(),
            address: record.address.unwrap_or_default(),
            bedrooms: record.bedrooms,
            bathrooms: record.bathrooms,
            usable_area,
            status: record.status.unwrap_or_default(),
            availability: record.availability.unwrap_or_default(),
        })
    }
}

/// Lead (opportunity) record with loose, free-text interest fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lead {
    #[serde(rename = "$id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(rename = "propertyInterest", default)]
    pub property_interest: Option<String>,
    #[serde(rename = "transactionType", default)]
    pub transaction_type: Option<String>,
    #[serde(rename = "buyerProfileId", default)]
    pub buyer_profile_id: Option<String>,
}

/// Structured buyer profile linked to a lead
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuyerProfile {
    #[serde(rename = "$id", alias = "id")]
    pub id: String,
    #[serde(rename = "leadId", default)]
    pub lead_id: Option<String>,
    #[serde(rename = "listingType", default, deserialize_with = "loose_listing_type")]
    pub listing_type: Option<ListingType>,
    #[serde(rename = "budgetMin", default)]
    pub budget_min: Option<f64>,
    #[serde(rename = "budgetMax", default)]
    pub budget_max: Option<f64>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(rename = "propertyTypes", default)]
    pub property_types: Vec<PropertyType>,
    #[serde(rename = "bedroomsMin", default)]
    pub bedrooms_min: Option<u32>,
    #[serde(rename = "bedroomsMax", default)]
    pub bedrooms_max: Option<u32>,
    #[serde(rename = "bathroomsMin", default)]
    pub bathrooms_min: Option<u32>,
    #[serde(rename = "areaMin", default)]
    pub area_min: Option<f64>,
    #[serde(rename = "areaMax", default)]
    pub area_max: Option<f64>,
}

/// Points contributed by one scoring factor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub factor: String,
    pub points: u32,
}

/// Ranked match, created fresh on every run and never persisted directly
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub property: PropertyCandidate,
    pub deterministic_score: u8,
    pub score_breakdown: Vec<ScoreFactor>,
    pub blended_score: u8,
    pub ai_score: Option<u8>,
    pub rationale: String,
    pub rank: usize,
    pub already_saved: bool,
}

/// Caller-driven lifecycle of a saved match; starts at `Interested`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavedMatchStatus {
    Interested,
    Visited,
    Rejected,
    Negotiating,
}

impl SavedMatchStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "interested" => Some(Self::Interested),
            "visited" => Some(Self::Visited),
            "rejected" => Some(Self::Rejected),
            "negotiating" => Some(Self::Negotiating),
            _ => None,
        }
    }
}

/// Durable association between a lead and a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMatch {
    pub lead_id: String,
    pub property_id: String,
    pub property_title: String,
    pub added_date: chrono::DateTime<chrono::Utc>,
    pub status: SavedMatchStatus,
    pub match_score: Option<i32>,
}

/// Caller-supplied details recorded when a match is saved
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMeta {
    pub property_title: Option<String>,
    pub match_score: Option<i32>,
}

/// Per-factor weights of one scoring table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub location: u32,
    pub budget: u32,
    pub property_type: u32,
    pub bedrooms: u32,
    pub area: u32,
    pub listing_type: u32,
}

impl ScoringWeights {
    /// Table used when an explicit buyer profile exists
    pub fn profile() -> Self {
        Self {
            location: 30,
            budget: 40,
            property_type: 15,
            bedrooms: 10,
            area: 5,
            listing_type: 0,
        }
    }

    /// Table used when requirements were inferred from loose lead fields
    pub fn fallback() -> Self {
        Self {
            location: 30,
            budget: 40,
            property_type: 20,
            bedrooms: 0,
            area: 0,
            listing_type: 10,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::profile()
    }
}

/// Multiplicative budget bands and the credit awarded in each tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetBands {
    pub full_low: f64,
    pub full_high: f64,
    pub near_low: f64,
    pub near_high: f64,
    pub far_high: f64,
    pub near_credit: f64,
    pub far_credit: f64,
}

impl BudgetBands {
    pub fn profile() -> Self {
        Self {
            full_low: 1.0,
            full_high: 1.0,
            near_low: 0.9,
            near_high: 1.1,
            far_high: 1.2,
            near_credit: 0.75,
            far_credit: 0.375,
        }
    }

    pub fn fallback() -> Self {
        Self {
            full_low: 0.7,
            full_high: 1.1,
            near_low: 0.5,
            near_high: 1.2,
            far_high: 1.5,
            near_credit: 0.75,
            far_credit: 0.375,
        }
    }
}

/// Eligibility tolerance multipliers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub budget_max: f64,
    pub budget_min: f64,
    pub area_min: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            budget_max: 1.10,
            budget_min: 0.80,
            area_min: 0.90,
        }
    }
}

/// Full scoring configuration: both tables with their bands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    pub profile_weights: ScoringWeights,
    pub profile_bands: BudgetBands,
    pub fallback_weights: ScoringWeights,
    pub fallback_bands: BudgetBands,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            profile_weights: ScoringWeights::profile(),
            profile_bands: BudgetBands::profile(),
            fallback_weights: ScoringWeights::fallback(),
            fallback_bands: BudgetBands::fallback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_prefers_useful_area() {
        let record: PropertyRecord = serde_json::from_value(serde_json::json!({
            "$id": "p1",
            "title": "Flat",
            "price": 250000.0,
            "usefulArea": 80.0,
            "squareFeet": 95.0,
            "status": "active",
            "availability": "available"
        }))
        .unwrap();

        let candidate = PropertyCandidate::try_from(record).unwrap();
        assert_eq!(candidate.usable_area, Some(80.0));
        assert!(candidate.is_listed());
    }

    #[test]
    fn test_candidate_falls_back_to_square_feet() {
        let record: PropertyRecord = serde_json::from_value(serde_json::json!({
            "$id": "p2",
            "price": 180000,
            "squareFeet": 120.0,
            "bedrooms": null
        }))
        .unwrap();

        let candidate = PropertyCandidate::try_from(record).unwrap();
        assert_eq!(candidate.usable_area, Some(120.0));
        assert_eq!(candidate.bedrooms, None);
        assert_eq!(candidate.title, "p2");
        assert!(!candidate.is_listed());
    }

    #[test]
    fn test_unknown_property_type_is_other() {
        let record: PropertyRecord = serde_json::from_value(serde_json::json!({
            "$id": "p3",
            "price": 100000,
            "propertyType": "castle"
        }))
        .unwrap();
        assert_eq!(record.property_type, None);

        let candidate = PropertyCandidate::try_from(record).unwrap();
        assert_eq!(candidate.property_type, PropertyType::Other);
    }

    #[test]
    fn test_record_accepts_loose_type_labels() {
        let cases = [
            ("venda", "Apartment", ListingType::Sale, PropertyType::Apartment),
            ("Sale", "apartamento", ListingType::Sale, PropertyType::Apartment),
            ("arrendamento", "moradia", ListingType::Rent, PropertyType::House),
            ("rent", "Vivenda", ListingType::Rent, PropertyType::Villa),
        ];

        for (listing, property, expected_listing, expected_property) in cases {
            let record: PropertyRecord = serde_json::from_value(serde_json::json!({
                "$id": "p4",
                "price": 300000,
                "listingType": listing,
                "propertyType": property
            }))
            .unwrap();
            assert_eq!(record.listing_type, Some(expected_listing), "{}", listing);
            assert_eq!(record.property_type, Some(expected_property), "{}", property);
        }
    }

    #[test]
    fn test_record_tolerates_unparseable_type_values() {
        let record: PropertyRecord = serde_json::from_value(serde_json::json!({
            "$id": "p5",
            "price": 300000,
            "listingType": 7,
            "propertyType": null
        }))
        .unwrap();
        assert_eq!(record.listing_type, None);
        assert_eq!(record.property_type, None);

        let profile: BuyerProfile = serde_json::from_value(serde_json::json!({
            "$id": "bp",
            "listingType": "Compra"
        }))
        .unwrap();
        assert_eq!(profile.listing_type, Some(ListingType::Sale));
    }

    #[test]
    fn test_record_without_price_is_rejected() {
        let record: PropertyRecord = serde_json::from_value(serde_json::json!({
            "$id": "p6",
            "status": "active",
            "availability": "available"
        }))
        .unwrap();

        assert_eq!(
            PropertyCandidate::try_from(record),
            Err(RecordError::MissingPrice("p6".to_string()))
        );
    }

    #[test]
    fn test_empty_requirement() {
        let requirement = BuyerRequirement::default();
        assert!(requirement.is_empty());
        assert_eq!(requirement.summary(), "no stated requirements");

        let requirement = BuyerRequirement {
            listing_type: ListingType::Rent,
            ..Default::default()
        };
        assert!(!requirement.is_empty());
    }

    #[test]
    fn test_listing_type_parse_loose() {
        assert_eq!(ListingType::parse_loose("Buy"), Some(ListingType::Sale));
        assert_eq!(ListingType::parse_loose(" arrendamento "), Some(ListingType::Rent));
        assert_eq!(ListingType::parse_loose("whatever"), None);
    }

    #[test]
    fn test_default_weight_tables() {
        let profile = ScoringWeights::profile();
        assert_eq!(
            profile.location + profile.budget + profile.property_type + profile.bedrooms + profile.area,
            100
        );
        let fallback = ScoringWeights::fallback();
        assert_eq!(
            fallback.location + fallback.budget + fallback.property_type + fallback.listing_type,
            100
        );
    }
}
