use std::collections::HashSet;

use crate::core::{
    blender::{BlendedCandidate, ScoredCandidate},
    filters::filter_eligible,
    ranker::rank,
    scoring::calculate_match_score,
};
use crate::models::{BuyerRequirement, MatchResult, PropertyCandidate, ScoringConfig, Tolerances};

/// Result of the matching process
#[derive(Debug)]
pub struct MatchSet {
    pub matches: Vec<MatchResult>,
    pub total_candidates: usize,
    pub eligible_candidates: usize,
}

/// Deterministic part of the matching pipeline
///
/// # Pipeline Stages
/// 1. Eligibility filter (hard constraints with tolerance bands)
/// 2. Compatibility scoring
/// 3. Ranking and truncation
///
/// Oracle blending sits between stages 2 and 3 and lives in
/// [`crate::core::pipeline`], since it is the only stage that suspends.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    tolerances: Tolerances,
    scoring: ScoringConfig,
}

impl Matcher {
    pub fn new(tolerances: Tolerances, scoring: ScoringConfig) -> Self {
        Self { tolerances, scoring }
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Filter and score, keeping inventory order
    pub fn score_eligible(
        &self,
        requirement: &BuyerRequirement,
        inventory: &[PropertyCandidate],
    ) -> Vec<ScoredCandidate> {
        filter_eligible(requirement, inventory, &self.tolerances)
            .into_iter()
            .map(|property| {
                let card = calculate_match_score(requirement, &property, &self.scoring);
                ScoredCandidate { property, card }
            })
            .collect()
    }

    /// Rank an inventory against a requirement without the oracle
    ///
    /// # Arguments
    /// * `requirement` - Resolved buyer requirement
    /// * `inventory` - Inventory snapshot for this run
    /// * `limit` - Maximum number of matches to return
    /// * `saved_ids` - Property ids already saved for the lead
    pub fn find_matches(
        &self,
        requirement: &BuyerRequirement,
        inventory: &[PropertyCandidate],
        limit: usize,
        saved_ids: &HashSet<String>,
    ) -> MatchSet {
        let scored = self.score_eligible(requirement, inventory);
        let eligible_candidates = scored.len();

        let blended: Vec<BlendedCandidate> = scored.into_iter().map(Into::into).collect();

        MatchSet {
            matches: rank(blended, limit, saved_ids),
            total_candidates: inventory.len(),
            eligible_candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Availability, ListingType, PropertyStatus, PropertyType, RequirementOrigin};

    fn create_candidate(id: &str, price: f64, city: &str, bedrooms: u32) -> PropertyCandidate {
        PropertyCandidate {
            id: id.to_string(),
            title: format!("Property {}", id),
            listing_type: ListingType::Sale,
            price,
            property_type: PropertyType::Apartment,
            city: city.to_string(),
            state: String::new(),
            address: String::new(),
            bedrooms: Some(bedrooms),
            bathrooms: Some(1),
            usable_area: Some(70.0),
            status: PropertyStatus::Active,
            availability: Availability::Available,
        }
    }

    fn create_requirement() -> BuyerRequirement {
        BuyerRequirement {
            budget_max: Some(300_000.0),
            locations: ["lisboa".to_string()].into_iter().collect(),
            bedrooms_min: Some(2),
            origin: RequirementOrigin::Profile,
            ..Default::default()
        }
    }

    #[test]
    fn test_find_matches_basic() {
        let matcher = Matcher::default();

        let inventory = vec![
            create_candidate("a", 290_000.0, "Lisboa", 3),
            create_candidate("b", 500_000.0, "Porto", 2),
            create_candidate("c", 250_000.0, "Lisboa", 1),
        ];

        let result = matcher.find_matches(&create_requirement(), &inventory, 10, &HashSet::new());

        assert_eq!(result.total_candidates, 3);
        assert_eq!(result.eligible_candidates, 1);
        assert_eq!(result.matches[0].property.id, "a");
        assert_eq!(result.matches[0].blended_score, result.matches[0].deterministic_score);
    }

    #[test]
    fn test_matches_sorted_by_score() {
        let matcher = Matcher::default();

        let inventory = vec![
            create_candidate("near", 315_000.0, "Lisboa", 2),
            create_candidate("exact", 280_000.0, "Lisboa", 2),
        ];

        let result = matcher.find_matches(&create_requirement(), &inventory, 10, &HashSet::new());

        assert_eq!(result.matches.len(), 2);
        assert_eq!(result.matches[0].property.id, "exact");
        assert!(result.matches[0].blended_score > result.matches[1].blended_score);
    }

    #[test]
    fn test_respects_limit() {
        let matcher = Matcher::default();

        let inventory: Vec<PropertyCandidate> = (0..20)
            .map(|i| create_candidate(&i.to_string(), 200_000.0 + i as f64 * 1_000.0, "Lisboa", 2))
            .collect();

        let result = matcher.find_matches(&create_requirement(), &inventory, 5, &HashSet::new());

        assert_eq!(result.matches.len(), 5);
        assert_eq!(result.eligible_candidates, 20);
    }
}
