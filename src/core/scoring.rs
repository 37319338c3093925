use serde::{Deserialize, Serialize};

use crate::core::filters::matches_any_location;
use crate::models::{
    BudgetBands, BuyerRequirement, ListingType, PropertyCandidate, RequirementOrigin, ScoreFactor,
    ScoringConfig, ScoringWeights,
};

/// Score given when no factor is constrained
pub const NEUTRAL_SCORE: u8 = 50;

/// Deterministic compatibility score with its per-factor breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub score: u8,
    pub breakdown: Vec<ScoreFactor>,
}

/// Calculate a compatibility score (0-100) for a candidate
///
/// Only factors whose requirement field is present contribute to the
/// denominator:
///
/// score = round(achieved_points / sum(weights of present factors) * 100)
///
/// Requirements inferred from loose lead fields use the fallback table with
/// wider budget bands; everything else uses the profile table. The tables are
/// never mixed.
pub fn calculate_match_score(
    requirement: &BuyerRequirement,
    candidate: &PropertyCandidate,
    config: &ScoringConfig,
) -> ScoreCard {
    let (weights, bands) = match requirement.origin {
        RequirementOrigin::Lead => (&config.fallback_weights, &config.fallback_bands),
        RequirementOrigin::Profile | RequirementOrigin::None => {
            (&config.profile_weights, &config.profile_bands)
        }
    };

    let factors = score_factors(requirement, candidate, weights, bands);

    let possible: u32 = factors.iter().map(|f| f.possible).sum();
    let achieved: f64 = factors.iter().map(|f| f.achieved).sum();

    let score = if possible == 0 {
        NEUTRAL_SCORE
    } else {
        round_half_up(achieved / possible as f64 * 100.0).clamp(0.0, 100.0) as u8
    };

    let breakdown = factors
        .into_iter()
        .map(|f| ScoreFactor {
            factor: f.name.to_string(),
            points: round_half_up(f.achieved) as u32,
        })
        .collect();

    ScoreCard { score, breakdown }
}

struct FactorScore {
    name: &'static str,
    possible: u32,
    achieved: f64,
}

fn score_factors(
    requirement: &BuyerRequirement,
    candidate: &PropertyCandidate,
    weights: &ScoringWeights,
    bands: &BudgetBands,
) -> Vec<FactorScore> {
    let mut factors = Vec::with_capacity(6);
    let mut push = |name: &'static str, weight: u32, credit: f64| {
        if weight > 0 {
            factors.push(FactorScore {
                name,
                possible: weight,
                achieved: weight as f64 * credit,
            });
        }
    };

    if !requirement.locations.is_empty() {
        let credit = if matches_any_location(requirement, &candidate.locality()) { 1.0 } else { 0.0 };
        push("location", weights.location, credit);
    }

    if requirement.budget_min.is_some() || requirement.budget_max.is_some() {
        // A lead states one budget; its bands open below and above that figure
        let floor = match requirement.origin {
            RequirementOrigin::Lead => requirement.budget_min.or(requirement.budget_max),
            RequirementOrigin::Profile | RequirementOrigin::None => requirement.budget_min,
        };
        let credit = budget_credit(candidate.price, floor, requirement.budget_max, bands);
        push("budget", weights.budget, credit);
    }

    if !requirement.property_types.is_empty() {
        let credit = if requirement.property_types.contains(&candidate.property_type) {
            1.0
        } else {
            0.0
        };
        push("propertyType", weights.property_type, credit);
    }

    if requirement.bedrooms_min.is_some() || requirement.bedrooms_max.is_some() {
        let credit = bedrooms_credit(candidate.bedrooms, requirement.bedrooms_min, requirement.bedrooms_max);
        push("bedrooms", weights.bedrooms, credit);
    }

    if requirement.area_min.is_some() || requirement.area_max.is_some() {
        let credit = area_credit(candidate.usable_area, requirement.area_min, requirement.area_max);
        push("area", weights.area, credit);
    }

    if requirement.listing_type != ListingType::Both {
        let credit = if candidate.listing_type == requirement.listing_type { 1.0 } else { 0.0 };
        push("listingType", weights.listing_type, credit);
    }

    factors
}

/// Fraction (0-1) of the budget weight earned by a price
///
/// Three decreasing tiers: inside the full band, inside the near band, or
/// under the far ceiling. A missing bound leaves that side open. The far
/// tier has no floor.
pub fn budget_credit(price: f64, min: Option<f64>, max: Option<f64>, bands: &BudgetBands) -> f64 {
    let within = |low: Option<f64>, high: Option<f64>| {
        low.map_or(true, |low| price >= low) && high.map_or(true, |high| price <= high)
    };

    if within(min.map(|m| m * bands.full_low), max.map(|m| m * bands.full_high)) {
        1.0
    } else if within(min.map(|m| m * bands.near_low), max.map(|m| m * bands.near_high)) {
        bands.near_credit
    } else if within(None, max.map(|m| m * bands.far_high)) {
        bands.far_credit
    } else {
        0.0
    }
}

/// Full credit when every present bound holds, half when one of two does
#[inline]
fn bedrooms_credit(bedrooms: Option<u32>, min: Option<u32>, max: Option<u32>) -> f64 {
    let min_ok = min.map(|min| bedrooms.unwrap_or(0) >= min);
    let max_ok = max.map(|max| bedrooms.map_or(true, |b| b <= max));

    let checks: Vec<bool> = [min_ok, max_ok].into_iter().flatten().collect();
    let satisfied = checks.iter().filter(|ok| **ok).count();

    if satisfied == checks.len() {
        1.0
    } else if satisfied > 0 {
        0.5
    } else {
        0.0
    }
}

#[inline]
fn area_credit(area: Option<f64>, min: Option<f64>, max: Option<f64>) -> f64 {
    let min_ok = min.map_or(true, |min| area.map_or(false, |a| a >= min));
    let max_ok = max.map_or(true, |max| area.map_or(true, |a| a <= max));

    if min_ok && max_ok {
        1.0
    } else {
        0.0
    }
}

/// Round to the nearest integer, halves away from zero for non-negatives
#[inline]
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
