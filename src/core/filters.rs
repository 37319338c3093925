use crate::models::{BuyerRequirement, ListingType, PropertyCandidate, Tolerances};

/// Apply the hard constraints of a requirement to an inventory snapshot
///
/// Only active, available properties are ever eligible. Each rule is skipped
/// when its requirement field is absent; active rules are ANDed. The output
/// keeps the relative order of the input.
pub fn filter_eligible(
    requirement: &BuyerRequirement,
    inventory: &[PropertyCandidate],
    tolerances: &Tolerances,
) -> Vec<PropertyCandidate> {
    let listed = inventory.iter().filter(|candidate| candidate.is_listed());

    if requirement.is_empty() {
        return listed.cloned().collect();
    }

    listed
        .filter(|candidate| is_eligible(requirement, candidate, tolerances))
        .cloned()
        .collect()
}

/// Check a single candidate against every present hard rule
#[inline]
pub fn is_eligible(
    requirement: &BuyerRequirement,
    candidate: &PropertyCandidate,
    tolerances: &Tolerances,
) -> bool {
    if requirement.listing_type != ListingType::Both
        && candidate.listing_type != requirement.listing_type
    {
        return false;
    }

    if let Some(max) = requirement.budget_max {
        if candidate.price > max * tolerances.budget_max {
            return false;
        }
    }

    if let Some(min) = requirement.budget_min {
        if candidate.price < min * tolerances.budget_min {
            return false;
        }
    }

    if !requirement.locations.is_empty() && !matches_any_location(requirement, &candidate.full_location()) {
        return false;
    }

    if !requirement.property_types.is_empty()
        && !requirement.property_types.contains(&candidate.property_type)
    {
        return false;
    }

    // Unknown bedroom count fails a lower bound but never an upper one
    if let Some(min) = requirement.bedrooms_min {
        if candidate.bedrooms.unwrap_or(0) < min {
            return false;
        }
    }
    if let (Some(max), Some(bedrooms)) = (requirement.bedrooms_max, candidate.bedrooms) {
        if bedrooms > max {
            return false;
        }
    }

    if let Some(min) = requirement.area_min {
        match candidate.usable_area {
            Some(area) if area >= min * tolerances.area_min => {}
            _ => return false,
        }
    }

    if let Some(min) = requirement.bathrooms_min {
        match candidate.bathrooms {
            Some(bathrooms) if bathrooms >= min => {}
            _ => return false,
        }
    }

    true
}

/// True if any requirement location is a substring of the haystack
#[inline]
pub fn matches_any_location(requirement: &BuyerRequirement, haystack: &str) -> bool {
    requirement
        .locations
        .iter()
        .any(|location| haystack.contains(&location.to_lowercase()))
}
