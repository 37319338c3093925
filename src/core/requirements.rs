use crate::models::{
    BuyerProfile, BuyerRequirement, Lead, ListingType, PropertyType, RequirementOrigin,
    PROPERTY_TYPE_SYNONYMS,
};

/// Room-count shorthand and what it implies
#[derive(Debug, Clone, Copy)]
pub struct RoomHint {
    pub token: &'static str,
    pub bedrooms: u32,
    pub property_type: Option<PropertyType>,
}

pub const ROOM_HINTS: &[RoomHint] = &[
    RoomHint { token: "t0", bedrooms: 0, property_type: Some(PropertyType::Apartment) },
    RoomHint { token: "t1", bedrooms: 1, property_type: Some(PropertyType::Apartment) },
    RoomHint { token: "t2", bedrooms: 2, property_type: Some(PropertyType::Apartment) },
    RoomHint { token: "t3", bedrooms: 3, property_type: Some(PropertyType::Apartment) },
    RoomHint { token: "t4", bedrooms: 4, property_type: Some(PropertyType::Apartment) },
    RoomHint { token: "t5", bedrooms: 5, property_type: Some(PropertyType::Apartment) },
    RoomHint { token: "1 bedroom", bedrooms: 1, property_type: None },
    RoomHint { token: "2 bedrooms", bedrooms: 2, property_type: None },
    RoomHint { token: "3 bedrooms", bedrooms: 3, property_type: None },
    RoomHint { token: "4 bedrooms", bedrooms: 4, property_type: None },
    RoomHint { token: "5 bedrooms", bedrooms: 5, property_type: None },
    RoomHint { token: "1 quarto", bedrooms: 1, property_type: None },
    RoomHint { token: "2 quartos", bedrooms: 2, property_type: None },
    RoomHint { token: "3 quartos", bedrooms: 3, property_type: None },
    RoomHint { token: "4 quartos", bedrooms: 4, property_type: None },
    RoomHint { token: "5 quartos", bedrooms: 5, property_type: None },
];

// Shorter fragments would match almost every label in the reverse direction.
const MIN_REVERSE_MATCH_LEN: usize = 2;

/// Build a requirement for a lead, preferring its linked buyer profile
pub fn resolve(lead: Option<&Lead>, profile: Option<&BuyerProfile>) -> BuyerRequirement {
    if let Some(profile) = profile {
        return from_profile(profile);
    }

    match lead {
        Some(lead) => from_lead(lead),
        None => BuyerRequirement::default(),
    }
}

/// Explicit profile fields pass through verbatim
pub fn from_profile(profile: &BuyerProfile) -> BuyerRequirement {
    BuyerRequirement {
        listing_type: profile.listing_type.unwrap_or_default(),
        budget_min: profile.budget_min,
        budget_max: profile.budget_max,
        locations: profile
            .locations
            .iter()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect(),
        property_types: profile.property_types.iter().copied().collect(),
        bedrooms_min: profile.bedrooms_min,
        bedrooms_max: profile.bedrooms_max,
        bathrooms_min: profile.bathrooms_min,
        area_min: profile.area_min,
        area_max: profile.area_max,
        origin: RequirementOrigin::Profile,
    }
}

/// Infer a requirement from a lead's loose fields
pub fn from_lead(lead: &Lead) -> BuyerRequirement {
    let mut requirement = BuyerRequirement {
        origin: RequirementOrigin::Lead,
        ..Default::default()
    };

    if let Some(location) = lead.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        requirement.locations.insert(location.to_lowercase());
    }

    // A single budget figure is a ceiling, never a floor
    requirement.budget_max = lead.budget;

    if let Some(listing_type) = lead
        .transaction_type
        .as_deref()
        .and_then(ListingType::parse_loose)
    {
        requirement.listing_type = listing_type;
    }

    if let Some(interest) = lead.property_interest.as_deref() {
        let interest = interest.trim().to_lowercase();
        if !interest.is_empty() {
            for (label, property_type) in PROPERTY_TYPE_SYNONYMS {
                if contains_either_way(label, &interest) {
                    requirement.property_types.insert(*property_type);
                }
            }
            // Room counts only come from tokens written out in full
            for hint in ROOM_HINTS {
                if interest.contains(hint.token) {
                    requirement.bedrooms_min = Some(
                        requirement
                            .bedrooms_min
                            .map_or(hint.bedrooms, |current| current.max(hint.bedrooms)),
                    );
                    if let Some(property_type) = hint.property_type {
                        requirement.property_types.insert(property_type);
                    }
                }
            }
        }
    }

    tracing::trace!(lead_id = %lead.id, summary = %requirement.summary(), "Resolved lead requirement");

    requirement
}

/// Case-insensitive substring containment in both directions
fn contains_either_way(label: &str, interest: &str) -> bool {
    interest.contains(label)
        || (interest.chars().count() >= MIN_REVERSE_MATCH_LEN && label.contains(interest))
}
