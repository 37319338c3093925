// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Availability, BudgetBands, BuyerProfile, BuyerRequirement, Lead, ListingType, MatchResult,
    PropertyCandidate, PropertyRecord, PropertyStatus, PropertyType, RecordError, RequirementOrigin,
    SaveMeta, SavedMatch, SavedMatchStatus, ScoreFactor, ScoringConfig, ScoringWeights,
    Tolerances, PROPERTY_TYPE_SYNONYMS,
};
pub use requests::{FindMatchesRequest, RemoveMatchRequest, SaveMatchRequest, UpdateStatusRequest};
pub use responses::{
    ErrorResponse, FindMatchesResponse, HealthResponse, RemoveMatchResponse, SavedMatchesResponse,
};
