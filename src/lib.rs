//! Property Match - matching engine for the real-estate CRM
//!
//! Ranks the active property inventory against a lead's buying requirements.
//! A run resolves the requirement, filters by hard constraints, scores the
//! survivors deterministically, optionally blends in an external ranking
//! oracle, and returns the top results. Saved matches are kept per lead.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    calculate_match_score, filter_eligible, rank, resolve, MatchOptions, MatchRun, Matcher,
    MatchingPipeline, RecommendationService,
};
pub use models::{
    BuyerRequirement, FindMatchesRequest, FindMatchesResponse, MatchResult, PropertyCandidate,
    SavedMatch, ScoringConfig, ScoringWeights,
};
