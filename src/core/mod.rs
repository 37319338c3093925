// Core algorithm exports
pub mod blender;
pub mod filters;
pub mod matcher;
pub mod pipeline;
pub mod ranker;
pub mod recommendations;
pub mod requirements;
pub mod scoring;

pub use blender::{Blender, OracleError, OracleRequest, RankingOracle};
pub use filters::{filter_eligible, is_eligible};
pub use matcher::{MatchSet, Matcher};
pub use pipeline::{InventorySource, MatchError, MatchOptions, MatchRun, MatchingPipeline, OracleLimits, RequirementSource, SourceError};
pub use ranker::rank;
pub use recommendations::{InMemoryRecommendationStore, RecommendationService, RecommendationStore, StoreError};
pub use requirements::resolve;
pub use scoring::{calculate_match_score, ScoreCard};
