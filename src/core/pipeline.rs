use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::core::{
    blender::{Blender, RankingOracle},
    matcher::Matcher,
    ranker::rank,
    requirements::resolve,
};
use crate::models::{BuyerProfile, BuyerRequirement, Lead, MatchResult, PropertyCandidate, RequirementOrigin};

/// Errors from the inventory and requirement collaborators
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Errors that fail a whole matching run
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Failed to fetch lead: {0}")]
    Lead(#[source] SourceError),

    #[error("Failed to fetch inventory: {0}")]
    Inventory(#[source] SourceError),
}

/// Supplies the property inventory snapshot for a run
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn list_active_properties(&self) -> Result<Vec<PropertyCandidate>, SourceError>;
}

/// Supplies leads and their linked buyer profiles
#[async_trait]
pub trait RequirementSource: Send + Sync {
    async fn get_lead(&self, lead_id: &str) -> Result<Lead, SourceError>;

    /// `Ok(None)` when the lead has no linked profile
    async fn get_buyer_profile(&self, lead: &Lead) -> Result<Option<BuyerProfile>, SourceError>;
}

/// Session-scoped options for one run
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Result budget
    pub top_k: usize,
    /// How many candidates the oracle sees; `None` picks by call site
    pub oracle_top_n: Option<usize>,
    pub use_oracle: bool,
    /// Property ids already saved for the lead, flagged in results
    pub saved_ids: HashSet<String>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            oracle_top_n: None,
            use_oracle: true,
            saved_ids: HashSet::new(),
        }
    }
}

/// Outcome of a run. An empty `matches` list is a valid result.
#[derive(Debug)]
pub struct MatchRun {
    pub run_id: Uuid,
    pub requirement: BuyerRequirement,
    pub matches: Vec<MatchResult>,
    pub total_candidates: usize,
    pub eligible_candidates: usize,
    pub oracle_applied: bool,
}

/// Oracle fan-out per call site
#[derive(Debug, Clone, Copy)]
pub struct OracleLimits {
    pub lead_top_n: usize,
    pub profile_top_n: usize,
    pub timeout: Duration,
}

impl Default for OracleLimits {
    fn default() -> Self {
        Self {
            lead_top_n: 10,
            profile_top_n: 5,
            timeout: Duration::from_secs(8),
        }
    }
}

/// Full matching run: fetch, resolve, filter, score, blend, rank
///
/// Holds no per-run state, so concurrent runs for different leads need no
/// coordination.
#[derive(Clone)]
pub struct MatchingPipeline {
    matcher: Matcher,
    inventory: Arc<dyn InventorySource>,
    requirements: Arc<dyn RequirementSource>,
    oracle: Option<Arc<dyn RankingOracle>>,
    limits: OracleLimits,
}

impl MatchingPipeline {
    pub fn new(
        matcher: Matcher,
        inventory: Arc<dyn InventorySource>,
        requirements: Arc<dyn RequirementSource>,
        oracle: Option<Arc<dyn RankingOracle>>,
        limits: OracleLimits,
    ) -> Self {
        Self {
            matcher,
            inventory,
            requirements,
            oracle,
            limits,
        }
    }

    /// Rank the inventory for a lead
    ///
    /// Lead and inventory failures fail the run; a missing or unreadable
    /// buyer profile falls back to the lead's own fields.
    pub async fn run_for_lead(&self, lead_id: &str, options: &MatchOptions) -> Result<MatchRun, MatchError> {
        let lead = self
            .requirements
            .get_lead(lead_id)
            .await
            .map_err(MatchError::Lead)?;

        let profile = match self.requirements.get_buyer_profile(&lead).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("Buyer profile unavailable for lead {}, using lead fields: {}", lead_id, e);
                None
            }
        };

        let requirement = resolve(Some(&lead), profile.as_ref());
        self.run(requirement, options).await
    }

    /// Rank the inventory for an already resolved requirement
    pub async fn run(&self, requirement: BuyerRequirement, options: &MatchOptions) -> Result<MatchRun, MatchError> {
        let inventory = self
            .inventory
            .list_active_properties()
            .await
            .map_err(MatchError::Inventory)?;

        Ok(self.run_on_snapshot(requirement, &inventory, options).await)
    }

    /// Rank a given inventory snapshot; never fails
    pub async fn run_on_snapshot(
        &self,
        requirement: BuyerRequirement,
        inventory: &[PropertyCandidate],
        options: &MatchOptions,
    ) -> MatchRun {
        let run_id = Uuid::new_v4();

        let scored = self.matcher.score_eligible(&requirement, inventory);
        let eligible_candidates = scored.len();

        tracing::debug!(
            %run_id,
            "{} of {} properties eligible ({})",
            eligible_candidates,
            inventory.len(),
            requirement.summary()
        );

        let top_n = options.oracle_top_n.unwrap_or(match requirement.origin {
            RequirementOrigin::Profile => self.limits.profile_top_n,
            RequirementOrigin::Lead | RequirementOrigin::None => self.limits.lead_top_n,
        });
        let oracle = if options.use_oracle { self.oracle.as_deref() } else { None };

        let outcome = Blender::new(top_n, self.limits.timeout)
            .blend(&requirement, scored, oracle)
            .await;

        let matches = rank(outcome.candidates, options.top_k, &options.saved_ids);

        tracing::info!(
            %run_id,
            "Ranked {} matches from {} eligible (oracle applied: {})",
            matches.len(),
            eligible_candidates,
            outcome.oracle_applied
        );

        MatchRun {
            run_id,
            requirement,
            matches,
            total_candidates: inventory.len(),
            eligible_candidates,
            oracle_applied: outcome.oracle_applied,
        }
    }
}
