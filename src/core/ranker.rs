use std::collections::HashSet;

use crate::core::blender::BlendedCandidate;
use crate::models::MatchResult;

/// Order blended candidates and keep the best `k`
///
/// Sorting is stable on `blended_score` descending, so equal scores keep the
/// order they arrived in (the scorer's order, which is inventory order). `k`
/// larger than the input simply returns everything. Ranks start at 1.
pub fn rank(
    mut candidates: Vec<BlendedCandidate>,
    k: usize,
    saved_ids: &HashSet<String>,
) -> Vec<MatchResult> {
    candidates.sort_by(|a, b| b.blended_score.cmp(&a.blended_score));
    candidates.truncate(k);

    candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| MatchResult {
            already_saved: saved_ids.contains(&c.property.id),
            property: c.property,
            deterministic_score: c.deterministic_score,
            score_breakdown: c.breakdown,
            blended_score: c.blended_score,
            ai_score: c.ai_score,
            rationale: c.rationale,
            rank: i + 1,
        })
        .collect()
}
