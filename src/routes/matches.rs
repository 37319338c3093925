use actix_web::{web, HttpResponse, Responder};
use std::collections::{HashMap, HashSet};
use validator::Validate;

use crate::core::{MatchError, MatchOptions, MatchingPipeline, RecommendationService, SourceError, StoreError};
use crate::models::{
    ErrorResponse, FindMatchesRequest, FindMatchesResponse, HealthResponse, RemoveMatchRequest,
    RemoveMatchResponse, SaveMatchRequest, SaveMeta, SavedMatchStatus, SavedMatchesResponse,
    UpdateStatusRequest,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: MatchingPipeline,
    pub recommendations: RecommendationService,
    pub default_limit: u16,
    pub max_limit: u16,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_matches))
        .route("/matches/saved", web::get().to(list_saved))
        .route("/matches/saved", web::post().to(save_match))
        .route("/matches/saved", web::delete().to(remove_match))
        .route("/matches/saved/status", web::patch().to(update_status));
}

fn error_response(status_code: u16, error: &str, message: String) -> HttpResponse {
    let body = ErrorResponse {
        error: error.to_string(),
        message,
        status_code,
    };
    match status_code {
        400 => HttpResponse::BadRequest().json(body),
        404 => HttpResponse::NotFound().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

fn store_error_response(action: &str, e: StoreError) -> HttpResponse {
    match e {
        StoreError::NotFound(message) => error_response(404, "Saved match not found", message),
        other => {
            tracing::error!("Failed to {}: {}", action, other);
            error_response(500, &format!("Failed to {}", action), other.to_string())
        }
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.recommendations.health_check().await;

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Find matches endpoint
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "leadId": "string",
///   "limit": 10,
///   "useAi": true
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_matches request: {:?}", errors);
        return error_response(400, "Validation failed", errors.to_string());
    }

    let lead_id = &req.lead_id;
    let limit = req.limit.unwrap_or(state.default_limit).min(state.max_limit) as usize;

    tracing::info!("Finding matches for lead: {}, limit: {}", lead_id, limit);

    // Saved ids only flag results; a store outage must not block matching
    let saved_ids: HashSet<String> = match state.recommendations.list(lead_id).await {
        Ok(saved) => saved.into_iter().map(|s| s.property_id).collect(),
        Err(e) => {
            tracing::warn!("Failed to fetch saved matches for {}, proceeding without flags: {}", lead_id, e);
            HashSet::new()
        }
    };

    let options = MatchOptions {
        top_k: limit,
        use_oracle: req.use_ai,
        saved_ids,
        ..Default::default()
    };

    match state.pipeline.run_for_lead(lead_id, &options).await {
        Ok(run) => {
            tracing::info!(
                run_id = %run.run_id,
                "Returning {} matches for lead {} ({} of {} eligible)",
                run.matches.len(),
                lead_id,
                run.eligible_candidates,
                run.total_candidates
            );

            HttpResponse::Ok().json(FindMatchesResponse {
                run_id: run.run_id.to_string(),
                matches: run.matches,
                total_candidates: run.total_candidates,
                eligible_candidates: run.eligible_candidates,
                oracle_applied: run.oracle_applied,
            })
        }
        Err(MatchError::Lead(SourceError::NotFound(message))) => {
            error_response(404, "Lead not found", message)
        }
        Err(e) => {
            tracing::error!("Matching failed for {}: {}", lead_id, e);
            error_response(500, "Failed to find matches", e.to_string())
        }
    }
}

/// Saved matches for a lead
///
/// GET /api/v1/matches/saved?leadId={leadId}
async fn list_saved(
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let lead_id = match query.get("leadId") {
        Some(id) if !id.is_empty() => id,
        _ => {
            return error_response(
                400,
                "Missing leadId parameter",
                "leadId query parameter is required".to_string(),
            );
        }
    };

    match state.recommendations.list(lead_id).await {
        Ok(saved) => HttpResponse::Ok().json(SavedMatchesResponse {
            lead_id: lead_id.clone(),
            count: saved.len(),
            saved,
        }),
        Err(e) => store_error_response("fetch saved matches", e),
    }
}

/// Save a property for a lead
///
/// POST /api/v1/matches/saved
///
/// Saving an already saved property returns the existing record unchanged.
async fn save_match(
    state: web::Data<AppState>,
    req: web::Json<SaveMatchRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(400, "Validation failed", errors.to_string());
    }

    let req = req.into_inner();
    let meta = SaveMeta {
        property_title: req.property_title,
        match_score: req.match_score,
    };

    match state.recommendations.save(&req.lead_id, &req.property_id, meta).await {
        Ok(saved) => HttpResponse::Ok().json(saved),
        Err(e) => store_error_response("save match", e),
    }
}

/// DELETE /api/v1/matches/saved
async fn remove_match(
    state: web::Data<AppState>,
    req: web::Json<RemoveMatchRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(400, "Validation failed", errors.to_string());
    }

    match state.recommendations.remove(&req.lead_id, &req.property_id).await {
        Ok(()) => HttpResponse::Ok().json(RemoveMatchResponse { success: true }),
        Err(e) => store_error_response("remove match", e),
    }
}

/// Update the status of a saved match
///
/// PATCH /api/v1/matches/saved/status
///
/// Request body:
/// ```json
/// {
///   "leadId": "string",
///   "propertyId": "string",
///   "status": "interested|visited|rejected|negotiating"
/// }
/// ```
async fn update_status(
    state: web::Data<AppState>,
    req: web::Json<UpdateStatusRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(400, "Validation failed", errors.to_string());
    }

    let Some(status) = SavedMatchStatus::parse(&req.status) else {
        return error_response(
            400,
            "Invalid status",
            "Status must be one of: interested, visited, rejected, negotiating".to_string(),
        );
    };

    match state
        .recommendations
        .update_status(&req.lead_id, &req.property_id, status)
        .await
    {
        Ok(saved) => HttpResponse::Ok().json(saved),
        Err(e) => store_error_response("update match status", e),
    }
}
