use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use property_match::config::Settings;
use property_match::core::{
    InMemoryRecommendationStore, Matcher, MatchingPipeline, RankingOracle, RecommendationService,
    RecommendationStore,
};
use property_match::routes::{self, matches::AppState};
use property_match::services::{
    AppwriteClient, AppwriteCollections, CacheManager, CachedOracle, HttpRankingOracle, PostgresClient,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_logging(settings: Option<&Settings>) {
    // Environment wins over the [logging] section
    let log_level = std::env::var("LOG_LEVEL")
        .ok()
        .or_else(|| settings.map(|s| s.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT")
        .ok()
        .or_else(|| settings.map(|s| s.logging.format.clone()))
        .unwrap_or_else(|| "json".to_string());

    let filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let loaded = Settings::load();
    init_logging(loaded.as_ref().ok());

    info!("Starting property matching service...");

    let settings = loaded.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    info!("Configuration loaded successfully");

    // Initialize Appwrite client
    let appwrite_collections = AppwriteCollections {
        properties: settings.collection.properties.clone(),
        leads: settings.collection.leads.clone(),
        buyer_profiles: settings.collection.buyer_profiles.clone(),
    };

    let appwrite = AppwriteClient::new(
        settings.appwrite.endpoint.clone(),
        settings.appwrite.api_key.clone(),
        settings.appwrite.project_id.clone(),
        settings.appwrite.database_id.clone(),
        appwrite_collections,
        Duration::from_secs(settings.appwrite.timeout_secs.unwrap_or(10)),
    )
    .map_err(|e| {
        error!("Failed to build Appwrite client: {}", e);
        std::io::Error::other(e.to_string())
    })?;
    let appwrite = Arc::new(match settings.appwrite.page_size {
        Some(page_size) => appwrite.with_page_size(page_size),
        None => appwrite,
    });

    info!("Appwrite client initialized");

    // Initialize cache manager (Redis is optional)
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match settings.cache.redis_url.as_deref() {
        Some(redis_url) => match CacheManager::new(redis_url, l1_cache_size, cache_ttl).await {
            Ok(c) => {
                info!("Cache manager initialized (L1: {} entries, TTL: {}s, Redis)", l1_cache_size, cache_ttl);
                c
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), running with in-process cache only", e);
                CacheManager::local(l1_cache_size, cache_ttl)
            }
        },
        None => {
            info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
            CacheManager::local(l1_cache_size, cache_ttl)
        }
    };
    let cache = Arc::new(cache);

    // Initialize ranking oracle (optional)
    let oracle: Option<Arc<dyn RankingOracle>> = match settings.oracle.endpoint.clone() {
        Some(endpoint) => {
            let http = HttpRankingOracle::new(
                endpoint.clone(),
                settings.oracle.api_key.clone(),
                Duration::from_millis(settings.oracle.timeout_ms),
            )
            .map_err(|e| {
                error!("Failed to build ranking oracle client: {}", e);
                std::io::Error::other(e.to_string())
            })?;

            info!("Ranking oracle enabled at {}", endpoint);

            let http: Arc<dyn RankingOracle> = Arc::new(http);
            if settings.oracle.cache_responses {
                Some(Arc::new(CachedOracle::new(http, cache.clone())) as Arc<dyn RankingOracle>)
            } else {
                Some(http)
            }
        }
        None => {
            info!("No ranking oracle configured, using deterministic scores only");
            None
        }
    };

    // Initialize saved-match store
    let store: Arc<dyn RecommendationStore> = match &settings.database {
        Some(database) => {
            let max_conn = database.max_connections.unwrap_or(10);
            let postgres = PostgresClient::from_settings(
                &database.url,
                Some(max_conn),
                database.min_connections,
                database.acquire_timeout_secs,
                database.idle_timeout_secs,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                std::io::Error::other(format!("PostgreSQL connection error: {}", e))
            })?;

            info!("PostgreSQL client initialized (max: {} connections)", max_conn);
            Arc::new(postgres) as Arc<dyn RecommendationStore>
        }
        None => {
            warn!("No database configured, saved matches are kept in memory");
            Arc::new(InMemoryRecommendationStore::new())
        }
    };

    let matcher = Matcher::new(settings.tolerances, settings.scoring_config());

    info!("Matcher initialized with scoring: {:?}", matcher.scoring());

    let pipeline = MatchingPipeline::new(
        matcher,
        appwrite.clone(),
        appwrite,
        oracle,
        settings.oracle_limits(),
    );

    // Build application state
    let app_state = AppState {
        pipeline,
        recommendations: RecommendationService::new(store),
        default_limit: settings.matching.default_limit,
        max_limit: settings.matching.max_limit,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
