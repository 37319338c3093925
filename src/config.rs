use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::OracleLimits;
use crate::models::{BudgetBands, ScoringConfig, ScoringWeights, Tolerances};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub appwrite: AppwriteSettings,
    pub collection: CollectionSettings,
    /// Saved matches live in memory when absent
    #[serde(default)]
    pub database: Option<DatabaseSettings>,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub tolerances: Tolerances,
    #[serde(default)]
    pub bands: BandsSettings,
    #[serde(default)]
    pub oracle: OracleSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteSettings {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub database_id: String,
    pub timeout_secs: Option<u64>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSettings {
    pub properties: String,
    pub leads: String,
    pub buyer_profiles: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    /// L1-only when absent or unreachable
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_limit")]
    pub default_limit: u16,
    #[serde(default = "default_max_limit")]
    pub max_limit: u16,
    #[serde(default = "default_lead_oracle_top_n")]
    pub lead_oracle_top_n: usize,
    #[serde(default = "default_profile_oracle_top_n")]
    pub profile_oracle_top_n: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            lead_oracle_top_n: default_lead_oracle_top_n(),
            profile_oracle_top_n: default_profile_oracle_top_n(),
        }
    }
}

fn default_limit() -> u16 { 10 }
fn default_max_limit() -> u16 { 50 }
fn default_lead_oracle_top_n() -> usize { 10 }
fn default_profile_oracle_top_n() -> usize { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    #[serde(default = "ScoringWeights::profile")]
    pub profile: ScoringWeights,
    #[serde(default = "ScoringWeights::fallback")]
    pub fallback: ScoringWeights,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            profile: ScoringWeights::profile(),
            fallback: ScoringWeights::fallback(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BandsSettings {
    #[serde(default = "BudgetBands::profile")]
    pub profile: BudgetBands,
    #[serde(default = "BudgetBands::fallback")]
    pub fallback: BudgetBands,
}

impl Default for BandsSettings {
    fn default() -> Self {
        Self {
            profile: BudgetBands::profile(),
            fallback: BudgetBands::fallback(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleSettings {
    /// Blending is disabled when absent
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_oracle_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_responses")]
    pub cache_responses: bool,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_ms: default_oracle_timeout_ms(),
            cache_responses: default_cache_responses(),
        }
    }
}

fn default_oracle_timeout_ms() -> u64 { 8000 }
fn default_cache_responses() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with PROPMATCH_)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., PROPMATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("PROPMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("PROPMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn scoring_config(&self) -> ScoringConfig {
        ScoringConfig {
            profile_weights: self.scoring.profile,
            profile_bands: self.bands.profile,
            fallback_weights: self.scoring.fallback,
            fallback_bands: self.bands.fallback,
        }
    }

    pub fn oracle_limits(&self) -> OracleLimits {
        OracleLimits {
            lead_top_n: self.matching.lead_oracle_top_n,
            profile_top_n: self.matching.profile_oracle_top_n,
            timeout: Duration::from_millis(self.oracle.timeout_ms),
        }
    }
}

/// Apply well-known deployment variables on top of the layered config
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("DATABASE_URL", "database.url"),
        ("REDIS_URL", "cache.redis_url"),
        ("APPWRITE_ENDPOINT", "appwrite.endpoint"),
        ("APPWRITE_API_KEY", "appwrite.api_key"),
        ("APPWRITE_PROJECT_ID", "appwrite.project_id"),
        ("APPWRITE_DATABASE_ID", "appwrite.database_id"),
        ("ORACLE_ENDPOINT", "oracle.endpoint"),
        ("ORACLE_API_KEY", "oracle.api_key"),
    ];

    let mut builder = Config::builder().add_source(settings);

    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            if !value.is_empty() {
                builder = builder.set_override(key, value)?;
            }
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const MINIMAL: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 8080

        [appwrite]
        endpoint = "https://appwrite.test/v1"
        api_key = "key"
        project_id = "project"
        database_id = "crm"

        [collection]
        properties = "properties"
        leads = "leads"
        buyer_profiles = "buyer_profiles"
    "#;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_minimal_settings_use_defaults() {
        let settings = parse(MINIMAL);

        assert!(settings.database.is_none());
        assert!(settings.oracle.endpoint.is_none());
        assert!(settings.cache.redis_url.is_none());
        assert_eq!(settings.matching.default_limit, 10);
        assert_eq!(settings.tolerances, Tolerances::default());
        assert_eq!(settings.scoring_config(), ScoringConfig::default());

        let limits = settings.oracle_limits();
        assert_eq!(limits.lead_top_n, 10);
        assert_eq!(limits.profile_top_n, 5);
        assert_eq!(limits.timeout, Duration::from_millis(8000));
    }

    #[test]
    fn test_weight_and_tolerance_overrides() {
        let toml = format!(
            "{}\n{}",
            MINIMAL,
            r#"
            [scoring.fallback]
            location = 25
            budget = 45
            property_type = 20
            bedrooms = 0
            area = 0
            listing_type = 10

            [tolerances]
            budget_max = 1.2
            budget_min = 0.7
            area_min = 0.85
            "#
        );
        let settings = parse(&toml);

        assert_eq!(settings.scoring.fallback.location, 25);
        assert_eq!(settings.scoring.profile, ScoringWeights::profile());
        assert_eq!(settings.tolerances.budget_max, 1.2);
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }
}
