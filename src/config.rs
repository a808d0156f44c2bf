use crate::ml::spoilage_model::ThresholdProfile;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_PREDICTION_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOCATION: &str = "Delhi";
const DEFAULT_PACKAGING_QUALITY: &str = "good";

/// Spoilage estimation settings
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct SpoilageSettings {
    /// Base URL of the external prediction service; local estimation only when unset
    #[validate(url)]
    pub prediction_service_url: Option<String>,

    /// Timeout for a single prediction call, in seconds
    #[validate(range(min = 1, max = 300))]
    pub prediction_timeout_secs: u64,

    /// Threshold profile used when a request does not name one
    pub default_threshold_profile: ThresholdProfile,

    /// Location forwarded to the prediction service
    #[validate(length(min = 1))]
    pub default_location: String,

    /// Packaging quality forwarded to the prediction service
    #[validate(custom = "validate_packaging_quality")]
    pub default_packaging_quality: String,

    /// Optimal temperature per commodity, merged over the built-in table
    #[validate(custom = "validate_temperature_overrides")]
    pub optimal_temperature_overrides: HashMap<String, f64>,

    /// Risk multiplier per commodity, merged over the built-in table
    #[validate(custom = "validate_multiplier_overrides")]
    pub risk_multiplier_overrides: HashMap<String, f64>,
}

impl Default for SpoilageSettings {
    fn default() -> Self {
        Self {
            prediction_service_url: None,
            prediction_timeout_secs: DEFAULT_PREDICTION_TIMEOUT_SECS,
            default_threshold_profile: ThresholdProfile::Dashboard,
            default_location: DEFAULT_LOCATION.to_string(),
            default_packaging_quality: DEFAULT_PACKAGING_QUALITY.to_string(),
            optimal_temperature_overrides: HashMap::new(),
            risk_multiplier_overrides: HashMap::new(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Application environment
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// Spoilage estimation settings
    #[serde(default)]
    #[validate]
    pub spoilage: SpoilageSettings,
}

impl AppConfig {
    /// Creates a new configuration
    pub fn new(host: String, port: u16, environment: String) -> Self {
        Self {
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            spoilage: SpoilageSettings::default(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_packaging_quality(value: &str) -> Result<(), ValidationError> {
    match value {
        "poor" | "average" | "good" => Ok(()),
        _ => {
            let mut err = ValidationError::new("default_packaging_quality");
            err.message = Some("Must be one of: poor, average, good".into());
            Err(err)
        }
    }
}

fn validate_temperature_overrides(overrides: &HashMap<String, f64>) -> Result<(), ValidationError> {
    if overrides
        .iter()
        .any(|(name, value)| name.trim().is_empty() || !value.is_finite())
    {
        let mut err = ValidationError::new("optimal_temperature_overrides");
        err.message = Some("Overrides need a commodity name and a finite temperature".into());
        return Err(err);
    }
    Ok(())
}

fn validate_multiplier_overrides(overrides: &HashMap<String, f64>) -> Result<(), ValidationError> {
    if overrides
        .iter()
        .any(|(name, value)| name.trim().is_empty() || !value.is_finite() || *value <= 0.0)
    {
        let mut err = ValidationError::new("risk_multiplier_overrides");
        err.message = Some("Multipliers must be finite and greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("surplus2serve={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Same as [`load_config`] with an explicit config directory and profile.
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(
            File::with_name(&config_dir.join("default").to_string_lossy()).required(false),
        )
        .add_source(File::with_name(&config_dir.join(run_env).to_string_lossy()).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
