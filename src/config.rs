use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_PUBLIC_ORIGIN: &str = "http://localhost:8080";
const DEFAULT_SHOP_PATH: &str = "/shop";
const DEFAULT_IDRAM_CHECKOUT_URL: &str = "https://idram.am/checkout/placeholder";
const DEFAULT_PAYONEER_CHECKOUT_URL: &str = "https://checkout.payoneer.com/placeholder";
const DEFAULT_WALLET_ENDPOINT: &str = "https://bank.am/applepay/placeholder";
const DEFAULT_USD_TO_AMD_RATE: i64 = 390;
const DEFAULT_WALLET_DELAY_MS: u64 = 1500;
const DEFAULT_HOME_COUNTRY: &str = "Armenia";
const DEFAULT_DOMESTIC_RATE_USD: i64 = 5;
const DEFAULT_INTERNATIONAL_RATE_USD: i64 = 15;
const DEFAULT_CARRIER: &str = "DHL International Express";
const DEFAULT_STORAGE_BACKEND: &str = "in-memory";
const DEFAULT_STORAGE_PATH: &str = "data";
const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;
const DEFAULT_SESSION_SWEEP_SECS: u64 = 60;

/// Payment gateway configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Idram hosted checkout (regional rail, settles in AMD)
    #[validate(custom = "validate_absolute_url")]
    pub idram_checkout_url: String,

    /// Payoneer hosted checkout (international rail, settles in USD)
    #[validate(custom = "validate_absolute_url")]
    pub payoneer_checkout_url: String,

    /// Bank endpoint for Apple Pay / Google Pay authorisations
    #[validate(custom = "validate_absolute_url")]
    pub wallet_endpoint: String,

    /// USD to AMD exchange rate used for every AMD amount
    #[validate(custom = "validate_exchange_rate")]
    pub usd_to_amd_rate: Decimal,

    /// Simulated wallet authorisation latency in milliseconds
    pub wallet_delay_ms: u64,

    /// Outcome of the simulated wallet authorisation: "success" or "failure"
    #[validate(custom = "validate_wallet_simulation")]
    pub wallet_simulation: String,

    /// Shared secret for verifying gateway callbacks
    pub callback_secret: Option<String>,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            idram_checkout_url: DEFAULT_IDRAM_CHECKOUT_URL.to_string(),
            payoneer_checkout_url: DEFAULT_PAYONEER_CHECKOUT_URL.to_string(),
            wallet_endpoint: DEFAULT_WALLET_ENDPOINT.to_string(),
            usd_to_amd_rate: Decimal::from(DEFAULT_USD_TO_AMD_RATE),
            wallet_delay_ms: DEFAULT_WALLET_DELAY_MS,
            wallet_simulation: "success".to_string(),
            callback_secret: None,
        }
    }
}

/// Shipping rules configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default)]
pub struct ShippingConfig {
    /// Country that gets the domestic rate and the regional rail
    #[validate(length(min = 2))]
    pub home_country: String,

    /// Extra spellings of the home country (compared lower-cased)
    pub home_country_aliases: Vec<String>,

    #[validate(custom = "validate_non_negative")]
    pub domestic_rate_usd: Decimal,

    #[validate(custom = "validate_non_negative")]
    pub international_rate_usd: Decimal,

    pub carrier: String,

    pub domestic_estimate: String,

    pub international_estimate: String,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            home_country: DEFAULT_HOME_COUNTRY.to_string(),
            home_country_aliases: vec!["am".to_string()],
            domestic_rate_usd: Decimal::from(DEFAULT_DOMESTIC_RATE_USD),
            international_rate_usd: Decimal::from(DEFAULT_INTERNATIONAL_RATE_USD),
            carrier: DEFAULT_CARRIER.to_string(),
            domestic_estimate: "2-3 business days".to_string(),
            international_estimate: "5-7 business days".to_string(),
        }
    }
}

/// Order storage configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default)]
pub struct StorageConfig {
    /// "in-memory" or "file"
    #[validate(custom = "validate_storage_backend")]
    pub backend: String,

    /// Directory holding the order collection when the file backend is used
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_STORAGE_BACKEND.to_string(),
            path: DEFAULT_STORAGE_PATH.to_string(),
        }
    }
}

/// Shopper session retention
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default)]
pub struct SessionsConfig {
    /// Sessions untouched for this long are dropped
    #[validate(range(min = 1))]
    pub idle_timeout_secs: u64,

    /// How often idle sessions are swept
    #[validate(range(min = 1))]
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_SESSION_IDLE_SECS,
            sweep_interval_secs: DEFAULT_SESSION_SWEEP_SECS,
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
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Absolute origin of the storefront, used to build gateway return URLs
    #[serde(default = "default_public_origin")]
    #[validate(custom = "validate_absolute_url")]
    pub public_origin: String,

    /// Where shoppers land when an order cannot be found
    #[serde(default = "default_shop_path")]
    pub shop_path: String,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default)]
    #[validate]
    pub payments: PaymentsConfig,

    #[serde(default)]
    #[validate]
    pub shipping: ShippingConfig,

    #[serde(default)]
    #[validate]
    pub storage: StorageConfig,

    #[serde(default)]
    #[validate]
    pub sessions: SessionsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            environment: DEFAULT_ENV.to_string(),
            log_level: default_log_level(),
            log_json: false,
            public_origin: default_public_origin(),
            shop_path: default_shop_path(),
            cors_allowed_origins: None,
            payments: PaymentsConfig::default(),
            shipping: ShippingConfig::default(),
            storage: StorageConfig::default(),
            sessions: SessionsConfig::default(),
        }
    }
}

impl AppConfig {
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

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Simulated wallet latency as a Duration
    pub fn wallet_delay(&self) -> Duration {
        Duration::from_millis(self.payments.wallet_delay_ms)
    }

    /// Whether the simulated wallet should reject authorisations
    pub fn wallet_simulates_failure(&self) -> bool {
        self.payments.wallet_simulation.eq_ignore_ascii_case("failure")
    }

    /// Whether orders go to the file-backed store
    pub fn uses_file_storage(&self) -> bool {
        self.storage.backend.eq_ignore_ascii_case("file")
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.sessions.idle_timeout_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sessions.sweep_interval_secs)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_public_origin() -> String {
    DEFAULT_PUBLIC_ORIGIN.to_string()
}

fn default_shop_path() -> String {
    DEFAULT_SHOP_PATH.to_string()
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

fn validate_absolute_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(parsed) if parsed.has_host() => Ok(()),
        _ => {
            let mut err = ValidationError::new("absolute_url");
            err.message = Some("Must be an absolute http(s) URL".into());
            Err(err)
        }
    }
}

fn validate_exchange_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if rate.is_sign_negative() || rate.is_zero() {
        let mut err = ValidationError::new("usd_to_amd_rate");
        err.message = Some("usd_to_amd_rate must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

fn validate_non_negative(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() {
        let mut err = ValidationError::new("shipping_rate");
        err.message = Some("Shipping rates cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

fn validate_storage_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "in-memory" | "file" => Ok(()),
        _ => {
            let mut err = ValidationError::new("storage_backend");
            err.message = Some("Must be one of: in-memory, file".into());
            Err(err)
        }
    }
}

fn validate_wallet_simulation(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "success" | "failure" => Ok(()),
        _ => {
            let mut err = ValidationError::new("wallet_simulation");
            err.message = Some("Must be one of: success, failure".into());
            Err(err)
        }
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("simona_checkout={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration from the `config` directory
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Same as [`load_config`] with an explicit configuration directory.
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("host", DEFAULT_HOST)?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
