use serde::Deserialize;
use std::net::SocketAddr;
use validator::Validate;

use domain::models::{MapLocation, ModelTier};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    /// Generative AI service
    pub genai: GenAiConfig,
    /// Place photo search and image proxy
    #[serde(default)]
    pub image_search: ImageSearchConfig,
    #[serde(default)]
    pub studio: StudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Generation calls take seconds; keep this well above the genai timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Uploads carry inline base64 images.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Pool settings in the form the persistence layer expects.
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            busy_timeout_ms: self.busy_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenAiConfig {
    /// API key; when empty the offline mock stylist is used.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_genai_base_url")]
    pub base_url: String,

    #[serde(default = "default_flash_image_model")]
    pub flash_image_model: String,

    #[serde(default = "default_pro_image_model")]
    pub pro_image_model: String,

    #[serde(default = "default_flash_text_model")]
    pub flash_text_model: String,

    #[serde(default = "default_pro_text_model")]
    pub pro_text_model: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_genai_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts after an overload response; 0 disables retries.
    #[serde(default)]
    pub overload_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl GenAiConfig {
    pub fn image_model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Flash => &self.flash_image_model,
            ModelTier::Pro => &self.pro_image_model,
        }
    }

    pub fn text_model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Flash => &self.flash_text_model,
            ModelTier::Pro => &self.pro_text_model,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageSearchConfig {
    /// Image search endpoint returning `{items: [{link}]}`; the query is sent
    /// as `q`. Empty disables place photos.
    #[serde(default)]
    pub url: String,

    /// Proxy used when a background image cannot be fetched directly. The
    /// target is appended as `?url=`. Empty disables the fallback.
    #[serde(default)]
    pub proxy_url: String,

    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Responses at or below this size are treated as error pages.
    #[serde(default = "default_min_image_bytes")]
    pub min_image_bytes: usize,

    #[serde(default = "default_image_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ImageSearchConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            proxy_url: String::new(),
            max_images: default_max_images(),
            min_image_bytes: default_min_image_bytes(),
            timeout_ms: default_image_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudioConfig {
    #[serde(default = "default_map_lat")]
    pub default_lat: f64,

    #[serde(default = "default_map_lng")]
    pub default_lng: f64,

    #[serde(default = "default_map_zoom")]
    pub default_zoom: f64,

    #[serde(default = "default_toast_capacity")]
    pub toast_capacity: usize,

    #[serde(default = "default_toast_ttl_ms")]
    pub toast_ttl_ms: i64,

    /// Fetch the default garments into an empty closet at startup.
    #[serde(default = "default_true")]
    pub seed_default_wardrobe: bool,
}

impl StudioConfig {
    pub fn default_map_location(&self) -> MapLocation {
        MapLocation::new(self.default_lat, self.default_lng, self.default_zoom)
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            default_lat: default_map_lat(),
            default_lng: default_map_lng(),
            default_zoom: default_map_zoom(),
            toast_capacity: default_toast_capacity(),
            toast_ttl_ms: default_toast_ttl_ms(),
            seed_default_wardrobe: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    180
}
fn default_max_body_size() -> usize {
    20 * 1_048_576
}
fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_busy_timeout() -> u64 {
    5000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_genai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_flash_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}
fn default_pro_image_model() -> String {
    "gemini-3-pro-image-preview".to_string()
}
fn default_flash_text_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_pro_text_model() -> String {
    "gemini-3-pro-preview".to_string()
}
fn default_genai_timeout_ms() -> u64 {
    120_000
}
fn default_retry_backoff_ms() -> u64 {
    1_000
}
fn default_max_images() -> usize {
    4
}
fn default_min_image_bytes() -> usize {
    2000
}
fn default_image_timeout_ms() -> u64 {
    15_000
}
fn default_map_lat() -> f64 {
    21.0285
}
fn default_map_lng() -> f64 {
    105.8542
}
fn default_map_zoom() -> f64 {
    14.0
}
fn default_toast_capacity() -> usize {
    domain::services::toast::DEFAULT_TOAST_CAPACITY
}
fn default_toast_ttl_ms() -> i64 {
    domain::services::toast::DEFAULT_TOAST_TTL_MS
}
fn default_true() -> bool {
    true
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with SV__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("SV").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds entirely from embedded defaults and overrides, without touching
    /// config files.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "127.0.0.1"
            port = 8080
            request_timeout_secs = 180
            max_body_size = 20971520

            [database]
            url = "sqlite::memory:"
            max_connections = 1
            min_connections = 1
            connect_timeout_secs = 10
            busy_timeout_ms = 5000

            [logging]
            level = "info"
            format = "pretty"

            [security]
            cors_origins = []

            [genai]
            api_key = ""
            base_url = "https://generativelanguage.googleapis.com/v1beta"
            timeout_ms = 120000
            overload_retries = 0
            retry_backoff_ms = 1000

            [image_search]
            url = ""
            proxy_url = ""
            max_images = 4
            min_image_bytes = 2000
            timeout_ms = 15000

            [studio]
            toast_capacity = 5
            toast_ttl_ms = 4000
            seed_default_wardrobe = false
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        // Validation is skipped so tests can build partial configs.
        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SV__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.genai.base_url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "genai.base_url must be set".to_string(),
            ));
        }

        if self.studio.default_map_location().validate().is_err() {
            return Err(ConfigValidationError::InvalidValue(
                "studio default map location is out of range".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
