use domain::services::LoyaltySettings;
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    /// Verification of tokens issued by the identity service
    pub jwt: JwtAuthConfig,
    #[serde(default)]
    pub loyalty: LoyaltyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
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

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Per-user limit on the redemption endpoints; 0 disables limiting.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,

    /// Only behind TLS termination.
    #[serde(default)]
    pub hsts_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// RSA public key of the identity service, PEM
    pub public_key: String,

    /// Clock skew tolerance when checking `exp`
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

/// Loyalty tunables. Validity days of 0 mean "never expires".
#[derive(Debug, Clone, Deserialize)]
pub struct LoyaltyConfig {
    #[serde(default = "default_code_prefix")]
    pub code_prefix: String,

    #[serde(default = "default_code_length")]
    pub code_length: usize,

    #[serde(default = "default_coupon_prefix")]
    pub coupon_prefix: String,

    #[serde(default)]
    pub points_validity_days: i64,

    #[serde(default = "default_coupon_validity_days")]
    pub coupon_validity_days: i64,

    #[serde(default = "default_max_transaction_attempts")]
    pub max_transaction_attempts: u32,

    #[serde(default = "default_recent_transactions_limit")]
    pub recent_transactions_limit: usize,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            code_prefix: default_code_prefix(),
            code_length: default_code_length(),
            coupon_prefix: default_coupon_prefix(),
            points_validity_days: 0,
            coupon_validity_days: default_coupon_validity_days(),
            max_transaction_attempts: default_max_transaction_attempts(),
            recent_transactions_limit: default_recent_transactions_limit(),
        }
    }
}

impl LoyaltyConfig {
    pub fn to_settings(&self) -> LoyaltySettings {
        let days = |d: i64| (d > 0).then_some(d);
        LoyaltySettings {
            code_prefix: self.code_prefix.clone(),
            code_length: self.code_length,
            coupon_prefix: self.coupon_prefix.clone(),
            points_validity_days: days(self.points_validity_days),
            coupon_validity_days: days(self.coupon_validity_days),
            max_transaction_attempts: self.max_transaction_attempts,
            recent_transactions_limit: self.recent_transactions_limit,
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
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_rate_limit() -> u32 {
    30
}
fn default_jwt_leeway() -> u64 {
    shared::jwt::DEFAULT_LEEWAY_SECS
}
fn default_code_prefix() -> String {
    shared::codes::DEFAULT_LOYALTY_CODE_PREFIX.to_string()
}
fn default_code_length() -> usize {
    shared::codes::DEFAULT_CODE_LENGTH
}
fn default_coupon_prefix() -> String {
    shared::codes::DEFAULT_COUPON_PREFIX.to_string()
}
fn default_coupon_validity_days() -> i64 {
    30
}
fn default_max_transaction_attempts() -> u32 {
    3
}
fn default_recent_transactions_limit() -> usize {
    5
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
    /// 3. Environment variables with LOYALTY__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("LOYALTY").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration from embedded defaults plus overrides, without
    /// touching the file system. Validation is skipped.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""
            max_connections = 5
            min_connections = 1
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            rate_limit_per_minute = 30
            hsts_enabled = false

            [jwt]
            public_key = ""
            leeway_secs = 30

            [loyalty]
            code_prefix = "LP-"
            code_length = 8
            coupon_prefix = "RW-"
            points_validity_days = 0
            coupon_validity_days = 30
            max_transaction_attempts = 3
            recent_transactions_limit = 5
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "LOYALTY__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.jwt.public_key.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "LOYALTY__JWT__PUBLIC_KEY environment variable must be set".to_string(),
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

        if self.loyalty.max_transaction_attempts == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "loyalty.max_transaction_attempts must be at least 1".to_string(),
            ));
        }

        if self.loyalty.code_length < 4 {
            return Err(ConfigValidationError::InvalidValue(
                "loyalty.code_length must be at least 4".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
