use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub admin_api_key: String,
    #[serde(default = "default_cancellation_token_days")]
    pub cancellation_token_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub max_capacity: u32,
    #[serde(default = "default_hold_ttl_minutes")]
    pub hold_ttl_minutes: i64,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    pub free_cancellation_days: i64,
    pub partial_refund_percentage: u32,
    pub no_refund_hours: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_hold_ttl_minutes() -> i64 {
    15
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

fn default_cancellation_token_days() -> i64 {
    7
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `KENNEL__BUSINESS_RULES__MAX_CAPACITY=8`
            .add_source(config::Environment::with_prefix("KENNEL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
