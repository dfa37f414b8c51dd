use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Token lifetime in days.
    pub token_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JudgeConfig {
    /// Base URL of the Judge0-compatible service.
    pub url: String,
    /// Optional `X-Auth-Token` value for hosted deployments.
    pub api_key: Option<String>,
    /// How long to wait for a single execution before giving up.
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    /// Max submissions per user per minute. 0 disables rate limiting.
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub judge: JudgeConfig,
    pub submission: SubmissionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("auth.token_days", 7)?
            .set_default("judge.timeout_secs", 30)?
            .set_default("submission.rate_limit_per_minute", 10)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., SPROUT__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("SPROUT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
