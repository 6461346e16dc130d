use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    /// External structured-parsing service. Optional — absence means the
    /// extraction chain skips straight to local extraction.
    pub parser_api_url: Option<String>,
    pub parser_api_key: Option<String>,
    /// Whether pipelines append the delayed explanation stage.
    pub explanations_enabled: bool,
    /// Delay before the explanation stage runs, in seconds.
    pub explain_delay_secs: u64,
    pub worker_count: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            parser_api_url: std::env::var("PARSER_API_URL").ok().filter(|s| !s.is_empty()),
            parser_api_key: std::env::var("PARSER_API_KEY").ok().filter(|s| !s.is_empty()),
            explanations_enabled: std::env::var("EXPLANATIONS_ENABLED")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            explain_delay_secs: std::env::var("EXPLAIN_DELAY_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .context("EXPLAIN_DELAY_SECS must be a number of seconds")?,
            worker_count: std::env::var("WORKER_COUNT")
                .unwrap_or_else(|_| "4".to_string())
                .parse::<usize>()
                .context("WORKER_COUNT must be a positive integer")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
