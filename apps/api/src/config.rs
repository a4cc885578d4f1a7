use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Base URL of the AI services (question generation, JD parsing, shortlisting, resume RAG).
    pub ai_backend_url: String,
    /// Base URL of the job/application CRUD and auth API.
    pub app_backend_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Enables development-only affordances such as break-even payouts.
    pub dev_mode: bool,
    pub store_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            s3_region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            ai_backend_url: trim_base_url(require_env("AI_BACKEND_URL")?),
            app_backend_url: trim_base_url(require_env("APP_BACKEND_URL")?),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            dev_mode: parse_flag(std::env::var("HIREPATH_DEV_MODE").ok().as_deref()),
            store_ttl_secs: std::env::var("STORE_TTL_SECS")
                .unwrap_or_else(|_| "604800".to_string())
                .parse::<u64>()
                .context("STORE_TTL_SECS must be a number of seconds")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_variants() {
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some(" TRUE ")));
        assert!(parse_flag(Some("1")));
        assert!(!parse_flag(Some("false")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn test_trim_base_url_strips_trailing_slash() {
        assert_eq!(
            trim_base_url("http://localhost:3000/".to_string()),
            "http://localhost:3000"
        );
    }
}
