//! Environment configuration for the API.
//!
//! Listening address and port are left to Rocket (`ROCKET_PORT`, `Rocket.toml`).

use phrase_ranker_common::db_util::DEFAULT_POOL_SIZE;
use std::env;

const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3001";

/// Deployment mode. Development mode adds internal details to error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("development") || v.eq_ignore_ascii_case("dev") => {
                AppEnv::Development
            }
            _ => AppEnv::Production,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Production => "production",
        }
    }
}

/// Which origins may make cross-origin requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    AllowAll,
    AllowList(Vec<String>),
}

impl CorsPolicy {
    /// Parse `*` or a comma-separated list of origins.
    pub fn parse(value: &str) -> Self {
        let origins: Vec<String> = value
            .split(',')
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if origins.iter().any(|o| o == "*") {
            CorsPolicy::AllowAll
        } else {
            CorsPolicy::AllowList(origins)
        }
    }

    /// The value for `Access-Control-Allow-Origin`, if the request origin is allowed.
    pub fn allowed_origin(&self, origin: Option<&str>) -> Option<String> {
        match self {
            CorsPolicy::AllowAll => Some("*".to_string()),
            CorsPolicy::AllowList(origins) => {
                let origin = origin?;
                origins
                    .iter()
                    .any(|o| o == origin)
                    .then(|| origin.to_string())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub app_env: AppEnv,
    pub cors: CorsPolicy,
    pub database_url: Option<String>,
    pub pool_size: u32,
}

impl ApiConfig {
    /// Read configuration from the environment, honoring a `.env` file.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let pool_size = match lookup("DATABASE_POOL_SIZE") {
            None => DEFAULT_POOL_SIZE,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(size) if size > 0 => size,
                _ => {
                    tracing::warn!(
                        value = %raw,
                        default = DEFAULT_POOL_SIZE,
                        "Invalid DATABASE_POOL_SIZE, using default"
                    );
                    DEFAULT_POOL_SIZE
                }
            },
        };

        Self {
            app_env: AppEnv::parse(lookup("APP_ENV").as_deref()),
            cors: CorsPolicy::parse(
                lookup("CORS_ALLOWED_ORIGINS")
                    .as_deref()
                    .unwrap_or(DEFAULT_ALLOWED_ORIGIN),
            ),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            pool_size,
        }
    }

    pub fn is_development(&self) -> bool {
        self.app_env == AppEnv::Development
    }

    /// Log which settings are present, without printing any secrets.
    pub fn log_summary(&self) {
        tracing::info!(
            app_env = self.app_env.as_str(),
            has_database_url = self.database_url.is_some(),
            cors = ?self.cors,
            pool_size = self.pool_size,
            "Environment check"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ApiConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.app_env, AppEnv::Production);
        assert_eq!(
            config.cors,
            CorsPolicy::AllowList(vec!["http://localhost:3001".to_string()])
        );
        assert_eq!(config.database_url, None);
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
    }

    #[test]
    fn test_from_lookup() {
        let config = config_from(&[
            ("APP_ENV", "development"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example/"),
            ("DATABASE_URL", "postgres://localhost/phrases"),
            ("DATABASE_POOL_SIZE", "4"),
        ]);
        assert!(config.is_development());
        assert_eq!(
            config.cors,
            CorsPolicy::AllowList(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/phrases")
        );
        assert_eq!(config.pool_size, 4);
    }

    #[test]
    fn test_invalid_pool_size_falls_back() {
        let config = config_from(&[("DATABASE_POOL_SIZE", "lots"), ("DATABASE_URL", " ")]);
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn test_cors_policy() {
        assert_eq!(CorsPolicy::parse("*"), CorsPolicy::AllowAll);
        assert_eq!(
            CorsPolicy::AllowAll.allowed_origin(None).as_deref(),
            Some("*")
        );

        let policy = CorsPolicy::parse("http://localhost:3001");
        assert_eq!(
            policy.allowed_origin(Some("http://localhost:3001")).as_deref(),
            Some("http://localhost:3001")
        );
        assert_eq!(policy.allowed_origin(Some("https://evil.example")), None);
        assert_eq!(policy.allowed_origin(None), None);
    }
}
