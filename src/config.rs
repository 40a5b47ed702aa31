use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub chainlink_api_url: String,
    pub pyth_api_url: String,
    /// Deadline imposed on each oracle HTTP call. The oracle itself never
    /// retries; without a timeout a dead feed would stall the request.
    pub oracle_timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let chainlink_api_url = env_map
            .get("CHAINLINK_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.chainlink.com".to_string());

        let pyth_api_url = env_map
            .get("PYTH_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.pyth.network".to_string());

        let oracle_timeout_ms = env_map
            .get("ORACLE_TIMEOUT_MS")
            .map(|s| s.as_str())
            .unwrap_or("5000")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "ORACLE_TIMEOUT_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            chainlink_api_url,
            pyth_api_url,
            oracle_timeout_ms,
        })
    }
}
