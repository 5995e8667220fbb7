use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::AnalysisError;

pub const DEFAULT_SEC_USER_AGENT: &str = "Financial Analysis Core research@example.com";
pub const DEFAULT_SEC_BASE_URL: &str = "https://data.sec.gov";
pub const DEFAULT_SEC_TICKER_MAP_URL: &str = "https://www.sec.gov/files/company_tickers.json";
pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";

/// Data sources that can be wired into the acquisition chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    SecEdgar,
    Yahoo,
}

impl FromStr for ProviderKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sec" | "sec_edgar" | "edgar" => Ok(ProviderKind::SecEdgar),
            "yahoo" | "yfinance" => Ok(ProviderKind::Yahoo),
            other => Err(AnalysisError::Config(format!("unknown provider '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    Redis,
    Memory,
    None,
}

impl FromStr for CacheBackendKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackendKind::Redis),
            "memory" | "in_memory" => Ok(CacheBackendKind::Memory),
            "none" | "off" | "disabled" => Ok(CacheBackendKind::None),
            other => Err(AnalysisError::Config(format!("unknown cache backend '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: i64,
    pub ttl: Duration,
    /// Bound on connecting + PING at construction time
    pub connect_timeout: Duration,
}

impl CacheConfig {
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/{}", self.redis_host, self.redis_port, self.redis_db)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Redis,
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_db: 0,
            ttl: Duration::from_secs(86_400),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// Immutable process configuration, built once at start-up and passed by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// The SEC requires "Company Name contact@example.com"
    pub sec_user_agent: String,
    pub sec_base_url: String,
    pub sec_ticker_map_url: String,
    /// Max SEC requests per second
    pub sec_rate_limit: usize,
    pub yahoo_base_url: String,
    pub yahoo_cookie_url: String,
    /// Bound on a single HTTP request
    pub request_timeout: Duration,
    /// Bound on one whole provider call, which may span several requests,
    /// rate-limiter waits and retries
    pub provider_timeout: Duration,
    pub num_historical_years: usize,
    /// Priority order, first entry is tried first for statements
    pub providers: Vec<ProviderKind>,
    pub cache: CacheConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sec_user_agent: DEFAULT_SEC_USER_AGENT.to_string(),
            sec_base_url: DEFAULT_SEC_BASE_URL.to_string(),
            sec_ticker_map_url: DEFAULT_SEC_TICKER_MAP_URL.to_string(),
            sec_rate_limit: 10,
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            yahoo_cookie_url: DEFAULT_YAHOO_COOKIE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            provider_timeout: Duration::from_secs(120),
            num_historical_years: 5,
            providers: vec![ProviderKind::SecEdgar, ProviderKind::Yahoo],
            cache: CacheConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Build from environment variables, falling back to defaults for anything unset.
    ///
    /// Malformed values are reported rather than silently replaced.
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("SEC_USER_AGENT") {
            config.sec_user_agent = v;
        }
        if let Some(v) = lookup("SEC_BASE_URL") {
            config.sec_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("SEC_TICKER_MAP_URL") {
            config.sec_ticker_map_url = v;
        }
        if let Some(v) = lookup("SEC_RATE_LIMIT") {
            config.sec_rate_limit = parse_number("SEC_RATE_LIMIT", &v)?;
        }
        if let Some(v) = lookup("YAHOO_BASE_URL") {
            config.yahoo_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("YAHOO_COOKIE_URL") {
            config.yahoo_cookie_url = v;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_number("REQUEST_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("PROVIDER_TIMEOUT_SECS") {
            config.provider_timeout = Duration::from_secs(parse_number("PROVIDER_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("NUM_HISTORICAL_YEARS") {
            config.num_historical_years = parse_number("NUM_HISTORICAL_YEARS", &v)?;
        }
        if let Some(v) = lookup("DATA_PROVIDERS") {
            config.providers = v
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(ProviderKind::from_str)
                .collect::<Result<Vec<_>, _>>()?;
        }

        if let Some(v) = lookup("CACHE_BACKEND") {
            config.cache.backend = v.parse()?;
        }
        if let Some(v) = lookup("REDIS_HOST") {
            config.cache.redis_host = v;
        }
        if let Some(v) = lookup("REDIS_PORT") {
            config.cache.redis_port = parse_number("REDIS_PORT", &v)?;
        }
        if let Some(v) = lookup("REDIS_DB") {
            config.cache.redis_db = parse_number("REDIS_DB", &v)?;
        }
        if let Some(v) = lookup("CACHE_TTL_SECS") {
            config.cache.ttl = Duration::from_secs(parse_number("CACHE_TTL_SECS", &v)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.providers.is_empty() {
            return Err(AnalysisError::Config("at least one data provider is required".into()));
        }
        if self.num_historical_years == 0 {
            return Err(AnalysisError::Config("NUM_HISTORICAL_YEARS must be positive".into()));
        }
        if self.sec_rate_limit == 0 {
            return Err(AnalysisError::Config("SEC_RATE_LIMIT must be positive".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(AnalysisError::Config("REQUEST_TIMEOUT_SECS must be positive".into()));
        }
        if self.provider_timeout < self.request_timeout {
            return Err(AnalysisError::Config(
                "PROVIDER_TIMEOUT_SECS must be at least REQUEST_TIMEOUT_SECS".into(),
            ));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, AnalysisError> {
    value
        .trim()
        .parse()
        .map_err(|_| AnalysisError::Config(format!("{} has invalid value '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = AnalysisConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.cache.redis_url(), "redis://localhost:6379/0");
    }

    #[test]
    fn test_overrides() {
        let config = AnalysisConfig::from_lookup(lookup_from(&[
            ("DATA_PROVIDERS", "yahoo, sec_edgar"),
            ("NUM_HISTORICAL_YEARS", "3"),
            ("CACHE_BACKEND", "memory"),
            ("REDIS_DB", "2"),
            ("SEC_BASE_URL", "http://localhost:9000/"),
        ]))
        .unwrap();

        assert_eq!(config.providers, vec![ProviderKind::Yahoo, ProviderKind::SecEdgar]);
        assert_eq!(config.num_historical_years, 3);
        assert_eq!(config.cache.backend, CacheBackendKind::Memory);
        assert_eq!(config.cache.redis_db, 2);
        assert_eq!(config.sec_base_url, "http://localhost:9000");
    }

    #[test]
    fn test_provider_timeout_bounds_whole_call() {
        let config = AnalysisConfig::from_lookup(lookup_from(&[
            ("REQUEST_TIMEOUT_SECS", "10"),
            ("PROVIDER_TIMEOUT_SECS", "45"),
        ]))
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.provider_timeout, Duration::from_secs(45));

        let err = AnalysisConfig::from_lookup(lookup_from(&[
            ("REQUEST_TIMEOUT_SECS", "30"),
            ("PROVIDER_TIMEOUT_SECS", "5"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = AnalysisConfig::from_lookup(lookup_from(&[("REDIS_PORT", "sixty")])).unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));

        let err = AnalysisConfig::from_lookup(lookup_from(&[("DATA_PROVIDERS", "bloomberg")])).unwrap_err();
        assert!(err.to_string().contains("bloomberg"));

        let err = AnalysisConfig::from_lookup(lookup_from(&[("DATA_PROVIDERS", " , ")])).unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }
}
