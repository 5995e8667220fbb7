pub mod extractor;
pub mod facts;
pub mod provider;
pub mod resolver;

pub use extractor::{extract_statements, Metric, MetricSpec, METRIC_DICTIONARY};
pub use facts::{CompanyFacts, FactEntry, RawFactPoint, TagFacts};
pub use provider::SecEdgarProvider;
pub use resolver::{TickerEntry, TickerResolver};

use analysis_core::{AnalysisConfig, AnalysisError};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const MAX_ATTEMPTS: u32 = 3;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            let oldest = match ts.front() {
                Some(&oldest) if ts.len() >= self.max_requests => oldest,
                _ => {
                    ts.push_back(now);
                    return;
                }
            };

            // Wait until the oldest request falls out of the window
            let sleep_dur = (oldest + self.window).saturating_duration_since(now) + Duration::from_millis(10);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.2}s for SEC slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// HTTP client for the SEC's public EDGAR endpoints.
///
/// Every request carries the configured `User-Agent` and passes through a
/// shared rate limiter.
#[derive(Clone)]
pub struct SecEdgarClient {
    client: Client,
    base_url: String,
    ticker_map_url: String,
    timeout: Duration,
    rate_limiter: RateLimiter,
    retry_wait: Duration,
}

impl SecEdgarClient {
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .user_agent(config.sec_user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AnalysisError::Config(format!("failed to build SEC HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.sec_base_url.trim_end_matches('/').to_string(),
            ticker_map_url: config.sec_ticker_map_url.clone(),
            timeout: config.request_timeout,
            rate_limiter: RateLimiter::new(config.sec_rate_limit, Duration::from_secs(1)),
            retry_wait: Duration::from_secs(2),
        })
    }

    /// Override the pause between HTTP 429 retries.
    pub fn with_retry_wait(mut self, retry_wait: Duration) -> Self {
        self.retry_wait = retry_wait;
        self
    }

    pub fn company_facts_url(&self, cik: &str) -> String {
        format!("{}/api/xbrl/companyfacts/CIK{}.json", self.base_url, cik)
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, url: &str) -> Result<reqwest::Response, AnalysisError> {
        for attempt in 0..MAX_ATTEMPTS {
            self.rate_limiter.acquire().await;
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| map_reqwest_error(e, self.timeout))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            tracing::warn!(
                "SEC 429 rate limited, waiting {:?} before retry {}/{}",
                self.retry_wait,
                attempt + 1,
                MAX_ATTEMPTS
            );
            tokio::time::sleep(self.retry_wait).await;
        }

        Err(AnalysisError::Network(format!(
            "rate limited by SEC after {} attempts: {}",
            MAX_ATTEMPTS, url
        )))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AnalysisError> {
        let response = self.send_request(url).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(AnalysisError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(AnalysisError::Network(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;
        if body.is_empty() {
            return Err(AnalysisError::InvalidData(format!("empty response from {}", url)));
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch and normalise the full ticker table, keyed by upper-case ticker.
    pub async fn fetch_ticker_table(&self) -> Result<std::collections::HashMap<String, TickerEntry>, AnalysisError> {
        tracing::info!("Fetching SEC ticker table from {}", self.ticker_map_url);
        let raw: resolver::RawTickerTable = self.get_json(&self.ticker_map_url).await?;
        let table = resolver::normalize_ticker_table(raw);
        if table.is_empty() {
            return Err(AnalysisError::InvalidData("SEC ticker table is empty".into()));
        }
        Ok(table)
    }

    /// Fetch the XBRL company-facts document for a ten-digit CIK.
    pub async fn fetch_company_facts(&self, cik: &str) -> Result<CompanyFacts, AnalysisError> {
        let url = self.company_facts_url(cik);
        tracing::info!(cik = %cik, "Fetching SEC company facts");
        self.get_json(&url).await.map_err(|e| match e {
            AnalysisError::NotFound(_) => AnalysisError::NotFound(format!("no company facts for CIK {}", cik)),
            other => other,
        })
    }
}

pub(crate) fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> AnalysisError {
    if e.is_timeout() {
        AnalysisError::Timeout(timeout)
    } else if e.is_decode() {
        AnalysisError::InvalidData(e.to_string())
    } else {
        AnalysisError::Network(e.to_string())
    }
}
