pub mod models;
pub mod provider;
pub mod statement_table;

pub use models::{AssetProfile, PriceModule, QuoteSummaryResult, QuoteTypeModule};
pub use provider::YahooProvider;
pub use statement_table::StatementTable;

use analysis_core::{AnalysisConfig, AnalysisError};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::Mutex;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const QUOTE_SUMMARY_MODULES: &str = "assetProfile,price,quoteType";

/// Yahoo Finance HTTP client.
///
/// Yahoo's JSON endpoints need a session cookie plus a "crumb" token tied to
/// it. Both are obtained lazily and the crumb is refreshed once on a 401.
pub struct YahooClient {
    client: Client,
    base_url: String,
    cookie_url: String,
    timeout: Duration,
    crumb: Mutex<Option<String>>,
}

impl YahooClient {
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AnalysisError::Config(format!("failed to build Yahoo HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.yahoo_base_url.trim_end_matches('/').to_string(),
            cookie_url: config.yahoo_cookie_url.clone(),
            timeout: config.request_timeout,
            crumb: Mutex::new(None),
        })
    }

    async fn crumb(&self) -> Result<String, AnalysisError> {
        let mut slot = self.crumb.lock().await;
        if let Some(crumb) = slot.as_ref() {
            return Ok(crumb.clone());
        }

        // The cookie endpoint answers 404 but still sets the session cookie
        if let Err(e) = self.client.get(&self.cookie_url).send().await {
            tracing::debug!("Yahoo cookie request failed: {}", e);
        }

        let response = self
            .client
            .get(format!("{}/v1/test/getcrumb", self.base_url))
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(AnalysisError::Network(format!(
                "Yahoo crumb request failed with HTTP {}",
                response.status()
            )));
        }

        let crumb = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?
            .trim()
            .to_string();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(AnalysisError::InvalidData("Yahoo returned an unusable crumb".into()));
        }

        tracing::debug!("Obtained Yahoo crumb");
        *slot = Some(crumb.clone());
        Ok(crumb)
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, AnalysisError> {
        for attempt in 0..2 {
            let crumb = self.crumb().await?;
            let response = self
                .client
                .get(url)
                .query(query)
                .query(&[("crumb", crumb.as_str())])
                .send()
                .await
                .map_err(|e| map_reqwest_error(e, self.timeout))?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && attempt == 0 {
                tracing::warn!("Yahoo rejected crumb, refreshing");
                self.invalidate_crumb().await;
                continue;
            }
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
            return Ok(serde_json::from_slice(&body)?);
        }

        Err(AnalysisError::Network("Yahoo authorization failed after crumb refresh".into()))
    }

    /// Profile, price and quote-type modules for `ticker`.
    pub async fn quote_summary(&self, ticker: &str) -> Result<QuoteSummaryResult, AnalysisError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, ticker);
        let response: models::QuoteSummaryResponse = self
            .get_json(&url, &[("modules", QUOTE_SUMMARY_MODULES.to_string())])
            .await
            .map_err(|e| match e {
                AnalysisError::NotFound(_) => AnalysisError::NotFound(format!("Yahoo has no quote for {}", ticker)),
                other => other,
            })?;

        response
            .quote_summary
            .result
            .and_then(|mut results| (!results.is_empty()).then(|| results.swap_remove(0)))
            .ok_or_else(|| {
                let detail = response
                    .quote_summary
                    .error
                    .and_then(|e| e.description)
                    .unwrap_or_else(|| "empty result".to_string());
                AnalysisError::NotFound(format!("Yahoo has no quote for {}: {}", ticker, detail))
            })
    }

    /// Annual fundamentals time series for the given line items.
    pub async fn fundamentals_timeseries(
        &self,
        ticker: &str,
        line_items: &[&str],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<StatementTable, AnalysisError> {
        let url = self.timeseries_url(ticker);
        let types = line_items
            .iter()
            .map(|item| format!("annual{}", item))
            .collect::<Vec<_>>()
            .join(",");

        let response: models::TimeseriesResponse = self
            .get_json(
                &url,
                &[
                    ("symbol", ticker.to_string()),
                    ("type", types),
                    ("period1", from.timestamp().to_string()),
                    ("period2", to.timestamp().to_string()),
                ],
            )
            .await?;

        Ok(StatementTable::from_timeseries(&response.timeseries.result))
    }

    pub fn timeseries_url(&self, ticker: &str) -> String {
        format!(
            "{}/ws/fundamentals-timeseries/v1/finance/timeseries/{}",
            self.base_url, ticker
        )
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
