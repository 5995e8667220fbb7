use crate::SecEdgarClient;
use analysis_core::AnalysisError;
use response_cache::ResponseCache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

pub const CIK_MAP_CACHE_KEY: &str = "sec:cik_map";

/// Row of `company_tickers.json`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawTickerRow {
    cik_str: u64,
    ticker: String,
    title: String,
    #[serde(default)]
    exchange: Option<String>,
}

/// The published file is an object keyed by row index: `{"0": {...}, "1": {...}}`.
pub(crate) type RawTickerTable = HashMap<String, RawTickerRow>;

/// A resolved filer: ten-digit CIK plus the registrant's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerEntry {
    pub ticker: String,
    pub cik: String,
    pub title: String,
    pub exchange: Option<String>,
}

pub fn pad_cik(cik: u64) -> String {
    format!("{:010}", cik)
}

pub(crate) fn normalize_ticker_table(raw: RawTickerTable) -> HashMap<String, TickerEntry> {
    raw.into_values()
        .map(|row| {
            let ticker = row.ticker.trim().to_ascii_uppercase();
            let entry = TickerEntry {
                ticker: ticker.clone(),
                cik: pad_cik(row.cik_str),
                title: row.title,
                exchange: row.exchange,
            };
            (ticker, entry)
        })
        .collect()
}

/// Ticker to CIK lookup backed by the SEC ticker table.
///
/// The table is fetched (through the cache) on first use and then kept for
/// the life of the resolver.
#[derive(Clone)]
pub struct TickerResolver {
    client: Arc<SecEdgarClient>,
    cache: ResponseCache,
    cache_ttl: Duration,
    table: Arc<OnceCell<HashMap<String, TickerEntry>>>,
}

impl TickerResolver {
    pub fn new(client: Arc<SecEdgarClient>, cache: ResponseCache, cache_ttl: Duration) -> Self {
        Self {
            client,
            cache,
            cache_ttl,
            table: Arc::new(OnceCell::new()),
        }
    }

    async fn table(&self) -> Result<&HashMap<String, TickerEntry>, AnalysisError> {
        self.table
            .get_or_try_init(|| async {
                let client = self.client.clone();
                let table = self
                    .cache
                    .get_or_fetch(CIK_MAP_CACHE_KEY, self.cache_ttl, || async move {
                        client.fetch_ticker_table().await
                    })
                    .await?;
                tracing::info!("Loaded SEC ticker table with {} entries", table.len());
                Ok::<_, AnalysisError>(table)
            })
            .await
    }

    /// Case-insensitive lookup of the full table row.
    pub async fn lookup(&self, ticker: &str) -> Result<TickerEntry, AnalysisError> {
        let key = ticker.trim().to_ascii_uppercase();
        self.table()
            .await?
            .get(&key)
            .cloned()
            .ok_or_else(|| AnalysisError::NotFound(format!("ticker {} not in SEC ticker table", key)))
    }

    /// Ten-digit CIK for `ticker`.
    pub async fn resolve(&self, ticker: &str) -> Result<String, AnalysisError> {
        Ok(self.lookup(ticker).await?.cik)
    }
}
