use crate::extractor::{extract_statements, METRIC_DICTIONARY};
use crate::facts::CompanyFacts;
use crate::resolver::TickerResolver;
use crate::SecEdgarClient;
use analysis_core::{
    AnalysisConfig, AnalysisError, CompanyInfo, FinancialDataProvider, FinancialStatement, ProviderError,
    ProviderResult,
};
use async_trait::async_trait;
use response_cache::ResponseCache;
use std::sync::Arc;
use std::time::Duration;

const PROVIDER_NAME: &str = "sec_edgar";

pub fn facts_cache_key(cik: &str) -> String {
    format!("sec:facts:{}", cik)
}

/// Structured-filing provider over SEC EDGAR company facts.
pub struct SecEdgarProvider {
    client: Arc<SecEdgarClient>,
    resolver: TickerResolver,
    cache: ResponseCache,
    cache_ttl: Duration,
}

impl SecEdgarProvider {
    pub fn new(config: &AnalysisConfig, cache: ResponseCache) -> Result<Self, AnalysisError> {
        let client = Arc::new(SecEdgarClient::new(config)?);
        Ok(Self::with_client(client, cache, config.cache.ttl))
    }

    pub fn with_client(client: Arc<SecEdgarClient>, cache: ResponseCache, cache_ttl: Duration) -> Self {
        let resolver = TickerResolver::new(client.clone(), cache.clone(), cache_ttl);
        Self {
            client,
            resolver,
            cache,
            cache_ttl,
        }
    }

    async fn company_facts(&self, cik: &str) -> Result<CompanyFacts, AnalysisError> {
        let client = self.client.clone();
        let cik_owned = cik.to_string();
        self.cache
            .get_or_fetch(&facts_cache_key(cik), self.cache_ttl, || async move {
                client.fetch_company_facts(&cik_owned).await
            })
            .await
    }

    fn wrap(&self, cause: AnalysisError) -> ProviderError {
        ProviderError::new(PROVIDER_NAME, cause)
    }
}

#[async_trait]
impl FinancialDataProvider for SecEdgarProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn get_company_info(&self, ticker: &str) -> ProviderResult<CompanyInfo> {
        let entry = self.resolver.lookup(ticker).await.map_err(|e| self.wrap(e))?;

        Ok(CompanyInfo {
            name: Some(entry.title),
            exchange: entry.exchange,
            cik: Some(entry.cik),
            ..CompanyInfo::new(ticker.to_ascii_uppercase())
        })
    }

    async fn get_financial_statements(&self, ticker: &str, years: usize) -> ProviderResult<Vec<FinancialStatement>> {
        let ticker = ticker.to_ascii_uppercase();
        let cik = self.resolver.resolve(&ticker).await.map_err(|e| self.wrap(e))?;
        let facts = self.company_facts(&cik).await.map_err(|e| self.wrap(e))?;

        let statements = extract_statements(
            &ticker,
            &facts,
            METRIC_DICTIONARY,
            years,
            &self.client.company_facts_url(&cik),
        )
        .map_err(|e| self.wrap(e))?;

        tracing::info!(
            ticker = %ticker,
            cik = %cik,
            "Built {} annual statements from SEC company facts",
            statements.len()
        );
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_ticker_table(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/files/company_tickers.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}
            })))
            .mount(server)
            .await;
    }

    fn provider_for(server: &MockServer, cache: ResponseCache) -> SecEdgarProvider {
        let config = AnalysisConfig {
            sec_base_url: server.uri(),
            sec_ticker_map_url: format!("{}/files/company_tickers.json", server.uri()),
            ..AnalysisConfig::default()
        };
        SecEdgarProvider::new(&config, cache).unwrap()
    }

    fn apple_facts() -> serde_json::Value {
        json!({
            "cik": 320193,
            "entityName": "Apple Inc.",
            "facts": {
                "us-gaap": {
                    "AssetsCurrent": {"units": {"USD": [
                        {"val": 500.0, "fy": 2023, "fp": "FY", "form": "10-K", "end": "2023-09-30"}
                    ]}},
                    "LiabilitiesCurrent": {"units": {"USD": [
                        {"val": 250.0, "fy": 2023, "fp": "FY", "form": "10-K", "end": "2023-09-30"}
                    ]}}
                }
            }
        })
    }

    #[tokio::test]
    async fn test_company_info_from_ticker_table() {
        let server = MockServer::start().await;
        mount_ticker_table(&server).await;
        let provider = provider_for(&server, ResponseCache::disabled());

        let info = provider.get_company_info("aapl").await.unwrap();
        assert_eq!(info.ticker, "AAPL");
        assert_eq!(info.name.as_deref(), Some("Apple Inc."));
        assert_eq!(info.cik.as_deref(), Some("0000320193"));
        assert!(info.sector.is_none());
    }

    #[tokio::test]
    async fn test_statements_from_company_facts() {
        let server = MockServer::start().await;
        mount_ticker_table(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/xbrl/companyfacts/CIK0000320193.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(apple_facts()))
            .mount(&server)
            .await;
        let provider = provider_for(&server, ResponseCache::disabled());

        let statements = provider.get_financial_statements("AAPL", 5).await.unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].fiscal_year, 2023);
        assert_eq!(statements[0].balance_sheet.current_assets, Some(500.0));
        assert!(statements[0].source_url.ends_with("CIK0000320193.json"));
    }

    #[tokio::test]
    async fn test_company_facts_are_cached() {
        let server = MockServer::start().await;
        mount_ticker_table(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/xbrl/companyfacts/CIK0000320193.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(apple_facts()))
            .expect(1)
            .mount(&server)
            .await;
        let provider = provider_for(&server, ResponseCache::in_memory(Duration::from_secs(60)));

        provider.get_financial_statements("AAPL", 5).await.unwrap();
        provider.get_financial_statements("AAPL", 3).await.unwrap();
        server.verify().await;
    }

    #[tokio::test]
    async fn test_statement_call_spans_two_requests_within_provider_timeout() {
        let server = MockServer::start().await;
        let delay = Duration::from_millis(600);
        Mock::given(method("GET"))
            .and(path("/files/company_tickers.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}}))
                    .set_delay(delay),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/xbrl/companyfacts/CIK0000320193.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(apple_facts()).set_delay(delay))
            .mount(&server)
            .await;
        let config = AnalysisConfig {
            sec_base_url: server.uri(),
            sec_ticker_map_url: format!("{}/files/company_tickers.json", server.uri()),
            request_timeout: Duration::from_secs(1),
            ..AnalysisConfig::default()
        };
        config.validate().unwrap();
        let provider = SecEdgarProvider::new(&config, ResponseCache::disabled()).unwrap();

        let result = tokio::time::timeout(config.provider_timeout, provider.get_financial_statements("AAPL", 5))
            .await
            .expect("whole call fits the provider timeout");
        assert_eq!(result.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_provider_not_found() {
        let server = MockServer::start().await;
        mount_ticker_table(&server).await;
        let provider = provider_for(&server, ResponseCache::disabled());

        let err = provider.get_financial_statements("NOPE", 5).await.unwrap_err();
        assert_eq!(err.provider, "sec_edgar");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_filer_without_annual_data_is_no_data() {
        let server = MockServer::start().await;
        mount_ticker_table(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/xbrl/companyfacts/CIK0000320193.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cik": 320193,
                "facts": {"us-gaap": {}}
            })))
            .mount(&server)
            .await;
        let provider = provider_for(&server, ResponseCache::disabled());

        let err = provider.get_financial_statements("AAPL", 5).await.unwrap_err();
        assert!(matches!(err.cause, AnalysisError::NoData(_)));
    }
}
