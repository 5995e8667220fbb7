use analysis_core::{
    AnalysisError, AnalysisResult, CompanyInfo, FinancialDataProvider, FinancialStatement, ProviderError,
    ProviderResult,
};
use futures_util::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of acquiring one company's data across providers.
#[derive(Debug, Clone)]
pub struct AcquisitionResult {
    pub company_info: CompanyInfo,
    /// Statements from the primary provider, most recent first
    pub statements: Vec<FinancialStatement>,
    /// Providers whose data landed in the result: primary first, then enrichers
    pub sources_used: Vec<String>,
    /// Every provider tried for statements, in order
    pub attempted: Vec<String>,
}

/// Drives an ordered list of providers with statement fallback and metadata enrichment.
pub struct DataService {
    providers: Vec<Arc<dyn FinancialDataProvider>>,
    call_timeout: Duration,
}

impl DataService {
    /// `providers` are in priority order; the first is tried first for statements.
    pub fn new(providers: Vec<Arc<dyn FinancialDataProvider>>, call_timeout: Duration) -> Result<Self, AnalysisError> {
        if providers.is_empty() {
            return Err(AnalysisError::Config(
                "DataService needs at least one provider".to_string(),
            ));
        }
        Ok(Self {
            providers,
            call_timeout,
        })
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    async fn call<T, F>(&self, provider: &str, fut: F) -> ProviderResult<T>
    where
        F: Future<Output = ProviderResult<T>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::new(provider, AnalysisError::Timeout(self.call_timeout))),
        }
    }

    async fn fetch_primary(
        &self,
        provider: &dyn FinancialDataProvider,
        ticker: &str,
        years: usize,
    ) -> ProviderResult<(CompanyInfo, Vec<FinancialStatement>)> {
        let name = provider.name();
        let info = self.call(name, provider.get_company_info(ticker)).await?;
        let statements = self
            .call(name, provider.get_financial_statements(ticker, years))
            .await?;

        if statements.is_empty() {
            return Err(ProviderError::new(
                name,
                AnalysisError::NoData(format!("no statements for {}", ticker)),
            ));
        }
        Ok((info, statements))
    }

    /// Fetch statements from the first provider that can supply them, then fill
    /// missing company metadata from the remaining providers.
    pub async fn fetch_company_financials(&self, ticker: &str, years: usize) -> AnalysisResult<AcquisitionResult> {
        let mut attempted = Vec::new();
        let mut last_error: Option<ProviderError> = None;
        let mut primary = None;

        for (index, provider) in self.providers.iter().enumerate() {
            let name = provider.name();
            attempted.push(name.to_string());
            tracing::info!(ticker = %ticker, provider = name, "Attempting to fetch statements");

            match self.fetch_primary(provider.as_ref(), ticker, years).await {
                Ok((info, statements)) => {
                    tracing::info!(
                        ticker = %ticker,
                        provider = name,
                        "Fetched {} primary statements",
                        statements.len()
                    );
                    primary = Some((index, info, statements));
                    break;
                }
                Err(e) => {
                    tracing::warn!(ticker = %ticker, provider = name, "Could not fetch statements: {}", e);
                    last_error = Some(e);
                }
            }
        }

        let Some((primary_index, mut company_info, statements)) = primary else {
            tracing::error!(ticker = %ticker, "All providers failed to return financial statements");
            let last = last_error.unwrap_or_else(|| {
                ProviderError::new("none", AnalysisError::NoData(format!("no provider returned data for {}", ticker)))
            });
            return Err(AnalysisError::AllProvidersFailed {
                ticker: ticker.to_string(),
                last: Box::new(last),
            });
        };

        let mut sources_used = vec![self.providers[primary_index].name().to_string()];

        // Enrichment calls run together; results are merged in provider order
        let enrichers: Vec<&Arc<dyn FinancialDataProvider>> = self
            .providers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != primary_index)
            .map(|(_, p)| p)
            .collect();
        let results = join_all(
            enrichers
                .iter()
                .map(|p| self.call(p.name(), p.get_company_info(ticker))),
        )
        .await;

        for (provider, result) in enrichers.iter().zip(results) {
            match result {
                Ok(info) => {
                    let filled = company_info.enrich_from(&info);
                    if !filled.is_empty() {
                        tracing::debug!(
                            ticker = %ticker,
                            provider = provider.name(),
                            "Enriched fields {:?}",
                            filled
                        );
                        sources_used.push(provider.name().to_string());
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        ticker = %ticker,
                        provider = provider.name(),
                        "Could not fetch enrichment info, skipping: {}",
                        e
                    );
                }
            }
        }

        tracing::info!(ticker = %ticker, sources = ?sources_used, "Completed data fetching and enrichment");
        Ok(AcquisitionResult {
            company_info,
            statements,
            sources_used,
            attempted,
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub fn statement(ticker: &str, fiscal_year: i32, revenue: f64) -> FinancialStatement {
        FinancialStatement {
            ticker: ticker.to_string(),
            period: "FY".to_string(),
            fiscal_year,
            end_date: NaiveDate::from_ymd_opt(fiscal_year, 12, 31).unwrap(),
            income_statement: analysis_core::IncomeStatement {
                revenue: Some(revenue),
                net_income: Some(revenue * 0.2),
                ..Default::default()
            },
            balance_sheet: analysis_core::BalanceSheet {
                current_assets: Some(500.0),
                current_liabilities: Some(250.0),
                total_assets: Some(revenue * 2.0),
                total_debt: Some(100.0),
                shareholders_equity: Some(400.0),
                ..Default::default()
            },
            cash_flow_statement: Default::default(),
            source_url: "mock".to_string(),
            retrieval_date: Utc::now(),
        }
    }

    /// Configurable in-memory provider.
    pub struct MockProvider {
        pub name: &'static str,
        pub info: Option<CompanyInfo>,
        pub statements: Option<Vec<FinancialStatement>>,
        pub delay: Duration,
        /// Sequential requests each call makes, each taking `delay`
        pub requests_per_call: u32,
        pub info_calls: AtomicUsize,
        pub statement_calls: AtomicUsize,
    }

    impl MockProvider {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                info: None,
                statements: None,
                delay: Duration::ZERO,
                requests_per_call: 1,
                info_calls: AtomicUsize::new(0),
                statement_calls: AtomicUsize::new(0),
            }
        }

        pub fn with_info(mut self, info: CompanyInfo) -> Self {
            self.info = Some(info);
            self
        }

        pub fn with_statements(mut self, statements: Vec<FinancialStatement>) -> Self {
            self.statements = Some(statements);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn with_requests_per_call(mut self, requests: u32) -> Self {
            self.requests_per_call = requests;
            self
        }

        async fn simulate_requests(&self) {
            for _ in 0..self.requests_per_call {
                tokio::time::sleep(self.delay).await;
            }
        }
    }

    #[async_trait]
    impl FinancialDataProvider for MockProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn get_company_info(&self, ticker: &str) -> ProviderResult<CompanyInfo> {
            self.info_calls.fetch_add(1, Ordering::SeqCst);
            self.simulate_requests().await;
            self.info
                .clone()
                .ok_or_else(|| ProviderError::new(self.name, AnalysisError::NotFound(ticker.to_string())))
        }

        async fn get_financial_statements(&self, ticker: &str, years: usize) -> ProviderResult<Vec<FinancialStatement>> {
            self.statement_calls.fetch_add(1, Ordering::SeqCst);
            self.simulate_requests().await;
            self.statements
                .clone()
                .map(|s| s.into_iter().take(years).collect())
                .ok_or_else(|| ProviderError::new(self.name, AnalysisError::Network(format!("{} unavailable", ticker))))
        }
    }
}
