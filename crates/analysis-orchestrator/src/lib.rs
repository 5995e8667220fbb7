use analysis_core::{AnalysisConfig, AnalysisError, CompanyAnalysis, FinancialDataProvider};
use chrono::Utc;
use fundamental_analysis::FundamentalAnalysisEngine;
use response_cache::ResponseCache;
use std::sync::Arc;
use tokio::task::JoinSet;

pub mod data_service;
pub mod registry;

pub use data_service::{AcquisitionResult, DataService};
pub use registry::{build_provider, build_providers};

/// Acquisition, ratio computation and narrative synthesis for one ticker at a time.
pub struct AnalysisPipeline {
    data_service: DataService,
    engine: FundamentalAnalysisEngine,
    num_years: usize,
}

impl AnalysisPipeline {
    pub fn new(data_service: DataService, num_years: usize) -> Self {
        Self {
            data_service,
            engine: FundamentalAnalysisEngine::new(),
            num_years,
        }
    }

    /// Connect the cache and build the configured providers.
    pub async fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let cache = ResponseCache::connect(&config.cache).await;
        let providers = build_providers(config, &cache)?;
        Self::with_providers(providers, config)
    }

    pub fn with_providers(
        providers: Vec<Arc<dyn FinancialDataProvider>>,
        config: &AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        let data_service = DataService::new(providers, config.provider_timeout)?;
        tracing::info!(
            "Analysis pipeline ready with providers {:?}",
            data_service.provider_names()
        );
        Ok(Self::new(data_service, config.num_historical_years))
    }

    pub async fn analyze(&self, ticker: &str) -> Result<CompanyAnalysis, AnalysisError> {
        let ticker = ticker.trim().to_ascii_uppercase();
        tracing::info!("Starting analysis for {} ({} years)", ticker, self.num_years);

        let acquired = self
            .data_service
            .fetch_company_financials(&ticker, self.num_years)
            .await?;

        let historical_ratios = self.engine.calculate_historical(&acquired.statements);
        let qualitative_analysis = self.engine.generate_qualitative_analysis(&historical_ratios);

        tracing::info!(
            "Finished analysis for {}: {} statements from {:?}",
            ticker,
            acquired.statements.len(),
            acquired.sources_used
        );

        Ok(CompanyAnalysis {
            company_info: acquired.company_info,
            historical_statements: acquired.statements,
            historical_ratios,
            qualitative_analysis,
            analysis_date: Utc::now(),
            data_sources_used: acquired.sources_used,
        })
    }

    /// Analyse several tickers concurrently. Results come back in input order.
    pub async fn analyze_many(
        self: &Arc<Self>,
        tickers: Vec<String>,
    ) -> Vec<(String, Result<CompanyAnalysis, AnalysisError>)> {
        let mut tasks = JoinSet::new();

        for (index, ticker) in tickers.into_iter().enumerate() {
            let pipeline = Arc::clone(self);
            tasks.spawn(async move {
                let result = pipeline.analyze(&ticker).await;
                (index, ticker, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => results.push(entry),
                Err(e) => tracing::error!("Analysis task panicked: {}", e),
            }
        }

        results.sort_by_key(|(index, _, _)| *index);
        results
            .into_iter()
            .map(|(_, ticker, result)| (ticker, result))
            .collect()
    }
}
