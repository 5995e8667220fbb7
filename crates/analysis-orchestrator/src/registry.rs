use analysis_core::{AnalysisConfig, AnalysisError, FinancialDataProvider, ProviderKind};
use response_cache::ResponseCache;
use sec_edgar_client::SecEdgarProvider;
use std::sync::Arc;
use yahoo_client::YahooProvider;

/// Instantiate one provider for `kind`.
pub fn build_provider(
    kind: ProviderKind,
    config: &AnalysisConfig,
    cache: &ResponseCache,
) -> Result<Arc<dyn FinancialDataProvider>, AnalysisError> {
    let provider: Arc<dyn FinancialDataProvider> = match kind {
        ProviderKind::SecEdgar => Arc::new(SecEdgarProvider::new(config, cache.clone())?),
        ProviderKind::Yahoo => Arc::new(YahooProvider::new(config)?),
    };
    Ok(provider)
}

/// Providers in the configured priority order.
pub fn build_providers(
    config: &AnalysisConfig,
    cache: &ResponseCache,
) -> Result<Vec<Arc<dyn FinancialDataProvider>>, AnalysisError> {
    config
        .providers
        .iter()
        .map(|kind| build_provider(*kind, config, cache))
        .collect()
}
