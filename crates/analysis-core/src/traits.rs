use async_trait::async_trait;
use crate::{CompanyInfo, FinancialStatement, ProviderResult};

/// Capability contract implemented once per data source.
#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    /// Stable name used in logs and provenance
    fn name(&self) -> &'static str;

    async fn get_company_info(&self, ticker: &str) -> ProviderResult<CompanyInfo>;

    /// Annual statements, most recent fiscal year first, at most `years` entries.
    async fn get_financial_statements(
        &self,
        ticker: &str,
        years: usize,
    ) -> ProviderResult<Vec<FinancialStatement>>;
}
