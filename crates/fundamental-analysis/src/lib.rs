pub mod narrative;
pub mod ratios;

pub use narrative::{generate_qualitative_analysis, trend, MetricDirection, Synthesis, Trend};
pub use ratios::{calculate_ratios, safe_divide};

use analysis_core::{FinancialRatios, FinancialStatement, Narrative};

/// Stateless ratio and narrative engine over normalised statements.
pub struct FundamentalAnalysisEngine;

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate_ratios(&self, statement: &FinancialStatement) -> FinancialRatios {
        tracing::debug!(
            ticker = %statement.ticker,
            fiscal_year = statement.fiscal_year,
            "Calculating ratios"
        );
        ratios::calculate_ratios(statement)
    }

    /// One ratio record per statement, in the same order.
    pub fn calculate_historical(&self, statements: &[FinancialStatement]) -> Vec<FinancialRatios> {
        statements.iter().map(|s| self.calculate_ratios(s)).collect()
    }

    pub fn generate_qualitative_analysis(&self, ratios: &[FinancialRatios]) -> Narrative {
        narrative::generate_qualitative_analysis(ratios)
    }
}

impl Default for FundamentalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{BalanceSheet, CashFlowStatement, IncomeStatement};
    use chrono::{NaiveDate, Utc};

    fn statement(fiscal_year: i32, current_assets: f64, current_liabilities: f64) -> FinancialStatement {
        FinancialStatement {
            ticker: "TEST".to_string(),
            period: "FY".to_string(),
            fiscal_year,
            end_date: NaiveDate::from_ymd_opt(fiscal_year, 12, 31).unwrap(),
            income_statement: IncomeStatement::default(),
            balance_sheet: BalanceSheet {
                current_assets: Some(current_assets),
                current_liabilities: Some(current_liabilities),
                ..Default::default()
            },
            cash_flow_statement: CashFlowStatement::default(),
            source_url: "test".to_string(),
            retrieval_date: Utc::now(),
        }
    }

    #[test]
    fn test_historical_ratios_keep_order() {
        let engine = FundamentalAnalysisEngine::default();
        let statements = vec![statement(2023, 400.0, 200.0), statement(2022, 300.0, 200.0)];

        let ratios = engine.calculate_historical(&statements);

        assert_eq!(ratios.len(), 2);
        assert_eq!(ratios[0].fiscal_year, 2023);
        assert_eq!(ratios[0].current_ratio, Some(2.0));
        assert_eq!(ratios[1].current_ratio, Some(1.5));

        let narrative = engine.generate_qualitative_analysis(&ratios);
        let liquidity = narrative["liquidity"].as_text().unwrap();
        assert!(liquidity.contains("showing a improving trend"));
    }
}
