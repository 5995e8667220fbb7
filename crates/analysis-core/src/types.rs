use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// General company metadata. Identity key is `ticker`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub ticker: String,
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    /// SEC filer identifier (CIK), zero-padded to ten digits
    pub cik: Option<String>,
}

impl CompanyInfo {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Self::default()
        }
    }

    /// Fill every still-empty field from `other`. Present values are never overwritten.
    ///
    /// Returns the names of the fields that were filled.
    pub fn enrich_from(&mut self, other: &CompanyInfo) -> Vec<&'static str> {
        fn fill(
            slot: &mut Option<String>,
            value: &Option<String>,
            field: &'static str,
            filled: &mut Vec<&'static str>,
        ) {
            if slot.is_none() {
                if let Some(v) = value {
                    *slot = Some(v.clone());
                    filled.push(field);
                }
            }
        }

        let mut filled = Vec::new();
        fill(&mut self.name, &other.name, "name", &mut filled);
        fill(&mut self.exchange, &other.exchange, "exchange", &mut filled);
        fill(&mut self.sector, &other.sector, "sector", &mut filled);
        fill(&mut self.industry, &other.industry, "industry", &mut filled);
        fill(&mut self.description, &other.description, "description", &mut filled);
        fill(&mut self.website, &other.website, "website", &mut filled);
        fill(&mut self.cik, &other.cik, "cik", &mut filled);
        filled
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub revenue: Option<f64>,
    pub cost_of_goods_sold: Option<f64>,
    pub gross_profit: Option<f64>,
    /// Operating income (EBIT)
    pub operating_income: Option<f64>,
    pub interest_expense: Option<f64>,
    pub net_income: Option<f64>,
    pub ebitda: Option<f64>,
    pub eps_basic: Option<f64>,
    pub eps_diluted: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub total_assets: Option<f64>,
    pub current_assets: Option<f64>,
    pub cash_and_equivalents: Option<f64>,
    pub inventory: Option<f64>,
    pub accounts_receivable: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub current_liabilities: Option<f64>,
    /// Short-term plus long-term debt
    pub total_debt: Option<f64>,
    pub shareholders_equity: Option<f64>,
    pub shares_outstanding: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub operating_cash_flow: Option<f64>,
    pub capital_expenditures: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub dividend_payments: Option<f64>,
}

/// The three statements for one (ticker, fiscal year, period), plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatement {
    pub ticker: String,
    /// Reporting period, e.g. "FY"
    pub period: String,
    pub fiscal_year: i32,
    pub end_date: NaiveDate,
    pub income_statement: IncomeStatement,
    pub balance_sheet: BalanceSheet,
    pub cash_flow_statement: CashFlowStatement,
    pub source_url: String,
    pub retrieval_date: DateTime<Utc>,
}

/// Ratios derived from exactly one `FinancialStatement`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialRatios {
    pub ticker: String,
    pub period: String,
    pub fiscal_year: i32,

    // Liquidity
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub cash_ratio: Option<f64>,

    // Profitability
    pub roe: Option<f64>,
    pub roa: Option<f64>,
    pub gross_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub ebitda_margin: Option<f64>,

    // Leverage
    pub debt_to_equity: Option<f64>,
    pub debt_to_assets: Option<f64>,
    pub times_interest_earned: Option<f64>,
    pub debt_service_coverage: Option<f64>,

    // Efficiency
    pub asset_turnover: Option<f64>,
    pub inventory_turnover: Option<f64>,
    pub receivables_turnover: Option<f64>,
}

/// A single narrative entry: either prose or a list of flagged items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NarrativeValue {
    Text(String),
    List(Vec<String>),
}

impl NarrativeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NarrativeValue::Text(s) => Some(s),
            NarrativeValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            NarrativeValue::List(items) => Some(items),
            NarrativeValue::Text(_) => None,
        }
    }
}

pub type Narrative = BTreeMap<String, NarrativeValue>;

/// Final aggregate handed to reporting collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyAnalysis {
    pub company_info: CompanyInfo,
    /// Most recent fiscal year first
    pub historical_statements: Vec<FinancialStatement>,
    /// Parallel to `historical_statements`
    pub historical_ratios: Vec<FinancialRatios>,
    pub qualitative_analysis: Narrative,
    pub analysis_date: DateTime<Utc>,
    pub data_sources_used: Vec<String>,
}
