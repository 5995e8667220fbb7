use crate::statement_table::StatementTable;
use crate::YahooClient;
use analysis_core::{
    AnalysisConfig, AnalysisError, BalanceSheet, CashFlowStatement, CompanyInfo, FinancialDataProvider,
    FinancialStatement, IncomeStatement, ProviderError, ProviderResult,
};
use async_trait::async_trait;
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use std::collections::HashSet;

const PROVIDER_NAME: &str = "yahoo";
const SOURCE_URL: &str = "https://finance.yahoo.com";

const INCOME_ROWS: &[&str] = &[
    "TotalRevenue",
    "CostOfRevenue",
    "GrossProfit",
    "OperatingIncome",
    "InterestExpense",
    "NetIncome",
    "EBITDA",
    "BasicEPS",
    "DilutedEPS",
];

const BALANCE_ROWS: &[&str] = &[
    "TotalAssets",
    "CurrentAssets",
    "CashAndCashEquivalents",
    "Inventory",
    "AccountsReceivable",
    "TotalLiabilitiesNetMinorityInterest",
    "CurrentLiabilities",
    "TotalDebt",
    "StockholdersEquity",
    "ShareIssued",
];

const CASH_FLOW_ROWS: &[&str] = &[
    "OperatingCashFlow",
    "CapitalExpenditure",
    "FreeCashFlow",
    "CashDividendsPaid",
];

/// Market-data provider backed by Yahoo Finance.
pub struct YahooProvider {
    client: YahooClient,
}

impl YahooProvider {
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Ok(Self {
            client: YahooClient::new(config)?,
        })
    }

    pub fn with_client(client: YahooClient) -> Self {
        Self { client }
    }

    fn wrap(&self, cause: AnalysisError) -> ProviderError {
        ProviderError::new(PROVIDER_NAME, cause)
    }
}

fn build_statement(ticker: &str, table: &StatementTable, date: NaiveDate) -> FinancialStatement {
    let v = |row: &str| table.value(row, date);

    FinancialStatement {
        ticker: ticker.to_string(),
        period: "FY".to_string(),
        fiscal_year: date.year(),
        end_date: date,
        income_statement: IncomeStatement {
            revenue: v("TotalRevenue"),
            cost_of_goods_sold: v("CostOfRevenue"),
            gross_profit: v("GrossProfit"),
            operating_income: v("OperatingIncome"),
            interest_expense: v("InterestExpense"),
            net_income: v("NetIncome"),
            ebitda: v("EBITDA"),
            eps_basic: v("BasicEPS"),
            eps_diluted: v("DilutedEPS"),
        },
        balance_sheet: BalanceSheet {
            total_assets: v("TotalAssets"),
            current_assets: v("CurrentAssets"),
            cash_and_equivalents: v("CashAndCashEquivalents"),
            inventory: v("Inventory"),
            accounts_receivable: v("AccountsReceivable"),
            total_liabilities: v("TotalLiabilitiesNetMinorityInterest"),
            current_liabilities: v("CurrentLiabilities"),
            total_debt: v("TotalDebt"),
            shareholders_equity: v("StockholdersEquity"),
            shares_outstanding: v("ShareIssued"),
        },
        cash_flow_statement: CashFlowStatement {
            operating_cash_flow: v("OperatingCashFlow"),
            capital_expenditures: v("CapitalExpenditure"),
            free_cash_flow: v("FreeCashFlow"),
            dividend_payments: v("CashDividendsPaid"),
        },
        source_url: SOURCE_URL.to_string(),
        retrieval_date: Utc::now(),
    }
}

/// One statement per fiscal year, most recent first. When a changed year end
/// puts two columns in one calendar year, the later column is kept.
fn statements_from_table(ticker: &str, table: &StatementTable, years: usize) -> Result<Vec<FinancialStatement>, AnalysisError> {
    let income_columns = table.columns_for(INCOME_ROWS);
    if income_columns.is_empty() || table.columns_for(BALANCE_ROWS).is_empty() {
        return Err(AnalysisError::NoData(format!(
            "Yahoo returned empty financial statements for {}",
            ticker
        )));
    }

    let mut seen_years = HashSet::new();
    Ok(income_columns
        .into_iter()
        .filter(|date| seen_years.insert(date.year()))
        .take(years)
        .map(|date| build_statement(ticker, table, date))
        .collect())
}

#[async_trait]
impl FinancialDataProvider for YahooProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn get_company_info(&self, ticker: &str) -> ProviderResult<CompanyInfo> {
        let ticker = ticker.to_ascii_uppercase();
        let summary = self.client.quote_summary(&ticker).await.map_err(|e| self.wrap(e))?;

        let profile = summary.asset_profile.unwrap_or_default();
        let price = summary.price.unwrap_or_default();
        let quote_type = summary.quote_type.unwrap_or_default();

        let info = CompanyInfo {
            name: price
                .long_name
                .or(quote_type.long_name)
                .or(price.short_name)
                .or(quote_type.short_name),
            exchange: quote_type.exchange.or(price.exchange_name),
            sector: profile.sector,
            industry: profile.industry,
            description: profile.long_business_summary,
            website: profile.website,
            cik: None,
            ..CompanyInfo::new(ticker.clone())
        };

        if info.name.is_none() && info.sector.is_none() && info.exchange.is_none() {
            return Err(self.wrap(AnalysisError::NoData(format!(
                "Yahoo returned no usable profile for {}",
                ticker
            ))));
        }

        Ok(info)
    }

    async fn get_financial_statements(&self, ticker: &str, years: usize) -> ProviderResult<Vec<FinancialStatement>> {
        let ticker = ticker.to_ascii_uppercase();
        let to = Utc::now();
        // One extra year of lookback so a late filer still yields `years` columns
        let from = to - ChronoDuration::days(366 * (years as i64 + 1));

        let line_items: Vec<&str> = INCOME_ROWS
            .iter()
            .chain(BALANCE_ROWS)
            .chain(CASH_FLOW_ROWS)
            .copied()
            .collect();

        let table = self
            .client
            .fundamentals_timeseries(&ticker, &line_items, from, to)
            .await
            .map_err(|e| self.wrap(e))?;

        let statements = statements_from_table(&ticker, &table, years).map_err(|e| self.wrap(e))?;
        tracing::info!(ticker = %ticker, "Built {} annual statements from Yahoo", statements.len());
        Ok(statements)
    }
}
