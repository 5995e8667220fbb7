//! Aggregates annual XBRL facts into one `FinancialStatement` per fiscal year.

use crate::facts::CompanyFacts;
use analysis_core::{AnalysisError, FinancialStatement};
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;

/// Canonical statement line items that can be read from filings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Revenue,
    CostOfGoodsSold,
    GrossProfit,
    OperatingIncome,
    InterestExpense,
    NetIncome,
    EpsDiluted,
    EpsBasic,
    CashAndEquivalents,
    AccountsReceivable,
    Inventory,
    CurrentAssets,
    TotalAssets,
    CurrentLiabilities,
    TotalLiabilities,
    TotalDebt,
    ShareholdersEquity,
    SharesOutstanding,
    OperatingCashFlow,
    CapitalExpenditures,
    DividendPayments,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::CostOfGoodsSold => "cost_of_goods_sold",
            Metric::GrossProfit => "gross_profit",
            Metric::OperatingIncome => "operating_income",
            Metric::InterestExpense => "interest_expense",
            Metric::NetIncome => "net_income",
            Metric::EpsDiluted => "eps_diluted",
            Metric::EpsBasic => "eps_basic",
            Metric::CashAndEquivalents => "cash_and_equivalents",
            Metric::AccountsReceivable => "accounts_receivable",
            Metric::Inventory => "inventory",
            Metric::CurrentAssets => "current_assets",
            Metric::TotalAssets => "total_assets",
            Metric::CurrentLiabilities => "current_liabilities",
            Metric::TotalLiabilities => "total_liabilities",
            Metric::TotalDebt => "total_debt",
            Metric::ShareholdersEquity => "shareholders_equity",
            Metric::SharesOutstanding => "shares_outstanding",
            Metric::OperatingCashFlow => "operating_cash_flow",
            Metric::CapitalExpenditures => "capital_expenditures",
            Metric::DividendPayments => "dividend_payments",
        }
    }

    fn assign(&self, statement: &mut FinancialStatement, value: f64) {
        let v = Some(value);
        let is = &mut statement.income_statement;
        let bs = &mut statement.balance_sheet;
        let cf = &mut statement.cash_flow_statement;
        match self {
            Metric::Revenue => is.revenue = v,
            Metric::CostOfGoodsSold => is.cost_of_goods_sold = v,
            Metric::GrossProfit => is.gross_profit = v,
            Metric::OperatingIncome => is.operating_income = v,
            Metric::InterestExpense => is.interest_expense = v,
            Metric::NetIncome => is.net_income = v,
            Metric::EpsDiluted => is.eps_diluted = v,
            Metric::EpsBasic => is.eps_basic = v,
            Metric::CashAndEquivalents => bs.cash_and_equivalents = v,
            Metric::AccountsReceivable => bs.accounts_receivable = v,
            Metric::Inventory => bs.inventory = v,
            Metric::CurrentAssets => bs.current_assets = v,
            Metric::TotalAssets => bs.total_assets = v,
            Metric::CurrentLiabilities => bs.current_liabilities = v,
            Metric::TotalLiabilities => bs.total_liabilities = v,
            Metric::TotalDebt => bs.total_debt = v,
            Metric::ShareholdersEquity => bs.shareholders_equity = v,
            Metric::SharesOutstanding => bs.shares_outstanding = v,
            Metric::OperatingCashFlow => cf.operating_cash_flow = v,
            Metric::CapitalExpenditures => cf.capital_expenditures = v,
            Metric::DividendPayments => cf.dividend_payments = v,
        }
    }
}

/// A canonical metric, the source tags that feed it and the unit it is reported in.
#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub metric: Metric,
    pub tags: &'static [&'static str],
    pub unit: &'static str,
}

const USD: &str = "USD";
const USD_PER_SHARE: &str = "USD/shares";
const SHARES: &str = "shares";

pub const METRIC_DICTIONARY: &[MetricSpec] = &[
    // Income statement
    MetricSpec {
        metric: Metric::Revenue,
        tags: &[
            "Revenues",
            "SalesRevenueNet",
            "TotalRevenues",
            "RevenueFromContractWithCustomerExcludingAssessedTax",
        ],
        unit: USD,
    },
    MetricSpec {
        metric: Metric::CostOfGoodsSold,
        tags: &["CostOfGoodsAndServicesSold", "CostOfRevenue"],
        unit: USD,
    },
    MetricSpec { metric: Metric::GrossProfit, tags: &["GrossProfit"], unit: USD },
    MetricSpec { metric: Metric::OperatingIncome, tags: &["OperatingIncomeLoss"], unit: USD },
    MetricSpec { metric: Metric::InterestExpense, tags: &["InterestExpense"], unit: USD },
    MetricSpec { metric: Metric::NetIncome, tags: &["NetIncomeLoss", "ProfitLoss"], unit: USD },
    MetricSpec { metric: Metric::EpsDiluted, tags: &["EarningsPerShareDiluted"], unit: USD_PER_SHARE },
    MetricSpec { metric: Metric::EpsBasic, tags: &["EarningsPerShareBasic"], unit: USD_PER_SHARE },
    // Balance sheet
    MetricSpec {
        metric: Metric::CashAndEquivalents,
        tags: &["CashAndCashEquivalentsAtCarryingValue"],
        unit: USD,
    },
    MetricSpec { metric: Metric::AccountsReceivable, tags: &["AccountsReceivableNetCurrent"], unit: USD },
    MetricSpec { metric: Metric::Inventory, tags: &["InventoryNet"], unit: USD },
    MetricSpec { metric: Metric::CurrentAssets, tags: &["AssetsCurrent"], unit: USD },
    MetricSpec { metric: Metric::TotalAssets, tags: &["Assets"], unit: USD },
    MetricSpec { metric: Metric::CurrentLiabilities, tags: &["LiabilitiesCurrent"], unit: USD },
    MetricSpec { metric: Metric::TotalLiabilities, tags: &["Liabilities"], unit: USD },
    MetricSpec {
        metric: Metric::TotalDebt,
        tags: &[
            "DebtCurrent",
            "LongTermDebt",
            "LongTermDebtAndCapitalLeaseObligations",
            "LongTermDebtNoncurrent",
        ],
        unit: USD,
    },
    MetricSpec {
        metric: Metric::ShareholdersEquity,
        tags: &[
            "StockholdersEquity",
            "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
        ],
        unit: USD,
    },
    MetricSpec {
        metric: Metric::SharesOutstanding,
        tags: &[
            "WeightedAverageNumberOfDilutedSharesOutstanding",
            "WeightedAverageNumberOfSharesOutstandingBasic",
        ],
        unit: SHARES,
    },
    // Cash flow
    MetricSpec {
        metric: Metric::OperatingCashFlow,
        tags: &["NetCashProvidedByUsedInOperatingActivities"],
        unit: USD,
    },
    MetricSpec {
        metric: Metric::CapitalExpenditures,
        tags: &["PaymentsToAcquirePropertyPlantAndEquipment"],
        unit: USD,
    },
    MetricSpec { metric: Metric::DividendPayments, tags: &["PaymentsOfDividends"], unit: USD },
];

#[derive(Debug, Default)]
struct YearBucket {
    end_date: Option<NaiveDate>,
    values: BTreeMap<Metric, f64>,
}

/// Build up to `years` annual statements from a company-facts document,
/// most recent fiscal year first.
///
/// Every annual value reported for a metric's tags is summed within its
/// fiscal year. A year takes its period end from the first point that carries
/// one; years without any are dropped.
pub fn extract_statements(
    ticker: &str,
    facts: &CompanyFacts,
    dictionary: &[MetricSpec],
    years: usize,
    source_url: &str,
) -> Result<Vec<FinancialStatement>, AnalysisError> {
    if facts.us_gaap().is_none() {
        return Err(AnalysisError::InvalidData(format!(
            "company facts for {} have no us-gaap section",
            ticker
        )));
    }

    let mut buckets: BTreeMap<i32, YearBucket> = BTreeMap::new();

    for spec in dictionary {
        for tag in spec.tags {
            let points = facts.points(spec.metric.as_str(), tag, spec.unit);
            for point in points.into_iter().filter(|p| p.is_annual()) {
                let Some(fy) = point.fiscal_year else { continue };
                let bucket = buckets.entry(fy).or_default();
                if bucket.end_date.is_none() {
                    bucket.end_date = point.end;
                }
                *bucket.values.entry(spec.metric).or_insert(0.0) += point.value;
            }
        }
    }

    let retrieval_date = Utc::now();
    let statements: Vec<FinancialStatement> = buckets
        .into_iter()
        .rev()
        .filter_map(|(fy, bucket)| match bucket.end_date {
            Some(end_date) => Some((fy, end_date, bucket.values)),
            None => {
                tracing::debug!(ticker = %ticker, fiscal_year = fy, "Dropping fiscal year without period end date");
                None
            }
        })
        .take(years)
        .map(|(fy, end_date, values)| {
            let mut statement = FinancialStatement {
                ticker: ticker.to_string(),
                period: "FY".to_string(),
                fiscal_year: fy,
                end_date,
                income_statement: Default::default(),
                balance_sheet: Default::default(),
                cash_flow_statement: Default::default(),
                source_url: source_url.to_string(),
                retrieval_date,
            };
            for (metric, value) in values {
                metric.assign(&mut statement, value);
            }
            statement
        })
        .collect();

    if statements.is_empty() {
        return Err(AnalysisError::NoData(format!(
            "no annual filings with usable facts for {}",
            ticker
        )));
    }

    tracing::debug!(
        ticker = %ticker,
        "Extracted {} annual statements ({} to {})",
        statements.len(),
        statements[statements.len() - 1].fiscal_year,
        statements[0].fiscal_year
    );
    Ok(statements)
}
