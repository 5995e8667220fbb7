use analysis_core::{FinancialRatios, FinancialStatement};

/// `numerator / denominator`, or `None` if either side is missing or the denominator is zero.
pub fn safe_divide(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// Ratios for one statement. Uses period-end balances rather than averages.
pub fn calculate_ratios(statement: &FinancialStatement) -> FinancialRatios {
    let i = &statement.income_statement;
    let b = &statement.balance_sheet;
    let c = &statement.cash_flow_statement;

    let quick_assets = match (b.current_assets, b.inventory) {
        (Some(assets), Some(inventory)) => Some(assets - inventory),
        _ => None,
    };

    FinancialRatios {
        ticker: statement.ticker.clone(),
        period: statement.period.clone(),
        fiscal_year: statement.fiscal_year,

        // Liquidity
        current_ratio: safe_divide(b.current_assets, b.current_liabilities),
        quick_ratio: safe_divide(quick_assets, b.current_liabilities),
        cash_ratio: safe_divide(b.cash_and_equivalents, b.current_liabilities),

        // Profitability
        roe: safe_divide(i.net_income, b.shareholders_equity),
        roa: safe_divide(i.net_income, b.total_assets),
        gross_margin: safe_divide(i.gross_profit, i.revenue),
        net_margin: safe_divide(i.net_income, i.revenue),
        ebitda_margin: safe_divide(i.ebitda, i.revenue),

        // Leverage
        debt_to_equity: safe_divide(b.total_debt, b.shareholders_equity),
        debt_to_assets: safe_divide(b.total_debt, b.total_assets),
        times_interest_earned: safe_divide(i.operating_income, i.interest_expense),
        // Simplified DSCR: operating cash flow over total debt
        debt_service_coverage: safe_divide(c.operating_cash_flow, b.total_debt),

        // Efficiency
        asset_turnover: safe_divide(i.revenue, b.total_assets),
        inventory_turnover: safe_divide(i.cost_of_goods_sold, b.inventory),
        receivables_turnover: safe_divide(i.revenue, b.accounts_receivable),
    }
}
