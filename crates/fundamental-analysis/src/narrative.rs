use analysis_core::{FinancialRatios, Narrative, NarrativeValue};
use std::fmt;

/// Direction of a ratio over the analysed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
            Trend::InsufficientData => "stable (insufficient data)",
        };
        f.write_str(label)
    }
}

/// Which way a metric has to move to count as an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricDirection {
    HigherIsBetter,
    LowerIsBetter,
}

/// Compare the most recent valid value with the oldest valid one.
///
/// `values` are ordered most recent first; `None` entries are skipped.
pub fn trend(values: &[Option<f64>], direction: MetricDirection) -> Trend {
    let valid: Vec<f64> = values.iter().flatten().copied().collect();
    if valid.len() < 2 {
        return Trend::InsufficientData;
    }

    let latest = valid[0];
    let oldest = valid[valid.len() - 1];
    if latest == oldest {
        return Trend::Stable;
    }

    let went_up = latest > oldest;
    match (direction, went_up) {
        (MetricDirection::HigherIsBetter, true) | (MetricDirection::LowerIsBetter, false) => Trend::Improving,
        _ => Trend::Declining,
    }
}

fn series(ratios: &[FinancialRatios], pick: fn(&FinancialRatios) -> Option<f64>) -> Vec<Option<f64>> {
    ratios.iter().map(pick).collect()
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

pub fn analyze_liquidity(ratios: &[FinancialRatios]) -> String {
    let Some(current) = ratios.first().and_then(|r| r.current_ratio) else {
        return "Liquidity data is not available.".to_string();
    };
    let t = trend(&series(ratios, |r| r.current_ratio), MetricDirection::HigherIsBetter);

    let verdict = if current >= 2.0 {
        "This indicates a very strong ability to meet short-term obligations."
    } else if current >= 1.5 {
        "This suggests a healthy liquidity position."
    } else if current >= 1.0 {
        "This indicates an adequate but potentially tight liquidity position."
    } else {
        "This is below 1.0, signaling potential risk in meeting short-term liabilities."
    };

    format!(
        "The most recent Current Ratio is {:.2}, showing a {} trend. {}",
        current, t, verdict
    )
}

pub fn analyze_profitability(ratios: &[FinancialRatios]) -> String {
    let latest = ratios.first();
    let (Some(net_margin), Some(roe)) = (latest.and_then(|r| r.net_margin), latest.and_then(|r| r.roe)) else {
        return "Profitability data is not available.".to_string();
    };
    let t = trend(&series(ratios, |r| r.net_margin), MetricDirection::HigherIsBetter);

    let verdict = if net_margin >= 0.15 {
        "This indicates excellent profitability and strong operational efficiency."
    } else if net_margin >= 0.05 {
        "This reflects solid profitability."
    } else if net_margin > 0.0 {
        "Profitability is positive but margins are thin, suggesting competitive pressure or high costs."
    } else {
        "The company is operating at a net loss, which is a significant concern."
    };

    format!(
        "The company's latest Net Profit Margin is {}, with a {} trend over the analyzed period. \
         Return on Equity (ROE) stands at {}. {}",
        percent(net_margin),
        t,
        percent(roe),
        verdict
    )
}

pub fn analyze_leverage(ratios: &[FinancialRatios]) -> String {
    let Some(de) = ratios.first().and_then(|r| r.debt_to_equity) else {
        return "Leverage data is not available.".to_string();
    };
    let t = trend(&series(ratios, |r| r.debt_to_equity), MetricDirection::LowerIsBetter);

    let verdict = if de <= 0.4 {
        "This indicates a conservative and strong balance sheet with low reliance on debt."
    } else if de <= 1.0 {
        "This suggests a moderate and generally acceptable level of debt."
    } else if de <= 2.0 {
        "This indicates an elevated level of debt, increasing financial risk."
    } else {
        "This represents a high level of debt, which may pose significant financial risk."
    };

    format!(
        "The Debt-to-Equity ratio is {:.2}. The trend is {} (a lower ratio is generally favorable). {}",
        de, t, verdict
    )
}

pub fn analyze_efficiency(ratios: &[FinancialRatios]) -> String {
    let Some(turnover) = ratios.first().and_then(|r| r.asset_turnover) else {
        return "Efficiency data is not available.".to_string();
    };
    let t = trend(&series(ratios, |r| r.asset_turnover), MetricDirection::HigherIsBetter);

    let verdict = if turnover >= 1.0 {
        "A ratio above 1.0 suggests efficient use of assets."
    } else if turnover >= 0.5 {
        "This suggests a moderate level of asset efficiency."
    } else {
        "A low ratio may indicate underutilization of assets or an asset-heavy business model."
    };

    format!(
        "Asset Turnover ratio is {:.2}, with a {} trend. \
         This ratio measures how efficiently the company uses its assets to generate revenue. {}",
        turnover, t, verdict
    )
}

/// Flagged strengths and concerns from the latest ratios.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Synthesis {
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
}

impl Synthesis {
    pub fn overall_summary(&self) -> &'static str {
        if self.strengths.len() > self.concerns.len() && self.concerns.is_empty() {
            "The company demonstrates a strong overall financial position based on the available data."
        } else if self.concerns.len() > self.strengths.len() {
            "The analysis highlights several areas of concern that warrant attention."
        } else {
            "The company presents a mixed financial profile."
        }
    }
}

pub fn synthesize(latest: &FinancialRatios, liquidity: &str, profitability: &str, leverage: &str) -> Synthesis {
    let mut out = Synthesis::default();

    match latest.current_ratio {
        Some(cr) if cr >= 1.5 => out.strengths.push(format!("Strong liquidity ({})", liquidity)),
        Some(cr) if cr < 1.0 => out.concerns.push(format!("Potential liquidity risk ({})", liquidity)),
        _ => {}
    }

    match latest.net_margin {
        Some(nm) if nm >= 0.10 => out.strengths.push(format!("High profitability ({})", profitability)),
        Some(nm) if nm < 0.0 => out.concerns.push(format!("Operating at a net loss ({})", profitability)),
        _ => {}
    }

    match latest.debt_to_equity {
        Some(de) if de <= 0.5 => out.strengths.push(format!("Low financial leverage ({})", leverage)),
        Some(de) if de > 1.5 => out.concerns.push(format!("High debt levels ({})", leverage)),
        _ => {}
    }

    out
}

/// Narrative over ratio records ordered most recent first.
pub fn generate_qualitative_analysis(ratios: &[FinancialRatios]) -> Narrative {
    let mut narrative = Narrative::new();

    let Some(latest) = ratios.first() else {
        tracing::warn!("Cannot generate analysis: historical ratios list is empty");
        narrative.insert(
            "error".to_string(),
            NarrativeValue::Text("No ratio data available to analyze.".to_string()),
        );
        return narrative;
    };

    tracing::info!(ticker = %latest.ticker, "Generating qualitative analysis");

    let liquidity = analyze_liquidity(ratios);
    let profitability = analyze_profitability(ratios);
    let leverage = analyze_leverage(ratios);
    let efficiency = analyze_efficiency(ratios);
    let synthesis = synthesize(latest, &liquidity, &profitability, &leverage);
    let overall = synthesis.overall_summary().to_string();

    narrative.insert("liquidity".to_string(), NarrativeValue::Text(liquidity));
    narrative.insert("profitability".to_string(), NarrativeValue::Text(profitability));
    narrative.insert("leverage".to_string(), NarrativeValue::Text(leverage));
    narrative.insert("efficiency".to_string(), NarrativeValue::Text(efficiency));
    narrative.insert("key_strengths".to_string(), NarrativeValue::List(synthesis.strengths));
    narrative.insert("key_concerns".to_string(), NarrativeValue::List(synthesis.concerns));
    narrative.insert("overall_summary".to_string(), NarrativeValue::Text(overall));
    narrative
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratios(values: &[(Option<f64>, Option<f64>, Option<f64>, Option<f64>)]) -> Vec<FinancialRatios> {
        values
            .iter()
            .enumerate()
            .map(|(i, &(current_ratio, net_margin, debt_to_equity, asset_turnover))| FinancialRatios {
                ticker: "TEST".to_string(),
                period: "FY".to_string(),
                fiscal_year: 2023 - i as i32,
                current_ratio,
                net_margin,
                roe: net_margin.map(|m| m * 2.0),
                debt_to_equity,
                asset_turnover,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_trend_direction_aware() {
        let de = [Some(0.8), Some(1.0), Some(1.2)];
        assert_eq!(trend(&de, MetricDirection::LowerIsBetter), Trend::Improving);

        let cr = [Some(2.0), Some(1.5), Some(1.0)];
        assert_eq!(trend(&cr, MetricDirection::HigherIsBetter), Trend::Improving);

        assert_eq!(trend(&de, MetricDirection::HigherIsBetter), Trend::Declining);
        assert_eq!(trend(&cr, MetricDirection::LowerIsBetter), Trend::Declining);
    }

    #[test]
    fn test_trend_skips_missing_and_handles_short_series() {
        assert_eq!(trend(&[Some(1.0), None, Some(1.0)], MetricDirection::HigherIsBetter), Trend::Stable);
        assert_eq!(trend(&[Some(1.0), None, None], MetricDirection::HigherIsBetter), Trend::InsufficientData);
        assert_eq!(trend(&[], MetricDirection::LowerIsBetter), Trend::InsufficientData);
        assert_eq!(trend(&[None, Some(3.0), Some(1.0)], MetricDirection::HigherIsBetter), Trend::Improving);
    }

    #[test]
    fn test_liquidity_bands() {
        let text = analyze_liquidity(&ratios(&[(Some(2.5), None, None, None)]));
        assert!(text.starts_with("The most recent Current Ratio is 2.50, showing a stable (insufficient data) trend."));
        assert!(text.contains("very strong"));

        assert!(analyze_liquidity(&ratios(&[(Some(1.6), None, None, None)])).contains("healthy"));
        assert!(analyze_liquidity(&ratios(&[(Some(1.2), None, None, None)])).contains("adequate but potentially tight"));
        assert!(analyze_liquidity(&ratios(&[(Some(0.8), None, None, None)])).contains("below 1.0"));
        assert_eq!(
            analyze_liquidity(&ratios(&[(None, None, None, None)])),
            "Liquidity data is not available."
        );
    }

    #[test]
    fn test_profitability_quotes_margin_and_roe() {
        let text = analyze_profitability(&ratios(&[(None, Some(0.2), None, None), (None, Some(0.1), None, None)]));
        assert!(text.contains("Net Profit Margin is 20.00%"));
        assert!(text.contains("with a improving trend"));
        assert!(text.contains("(ROE) stands at 40.00%"));
        assert!(text.contains("excellent profitability"));

        assert!(analyze_profitability(&ratios(&[(None, Some(-0.1), None, None)])).contains("net loss"));
        assert_eq!(
            analyze_profitability(&ratios(&[(None, None, None, None)])),
            "Profitability data is not available."
        );
    }

    #[test]
    fn test_leverage_and_efficiency_bands() {
        assert!(analyze_leverage(&ratios(&[(None, None, Some(0.3), None)])).contains("conservative"));
        assert!(analyze_leverage(&ratios(&[(None, None, Some(0.9), None)])).contains("moderate"));
        assert!(analyze_leverage(&ratios(&[(None, None, Some(1.8), None)])).contains("elevated"));
        assert!(analyze_leverage(&ratios(&[(None, None, Some(2.5), None)])).contains("high level of debt"));

        assert!(analyze_efficiency(&ratios(&[(None, None, None, Some(1.2))])).contains("efficient use"));
        assert!(analyze_efficiency(&ratios(&[(None, None, None, Some(0.7))])).contains("moderate level"));
        assert!(analyze_efficiency(&ratios(&[(None, None, None, Some(0.2))])).contains("underutilization"));
    }

    #[test]
    fn test_strong_overall_summary() {
        let narrative = generate_qualitative_analysis(&ratios(&[(Some(2.0), Some(0.2), Some(0.3), Some(1.0))]));

        let strengths = narrative["key_strengths"].as_list().unwrap();
        assert_eq!(strengths.len(), 3);
        assert!(strengths[0].starts_with("Strong liquidity ("));
        assert!(narrative["key_concerns"].as_list().unwrap().is_empty());
        assert_eq!(
            narrative["overall_summary"].as_text(),
            Some("The company demonstrates a strong overall financial position based on the available data.")
        );
    }

    #[test]
    fn test_concerns_and_mixed_summary() {
        let weak = generate_qualitative_analysis(&ratios(&[(Some(0.5), Some(-0.1), Some(2.0), None)]));
        assert_eq!(weak["key_concerns"].as_list().unwrap().len(), 3);
        assert_eq!(
            weak["overall_summary"].as_text(),
            Some("The analysis highlights several areas of concern that warrant attention.")
        );

        let mixed = generate_qualitative_analysis(&ratios(&[(Some(2.0), Some(-0.1), Some(1.0), None)]));
        assert_eq!(
            mixed["overall_summary"].as_text(),
            Some("The company presents a mixed financial profile.")
        );
    }

    #[test]
    fn test_empty_input_yields_error_entry() {
        let narrative = generate_qualitative_analysis(&[]);
        assert_eq!(narrative.len(), 1);
        assert_eq!(narrative["error"].as_text(), Some("No ratio data available to analyze."));
    }

    #[test]
    fn test_narrative_has_all_sections() {
        let narrative = generate_qualitative_analysis(&ratios(&[(Some(1.2), Some(0.07), Some(0.9), Some(0.6))]));
        for key in [
            "liquidity",
            "profitability",
            "leverage",
            "efficiency",
            "key_strengths",
            "key_concerns",
            "overall_summary",
        ] {
            assert!(narrative.contains_key(key), "missing {}", key);
        }
    }
}
