//! fin-analyze: acquire filings and market data for one or more tickers,
//! compute ratios and narrative, and print the resulting analyses as JSON.
//!
//! Usage:
//!   cargo run -p analysis-runner -- --ticker AAPL
//!   cargo run -p analysis-runner -- --tickers AAPL MSFT --years 3 --pretty
//!
//! Set LOG_FORMAT=json for JSON log lines on stderr.

mod args;

use analysis_core::AnalysisConfig;
use analysis_orchestrator::AnalysisPipeline;
use anyhow::Context;
use args::RunnerArgs;
use std::sync::Arc;

const DEFAULT_LOG_FILTER: &str =
    "analysis_runner=info,analysis_orchestrator=info,sec_edgar_client=info,yahoo_client=info,response_cache=warn";

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = RunnerArgs::parse(&argv)?;

    let mut config = AnalysisConfig::from_env().context("invalid configuration")?;
    if let Some(years) = args.years {
        config.num_historical_years = years;
    }

    let pipeline = Arc::new(
        AnalysisPipeline::from_config(&config)
            .await
            .context("failed to initialise analysis pipeline")?,
    );

    tracing::info!("Analysing {} ticker(s): {:?}", args.tickers.len(), args.tickers);
    let results = pipeline.analyze_many(args.tickers.clone()).await;

    let mut analyses = Vec::new();
    let mut failed = Vec::new();
    for (ticker, result) in results {
        match result {
            Ok(analysis) => analyses.push(analysis),
            Err(e) => {
                tracing::error!("Analysis failed for {}: {}", ticker, e);
                failed.push(ticker);
            }
        }
    }

    let output = if args.pretty {
        serde_json::to_string_pretty(&analyses)?
    } else {
        serde_json::to_string(&analyses)?
    };
    println!("{}", output);

    if !failed.is_empty() {
        anyhow::bail!("analysis failed for {}", failed.join(", "));
    }
    Ok(())
}
