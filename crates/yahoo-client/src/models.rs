use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    pub quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteSummaryBody {
    #[serde(default)]
    pub result: Option<Vec<QuoteSummaryResult>>,
    #[serde(default)]
    pub error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct YahooApiError {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryResult {
    #[serde(default)]
    pub asset_profile: Option<AssetProfile>,
    #[serde(default)]
    pub price: Option<PriceModule>,
    #[serde(default)]
    pub quote_type: Option<QuoteTypeModule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetProfile {
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub long_business_summary: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceModule {
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub exchange_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTypeModule {
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimeseriesResponse {
    pub timeseries: TimeseriesBody,
}

/// Each result object carries `meta.type[0]` and an array under that same key,
/// so results are kept as raw JSON and unpacked by `StatementTable`.
#[derive(Debug, Deserialize)]
pub(crate) struct TimeseriesBody {
    #[serde(default)]
    pub result: Vec<Value>,
}
