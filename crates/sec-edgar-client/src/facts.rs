use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const US_GAAP: &str = "us-gaap";

/// Annual report forms whose facts feed the yearly statements.
pub const ANNUAL_FORMS: &[&str] = &["10-K", "10-K/A", "20-F", "40-F"];

/// `companyfacts` document: `facts -> taxonomy -> tag -> units -> unit -> [entry]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyFacts {
    #[serde(default)]
    pub cik: Option<u64>,
    #[serde(rename = "entityName", default)]
    pub entity_name: Option<String>,
    #[serde(default)]
    pub facts: HashMap<String, HashMap<String, TagFacts>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagFacts {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub units: HashMap<String, Vec<FactEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactEntry {
    pub val: f64,
    #[serde(default)]
    pub fy: Option<i32>,
    #[serde(default)]
    pub fp: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub filed: Option<NaiveDate>,
}

impl FactEntry {
    pub fn is_annual(&self) -> bool {
        is_annual(self.form.as_deref(), self.fp.as_deref())
    }
}

/// One flattened fact, tagged with the metric it was collected for.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFactPoint<'a> {
    pub metric: &'static str,
    pub tag: &'a str,
    pub unit: &'a str,
    pub value: f64,
    pub fiscal_year: Option<i32>,
    pub end: Option<NaiveDate>,
    pub form: Option<&'a str>,
    pub fiscal_period: Option<&'a str>,
}

impl CompanyFacts {
    pub fn us_gaap(&self) -> Option<&HashMap<String, TagFacts>> {
        self.facts.get(US_GAAP)
    }

    /// Every `us-gaap` entry for `tag` reported in `unit`.
    pub fn points<'a>(&'a self, metric: &'static str, tag: &'a str, unit: &'a str) -> Vec<RawFactPoint<'a>> {
        let entries = self
            .us_gaap()
            .and_then(|taxonomy| taxonomy.get(tag))
            .and_then(|tag_facts| tag_facts.units.get(unit));

        entries
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| RawFactPoint {
                        metric,
                        tag,
                        unit,
                        value: e.val,
                        fiscal_year: e.fy,
                        end: e.end,
                        form: e.form.as_deref(),
                        fiscal_period: e.fp.as_deref(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl RawFactPoint<'_> {
    pub fn is_annual(&self) -> bool {
        is_annual(self.form, self.fiscal_period)
    }
}

fn is_annual(form: Option<&str>, fiscal_period: Option<&str>) -> bool {
    form.map(|f| ANNUAL_FORMS.contains(&f)).unwrap_or(false) && fiscal_period == Some("FY")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserializes_companyfacts_shape() {
        let doc = json!({
            "cik": 320193,
            "entityName": "Apple Inc.",
            "facts": {
                "us-gaap": {
                    "Assets": {
                        "label": "Assets",
                        "units": {
                            "USD": [
                                {"val": 352755000000.0, "fy": 2023, "fp": "FY", "form": "10-K", "end": "2023-09-30", "filed": "2023-11-03", "accn": "0000320193-23-000106"}
                            ]
                        }
                    }
                }
            }
        });

        let facts: CompanyFacts = serde_json::from_value(doc).unwrap();
        let points = facts.points("total_assets", "Assets", "USD");

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].fiscal_year, Some(2023));
        assert_eq!(points[0].end, NaiveDate::from_ymd_opt(2023, 9, 30));
        assert!(points[0].is_annual());
    }

    #[test]
    fn test_missing_tag_or_unit_yields_no_points() {
        let facts = CompanyFacts::default();
        assert!(facts.points("revenue", "Revenues", "USD").is_empty());
        assert!(facts.us_gaap().is_none());
    }

    #[test]
    fn test_quarterly_and_non_annual_forms_are_not_annual() {
        let q = FactEntry {
            val: 1.0,
            fy: Some(2023),
            fp: Some("Q2".into()),
            form: Some("10-Q".into()),
            end: None,
            filed: None,
        };
        assert!(!q.is_annual());

        let fy_in_10q = FactEntry {
            fp: Some("FY".into()),
            ..q.clone()
        };
        assert!(!fy_in_10q.is_annual());

        let amended = FactEntry {
            fp: Some("FY".into()),
            form: Some("10-K/A".into()),
            ..q
        };
        assert!(amended.is_annual());
    }
}
