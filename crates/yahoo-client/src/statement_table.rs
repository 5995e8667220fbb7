use chrono::NaiveDate;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Line items by period end date: rows are named line items, columns are dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementTable {
    rows: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
}

impl StatementTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, row: &str, date: NaiveDate, value: f64) {
        self.rows.entry(row.to_string()).or_default().insert(date, value);
    }

    /// Unpack `fundamentals-timeseries` results.
    ///
    /// A result looks like
    /// `{"meta": {"type": ["annualTotalRevenue"]}, "annualTotalRevenue": [{"asOfDate": "2023-09-30", "reportedValue": {"raw": 1.0}}, null]}`.
    /// Rows are named after the type with its `annual` prefix removed.
    pub fn from_timeseries(results: &[Value]) -> Self {
        let mut table = Self::new();

        for result in results {
            let Some(type_name) = result
                .pointer("/meta/type/0")
                .and_then(Value::as_str)
            else {
                continue;
            };
            let row = type_name.strip_prefix("annual").unwrap_or(type_name);

            let Some(points) = result.get(type_name).and_then(Value::as_array) else {
                continue;
            };
            for point in points {
                let date = point
                    .get("asOfDate")
                    .and_then(Value::as_str)
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
                let value = point.pointer("/reportedValue/raw").and_then(Value::as_f64);
                if let (Some(date), Some(value)) = (date, value) {
                    table.insert(row, date, value);
                }
            }
        }

        table
    }

    pub fn value(&self, row: &str, date: NaiveDate) -> Option<f64> {
        self.rows.get(row).and_then(|cells| cells.get(&date)).copied()
    }

    /// Period end dates having a value in any of `rows`, most recent first.
    pub fn columns_for(&self, rows: &[&str]) -> Vec<NaiveDate> {
        let dates: BTreeSet<NaiveDate> = rows
            .iter()
            .filter_map(|row| self.rows.get(*row))
            .flat_map(|cells| cells.keys().copied())
            .collect();
        dates.into_iter().rev().collect()
    }
}
