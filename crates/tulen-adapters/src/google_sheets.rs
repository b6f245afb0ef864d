// ABOUTME: Google Sheets adapter summing marketing rows read through values:batchGet
// ABOUTME: Header columns are matched case-insensitively and rows are filtered by their Date cell
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::constants::platforms::GOOGLE_SHEETS_API_BASE_URL;
use crate::core::{AdapterContext, PlatformAdapter};
use crate::errors::PlatformResult;
use crate::google_ads::classify_google_error;
use crate::models::date_range::parse_date;
use crate::models::{DateRange, FetchOptions, MetricTotals, MetricsEnvelope, Platform};
use crate::normalize::{to_count, value_as_f64};

/// Range read when a binding names none: every column of the first sheet
pub const DEFAULT_SHEET_RANGE: &str = "A:Z";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    range: String,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Column positions found in a block's header row
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    date: Option<usize>,
    leads: Option<usize>,
    spend: Option<usize>,
    impressions: Option<usize>,
    clicks: Option<usize>,
    conversions: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &[Value]) -> Self {
        let mut map = Self::default();
        for (index, cell) in header.iter().enumerate() {
            let name = cell_text(cell).trim().to_ascii_lowercase();
            let slot = match name.as_str() {
                "date" | "day" => &mut map.date,
                "leads" | "lead" | "inquiries" => &mut map.leads,
                "spend" | "cost" | "amount spent" | "ad spend" => &mut map.spend,
                "impressions" => &mut map.impressions,
                "clicks" => &mut map.clicks,
                "conversions" | "bookings" | "sales" => &mut map.conversions,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(index);
            }
        }
        map
    }

    fn has_metrics(&self) -> bool {
        self.leads.is_some()
            || self.spend.is_some()
            || self.impressions.is_some()
            || self.clicks.is_some()
            || self.conversions.is_some()
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn cell_number(row: &[Value], column: Option<usize>) -> f64 {
    column
        .and_then(|index| row.get(index))
        .map_or(0.0, |cell| value_as_f64(Some(cell)))
}

/// Sum one value range block; rows outside `date_range` are skipped
///
/// Without a date column every row counts. Rows whose date cell cannot be
/// parsed are skipped.
fn sum_block(block: &ValueRange, date_range: &DateRange) -> MetricTotals {
    let mut rows = block.values.iter();
    let Some(header) = rows.next() else {
        return MetricTotals::default();
    };
    let columns = ColumnMap::from_header(header);
    if !columns.has_metrics() {
        debug!(platform = %Platform::GoogleSheets, range = %block.range, "no metric columns in block");
        return MetricTotals::default();
    }

    let mut spend = 0.0;
    let mut counts = [0.0_f64; 4];
    for row in rows {
        if let Some(date_column) = columns.date {
            let day = row
                .get(date_column)
                .map(cell_text)
                .and_then(|text| parse_date(&text).ok());
            match day {
                Some(day) if date_range.contains(day) => {}
                _ => continue,
            }
        }
        spend += cell_number(row, columns.spend);
        counts[0] += cell_number(row, columns.impressions);
        counts[1] += cell_number(row, columns.clicks);
        counts[2] += cell_number(row, columns.leads);
        counts[3] += cell_number(row, columns.conversions);
    }

    MetricTotals {
        impressions: to_count(counts[0]),
        clicks: to_count(counts[1]),
        spend,
        leads: to_count(counts[2]),
        conversions: to_count(counts[3]),
    }
}

/// Google Sheets adapter
#[derive(Debug, Clone)]
pub struct GoogleSheetsAdapter {
    context: AdapterContext,
    base_url: String,
}

impl GoogleSheetsAdapter {
    /// Adapter against the production Sheets API
    #[must_use]
    pub fn new(context: AdapterContext) -> Self {
        Self {
            context,
            base_url: GOOGLE_SHEETS_API_BASE_URL.to_owned(),
        }
    }

    /// Point at another API host (tests, proxies)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }
}

#[async_trait]
impl PlatformAdapter for GoogleSheetsAdapter {
    fn platform(&self) -> Platform {
        Platform::GoogleSheets
    }

    async fn fetch_metrics(
        &self,
        access_token: &str,
        account_id: &str,
        date_range: &DateRange,
        options: &FetchOptions,
    ) -> PlatformResult<MetricsEnvelope> {
        info!(platform = %Platform::GoogleSheets, spreadsheet_id = account_id, range = %date_range, "reading value ranges");

        let url = format!("{}/spreadsheets/{account_id}/values:batchGet", self.base_url);
        let mut query: Vec<(&str, &str)> = vec![
            ("majorDimension", "ROWS"),
            ("valueRenderOption", "FORMATTED_VALUE"),
        ];
        if options.sheet_ranges.is_empty() {
            query.push(("ranges", DEFAULT_SHEET_RANGE));
        } else {
            query.extend(options.sheet_ranges.iter().map(|range| ("ranges", range.as_str())));
        }

        let response: BatchGetResponse = self
            .context
            .request_json(Platform::GoogleSheets, classify_google_error, |client| {
                client.get(&url).bearer_auth(access_token).query(&query)
            })
            .await?;

        let mut totals = MetricTotals::default();
        for block in &response.value_ranges {
            totals += sum_block(block, date_range);
        }
        debug!(platform = %Platform::GoogleSheets, blocks = response.value_ranges.len(), "value ranges summed");

        Ok(MetricsEnvelope::new(Platform::GoogleSheets, account_id, *date_range, totals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(values: Value) -> ValueRange {
        serde_json::from_value(json!({"range": "Sheet1!A1:F10", "values": values})).unwrap()
    }

    #[test]
    fn headers_match_case_insensitively() {
        let columns = ColumnMap::from_header(&[json!(" DATE "), json!("Spend"), json!("leads")]);
        assert_eq!(columns.date, Some(0));
        assert_eq!(columns.spend, Some(1));
        assert_eq!(columns.leads, Some(2));
        assert_eq!(columns.clicks, None);
    }

    #[test]
    fn rows_outside_range_are_skipped() {
        let range = DateRange::parse("2024-03-01", "2024-03-31").unwrap();
        let totals = sum_block(
            &block(json!([
                ["Date", "Leads", "Spend", "Clicks"],
                ["2024-02-28", "9", "$900", "90"],
                ["2024-03-01", "3", "$1,200.50", "30"],
                ["03/15/2024", 2, 99.5, 10],
                ["not a date", "100", "100", "100"]
            ])),
            &range,
        );
        assert_eq!(totals.leads, 5);
        assert_eq!(totals.clicks, 40);
        assert!((totals.spend - 1300.0).abs() < 1e-9);
    }

    #[test]
    fn block_without_date_column_counts_every_row() {
        let range = DateRange::parse("2024-03-01", "2024-03-31").unwrap();
        let totals = sum_block(
            &block(json!([["Leads", "Conversions"], ["4", "1"], ["6", "2"]])),
            &range,
        );
        assert_eq!(totals.leads, 10);
        assert_eq!(totals.conversions, 3);
    }

    #[test]
    fn empty_or_unrelated_blocks_contribute_nothing() {
        let range = DateRange::parse("2024-03-01", "2024-03-31").unwrap();
        assert_eq!(sum_block(&block(json!([])), &range), MetricTotals::default());
        assert_eq!(
            sum_block(&block(json!([["Name", "Email"], ["a", "b"]])), &range),
            MetricTotals::default()
        );
    }
}
