//! Raw sheet rows -> typed [`MetricRecord`]s.
//!
//! Column positions are always resolved by header name through a
//! [`ColumnIndex`]; a header missing from the table just means the field
//! defaults to `""` or `0`.

use crate::table::{cell, ColumnIndex, RawTable};
use crate::types::{Dimension, Metric, MetricRecord, Metrics};
use crate::util::{parse_any_date, parse_br_currency, parse_br_integer, parse_br_number};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    #[default]
    Number,
    Currency,
    Integer,
}

impl NumberFormat {
    pub fn parse(self, s: &str) -> f64 {
        match self {
            NumberFormat::Number => parse_br_number(s),
            NumberFormat::Currency => parse_br_currency(s),
            NumberFormat::Integer => parse_br_integer(s),
        }
    }
}

/// A dimension and the header spellings it may appear under, in order of
/// preference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionColumn {
    pub dimension: Dimension,
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricColumn {
    pub metric: Metric,
    pub headers: Vec<String>,
    #[serde(default)]
    pub format: NumberFormat,
}

/// Rows whose `dimension` equals `value` (case-insensitive) are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exclusion {
    pub dimension: Dimension,
    pub value: String,
}

/// Everything that differs between sheets: column names, which keys are
/// mandatory and which metrics decide whether a row is blank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub name: String,
    /// Range (tab) name requested from the sheet service.
    pub range: String,
    #[serde(default)]
    pub dimensions: Vec<DimensionColumn>,
    #[serde(default)]
    pub metrics: Vec<MetricColumn>,
    /// Dropped when any of these is empty (or, for dates, unparseable).
    #[serde(default)]
    pub required: Vec<Dimension>,
    /// Dropped when every one of these cells is empty.
    #[serde(default)]
    pub primary_metrics: Vec<Metric>,
    #[serde(default)]
    pub excluded: Vec<Exclusion>,
    #[serde(default)]
    pub normalize_vehicles: bool,
}

/// Case-insensitive vendor label folding, e.g. `"Audience Network"` -> `"Meta"`.
#[derive(Debug, Clone, Default)]
pub struct VehicleAliases {
    aliases: HashMap<String, String>,
}

static DEFAULT_ALIASES: Lazy<VehicleAliases> = Lazy::new(|| {
    let mut a = VehicleAliases::empty();
    for label in ["audience network", "unknown", "threads", "messenger"] {
        a.insert(label, "Meta");
    }
    a
});

impl VehicleAliases {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Meta placements reported under their own names.
    pub fn standard() -> Self {
        DEFAULT_ALIASES.clone()
    }

    pub fn insert(&mut self, label: &str, canonical: &str) {
        self.aliases
            .insert(label.trim().to_lowercase(), canonical.to_string());
    }

    /// Unlisted labels pass through unchanged.
    pub fn canonical(&self, label: &str) -> String {
        self.aliases
            .get(&label.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub total_rows: usize,
    pub emitted: usize,
    pub dropped_missing_key: usize,
    pub dropped_empty_metrics: usize,
    pub excluded: usize,
    /// Schema columns not found in the table's header row.
    pub missing_columns: Vec<String>,
}

struct Resolved {
    dimensions: Vec<(Dimension, Option<usize>)>,
    metrics: Vec<(Metric, NumberFormat, Option<usize>)>,
}

impl DatasetSchema {
    fn resolve(&self, index: &ColumnIndex, missing: &mut Vec<String>) -> Resolved {
        let mut note = |headers: &[String], pos: Option<usize>| {
            if pos.is_none() {
                missing.push(headers.first().cloned().unwrap_or_default());
            }
            pos
        };
        let dimensions = self
            .dimensions
            .iter()
            .map(|c| (c.dimension, note(&c.headers, index.position_any(&c.headers))))
            .collect();
        let metrics = self
            .metrics
            .iter()
            .map(|c| {
                (
                    c.metric,
                    c.format,
                    note(&c.headers, index.position_any(&c.headers)),
                )
            })
            .collect();
        Resolved {
            dimensions,
            metrics,
        }
    }
}

enum RowOutcome {
    Record(MetricRecord),
    MissingKey,
    EmptyMetrics,
    Excluded,
}

fn normalize_row(
    row: &[String],
    cols: &Resolved,
    schema: &DatasetSchema,
    aliases: &VehicleAliases,
) -> RowOutcome {
    let mut record = MetricRecord::default();
    let mut raw_date = "";

    for &(dimension, pos) in &cols.dimensions {
        let value = cell(row, pos).trim();
        if dimension == Dimension::Date {
            raw_date = value;
            record.date = parse_any_date(value);
        } else if dimension == Dimension::Vehicle && schema.normalize_vehicles {
            record.set_label(dimension, aliases.canonical(value));
        } else {
            record.set_label(dimension, value.to_string());
        }
    }

    for &dimension in &schema.required {
        let present = match dimension {
            Dimension::Date => !raw_date.is_empty() && record.date.is_some(),
            other => !record.label(other).unwrap_or_default().is_empty(),
        };
        if !present {
            return RowOutcome::MissingKey;
        }
    }

    if !schema.primary_metrics.is_empty() {
        let all_blank = schema.primary_metrics.iter().all(|m| {
            cols.metrics
                .iter()
                .filter(|(metric, _, _)| metric == m)
                .all(|&(_, _, pos)| cell(row, pos).trim().is_empty())
        });
        if all_blank {
            return RowOutcome::EmptyMetrics;
        }
    }

    for ex in &schema.excluded {
        let value = record.key_part(ex.dimension);
        if value.to_lowercase() == ex.value.to_lowercase() {
            return RowOutcome::Excluded;
        }
    }

    let mut metrics = Metrics::default();
    for &(metric, format, pos) in &cols.metrics {
        metrics.add(metric, format.parse(cell(row, pos)));
    }
    record.metrics = metrics;
    RowOutcome::Record(record)
}

/// Normalize every data row of `table`, returning the surviving records in
/// sheet order plus counts of what was dropped and why.
pub fn normalize_table(
    table: &RawTable,
    schema: &DatasetSchema,
    aliases: &VehicleAliases,
) -> (Vec<MetricRecord>, LoadReport) {
    let mut report = LoadReport {
        total_rows: table.len(),
        ..Default::default()
    };
    if table.is_empty() {
        return (Vec::new(), report);
    }

    let index = table.column_index();
    let cols = schema.resolve(&index, &mut report.missing_columns);
    if !report.missing_columns.is_empty() {
        warn!(
            dataset = %schema.name,
            missing = ?report.missing_columns,
            "columns absent from sheet, defaulting"
        );
    }

    let mut records = Vec::with_capacity(table.len());
    for row in &table.rows {
        match normalize_row(row, &cols, schema, aliases) {
            RowOutcome::Record(r) => records.push(r),
            RowOutcome::MissingKey => report.dropped_missing_key += 1,
            RowOutcome::EmptyMetrics => report.dropped_empty_metrics += 1,
            RowOutcome::Excluded => report.excluded += 1,
        }
    }
    report.emitted = records.len();

    debug!(
        dataset = %schema.name,
        total = report.total_rows,
        emitted = report.emitted,
        missing_key = report.dropped_missing_key,
        empty = report.dropped_empty_metrics,
        excluded = report.excluded,
        "normalized table"
    );
    (records, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table(rows: &[&[&str]]) -> RawTable {
        RawTable::from_grid(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn schema() -> DatasetSchema {
        DatasetSchema {
            name: "test".into(),
            range: "Test".into(),
            dimensions: vec![
                DimensionColumn {
                    dimension: Dimension::Date,
                    headers: vec!["Date".into()],
                },
                DimensionColumn {
                    dimension: Dimension::Campaign,
                    headers: vec!["Campanha".into()],
                },
                DimensionColumn {
                    dimension: Dimension::Vehicle,
                    headers: vec!["Veículo".into()],
                },
            ],
            metrics: vec![
                MetricColumn {
                    metric: Metric::Impressions,
                    headers: vec!["Impressions".into()],
                    format: NumberFormat::Integer,
                },
                MetricColumn {
                    metric: Metric::Spend,
                    headers: vec!["Total spent".into()],
                    format: NumberFormat::Currency,
                },
                MetricColumn {
                    metric: Metric::VideoViews,
                    headers: vec!["Video Views".into(), "Video views".into()],
                    format: NumberFormat::Integer,
                },
            ],
            required: vec![Dimension::Date],
            primary_metrics: vec![Metric::Impressions, Metric::Spend],
            excluded: vec![],
            normalize_vehicles: true,
        }
    }

    #[test]
    fn aliases_fold_meta_placements() {
        let a = VehicleAliases::standard();
        for label in ["Audience Network", "unknown", "THREADS", "Messenger"] {
            assert_eq!(a.canonical(label), "Meta");
        }
        assert_eq!(a.canonical("Google"), "Google");
        assert_eq!(a.canonical("TikTok"), "TikTok");
    }

    #[test]
    fn drops_rows_without_date_or_metrics() {
        let t = table(&[
            &["Date", "Campanha", "Veículo", "Impressions", "Total spent"],
            &["01/03/2025", "A", "Threads", "1.000", "R$ 10,00"],
            &["", "A", "Meta", "5", "R$ 1,00"],
            &["xx/03/2025", "A", "Meta", "5", "R$ 1,00"],
            &["02/03/2025", "A", "Meta", "", ""],
            &["03/03/2025", "B", "Google", "0", ""],
        ]);
        let (records, report) = normalize_table(&t, &schema(), &VehicleAliases::standard());
        assert_eq!(report.total_rows, 5);
        assert_eq!(report.emitted, 2);
        assert_eq!(report.dropped_missing_key, 2);
        assert_eq!(report.dropped_empty_metrics, 1);

        assert_eq!(records[0].vehicle, "Meta");
        assert_eq!(records[0].metric(Metric::Impressions), 1000.0);
        assert!((records[0].metric(Metric::Spend) - 10.0).abs() < 1e-9);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(records[1].campaign, "B");
    }

    #[test]
    fn platform_exports_use_iso_dates() {
        let t = table(&[
            &["Date", "Impressions"],
            &["2025-03-07", "3"],
            &["07/03/2025", "4"],
            &["2025-13-01", "5"],
        ]);
        let (records, report) = normalize_table(&t, &schema(), &VehicleAliases::standard());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, records[1].date);
        assert_eq!(report.dropped_missing_key, 1);
    }

    #[test]
    fn missing_columns_default_to_zero_and_empty() {
        let t = table(&[&["Date", "Impressions"], &["01/03/2025", "7"]]);
        let (records, report) = normalize_table(&t, &schema(), &VehicleAliases::standard());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].campaign, "");
        assert_eq!(records[0].metric(Metric::Spend), 0.0);
        assert!(report.missing_columns.contains(&"Campanha".to_string()));
        assert!(report.missing_columns.contains(&"Video Views".to_string()));
    }

    #[test]
    fn alternate_header_spellings() {
        let t = table(&[&["Date", "Impressions", "Video views"], &["01/03/2025", "1", "42"]]);
        let (records, report) = normalize_table(&t, &schema(), &VehicleAliases::standard());
        assert_eq!(records[0].metric(Metric::VideoViews), 42.0);
        assert!(!report.missing_columns.contains(&"Video Views".to_string()));
    }

    #[test]
    fn exclusions_are_case_insensitive() {
        let mut s = schema();
        s.excluded.push(Exclusion {
            dimension: Dimension::Vehicle,
            value: "google".into(),
        });
        let t = table(&[
            &["Date", "Veículo", "Impressions"],
            &["01/03/2025", "Google", "1"],
            &["01/03/2025", "TikTok", "1"],
        ]);
        let (records, report) = normalize_table(&t, &s, &VehicleAliases::standard());
        assert_eq!(records.len(), 1);
        assert_eq!(report.excluded, 1);
    }

    #[test]
    fn empty_table_yields_nothing() {
        let t = table(&[&["Date", "Impressions"]]);
        let (records, report) = normalize_table(&t, &schema(), &VehicleAliases::standard());
        assert!(records.is_empty());
        assert_eq!(report.total_rows, 0);
        assert!(report.missing_columns.is_empty());
    }
}
