//! CSV and JSON export of segmented customers and segment analysis.

use std::fs;
use std::path::{Path, PathBuf};

use rfm_core::{RfmError, RfmResult, Segment, SegmentedRecord};
use serde_json::{json, Value};
use tracing::info;

use crate::analysis::SegmentAnalysis;
use crate::dataset::csv_error;

pub const SEGMENTED_COLUMNS: [&str; 12] = [
    "customer_id",
    "recency_days",
    "frequency",
    "monetary",
    "state",
    "city",
    "total_freight",
    "r_score",
    "f_score",
    "m_score",
    "segment",
    "rfm_total",
];

pub const ANALYSIS_COLUMNS: [&str; 16] = [
    "segment",
    "customer_count",
    "total_revenue",
    "avg_spent",
    "median_spent",
    "avg_orders",
    "avg_recency",
    "avg_order_value",
    "avg_r",
    "avg_f",
    "avg_m",
    "avg_rfm_total",
    "repeat_rate",
    "customer_pct",
    "revenue_pct",
    "top_state",
];

/// Export target, one per configured output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn parse(name: &str) -> RfmResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(RfmError::Config(format!("unsupported output format: {other:?}"))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

fn record_row(record: &SegmentedRecord) -> Vec<Value> {
    let metrics = record.metrics();
    vec![
        json!(metrics.customer_id),
        json!(metrics.recency_days),
        json!(metrics.frequency),
        json!(metrics.monetary),
        json!(metrics.state),
        json!(metrics.city),
        json!(metrics.total_freight),
        json!(record.scored.r_score.get()),
        json!(record.scored.f_score.get()),
        json!(record.scored.m_score.get()),
        json!(record.segment.as_str()),
        json!(record.rfm_total),
    ]
}

fn analysis_rows(analysis: &SegmentAnalysis) -> Vec<Vec<Value>> {
    analysis
        .segments
        .iter()
        .map(|s| {
            vec![
                json!(s.segment.as_str()),
                json!(s.customer_count),
                json!(s.total_revenue),
                json!(s.avg_spent),
                json!(s.median_spent),
                json!(s.avg_orders),
                json!(s.avg_recency),
                json!(s.avg_order_value),
                json!(s.avg_r),
                json!(s.avg_f),
                json!(s.avg_m),
                json!(s.avg_rfm_total),
                json!(s.repeat_rate),
                json!(s.customer_pct),
                json!(s.revenue_pct),
                json!(s.top_state),
            ]
        })
        .collect()
}

fn to_csv(columns: &[&str], rows: impl IntoIterator<Item = Vec<Value>>) -> RfmResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns).map_err(csv_error)?;
    for row in rows {
        writer
            .write_record(row.iter().map(cell))
            .map_err(csv_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| RfmError::Io(err.into_error()))?;
    String::from_utf8(bytes).map_err(|err| RfmError::Dataset(err.to_string()))
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn records_to_csv(records: &[SegmentedRecord]) -> RfmResult<String> {
    to_csv(&SEGMENTED_COLUMNS, records.iter().map(record_row))
}

pub fn analysis_to_csv(analysis: &SegmentAnalysis) -> RfmResult<String> {
    to_csv(&ANALYSIS_COLUMNS, analysis_rows(analysis))
}

pub fn records_to_json(records: &[SegmentedRecord]) -> RfmResult<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

pub fn analysis_to_json(analysis: &SegmentAnalysis) -> RfmResult<String> {
    Ok(serde_json::to_string_pretty(analysis)?)
}

/// Writes `segmented_customers.*` and `segment_analysis.*` for every format
/// into `dir`, creating it if needed. Returns the written paths.
pub fn write_outputs(
    dir: &Path,
    formats: &[ExportFormat],
    records: &[SegmentedRecord],
    analysis: &SegmentAnalysis,
) -> RfmResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for format in formats {
        let (customers, summary) = match format {
            ExportFormat::Csv => (records_to_csv(records)?, analysis_to_csv(analysis)?),
            ExportFormat::Json => (records_to_json(records)?, analysis_to_json(analysis)?),
        };
        for (stem, body) in [("segmented_customers", customers), ("segment_analysis", summary)] {
            let path = dir.join(format!("{stem}.{}", format.extension()));
            fs::write(&path, body)?;
            info!(path = %path.display(), "Report written");
            written.push(path);
        }
    }
    Ok(written)
}

/// File stem for a segment's detail export, e.g. `at_risk_high_value`.
pub fn details_stem(segment: Segment) -> String {
    segment
        .as_str()
        .to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Writes `<segment>_details.csv` with the customers of every segment
/// present. Returns the written paths in rule order.
pub fn write_segment_details(dir: &Path, records: &[SegmentedRecord]) -> RfmResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for segment in Segment::ALL {
        let members: Vec<&SegmentedRecord> =
            records.iter().filter(|r| r.segment == segment).collect();
        if members.is_empty() {
            continue;
        }
        let path = dir.join(format!("{}_details.csv", details_stem(segment)));
        fs::write(&path, to_csv(&SEGMENTED_COLUMNS, members.into_iter().map(record_row))?)?;
        info!(path = %path.display(), segment = %segment, "Segment details written");
        written.push(path);
    }
    Ok(written)
}
