//! Record normalization: raw tabular extract in, canonical records out.
//!
//! Columns are selected by name through an explicit [`ColumnMap`], since the
//! source extracts name their columns slightly differently across variants.
//! Normalization is a pure function of the table plus the mapping; a missing
//! required header aborts the whole batch, while bad individual rows are
//! rejected with a reason and ingestion continues.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

use crate::error::{IngestError, RejectReason, RowRejection};
use crate::record::DeliveryRecord;

/// Mapping from logical column names to the source extract's column names.
///
/// Deserializable so a mapping for a differently-labeled extract can be
/// loaded from a JSON file; the default matches the original delivery sheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub city: String,
    pub delivery_time: String,
    pub operator: String,
    pub order_id: String,
    pub lead_time_days: String,
    pub vin: Option<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap {
            city: "交付城市".to_string(),
            delivery_time: "交付时间".to_string(),
            operator: "交付A岗".to_string(),
            order_id: "订单ID".to_string(),
            lead_time_days: "PDI OK→交付".to_string(),
            vin: None,
        }
    }
}

impl ColumnMap {
    /// Loads a column mapping from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// A raw tabular extract: named columns and string cells, exactly as read.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Reads a raw table from any CSV source.
    pub fn from_csv_reader<R: Read>(mut rdr: csv::Reader<R>) -> Result<Self, IngestError> {
        let headers = rdr.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(RawTable { headers, rows })
    }

    /// Reads a raw table from a CSV file on disk.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let file = File::open(path)?;
        Self::from_csv_reader(csv::Reader::from_reader(file))
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Accepted timestamp formats, tried in order. Date-only values parse to
/// midnight.
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parses a delivery-time cell into a `NaiveDateTime`.
pub fn parse_delivery_time(value: &str) -> Option<NaiveDateTime> {
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Maps a raw table into normalized records plus the rows that were rejected.
///
/// # Errors
///
/// Returns [`IngestError::MissingColumns`] when any required mapped column is
/// absent from the table header; no partial dataset is produced in that case.
pub fn normalize(
    table: &RawTable,
    map: &ColumnMap,
) -> Result<(Vec<DeliveryRecord>, Vec<RowRejection>), IngestError> {
    let mut missing = Vec::new();
    let mut resolve = |source: &str| match table.column_index(source) {
        Some(idx) => idx,
        None => {
            missing.push(source.to_string());
            0
        }
    };
    let city_idx = resolve(&map.city);
    let time_idx = resolve(&map.delivery_time);
    let operator_idx = resolve(&map.operator);
    let order_idx = resolve(&map.order_id);
    let lead_idx = resolve(&map.lead_time_days);
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns { missing });
    }

    // A mapped VIN column that the extract doesn't carry is not an error;
    // the field is optional.
    let vin_idx = map.vin.as_deref().and_then(|name| table.column_index(name));

    let mut records = Vec::with_capacity(table.rows.len());
    let mut rejections = Vec::new();

    'rows: for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 1;
        let cell = |idx: usize| row.get(idx).map(|v| v.trim()).unwrap_or("");

        for (logical, idx) in [
            ("city", city_idx),
            ("delivery_time", time_idx),
            ("operator", operator_idx),
            ("order_id", order_idx),
            ("lead_time_days", lead_idx),
        ] {
            if cell(idx).is_empty() {
                rejections.push(RowRejection {
                    row: row_no,
                    reason: RejectReason::MissingField(logical.to_string()),
                });
                continue 'rows;
            }
        }

        let time_cell = cell(time_idx);
        let Some(delivery_time) = parse_delivery_time(time_cell) else {
            rejections.push(RowRejection {
                row: row_no,
                reason: RejectReason::BadTimestamp(time_cell.to_string()),
            });
            continue;
        };

        let lead_cell = cell(lead_idx);
        let Ok(lead_time_days) = lead_cell.parse::<f64>() else {
            rejections.push(RowRejection {
                row: row_no,
                reason: RejectReason::BadLeadTime(lead_cell.to_string()),
            });
            continue;
        };

        let vin = vin_idx
            .map(|idx| cell(idx))
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        records.push(DeliveryRecord::new(
            cell(city_idx).to_string(),
            delivery_time,
            cell(operator_idx).to_string(),
            cell(order_idx).to_string(),
            vin,
            lead_time_days,
        ));
    }

    debug!(
        accepted = records.len(),
        rejected = rejections.len(),
        "Normalization finished"
    );

    Ok((records, rejections))
}
