//! Filtered views over the normalized dataset, and the session that owns it.
//!
//! A [`Session`] holds at most one immutable [`Dataset`] at a time. Ingestion
//! is atomic: a failed re-ingestion leaves the previous dataset untouched,
//! and a successful one fully replaces it. Sessions are plain owned values,
//! so a concurrent host gives each of its sessions an independent instance
//! rather than sharing one.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{IngestError, RowRejection};
use crate::ingest::{ColumnMap, RawTable, normalize};
use crate::record::DeliveryRecord;

/// What happened during one ingestion: dataset size and the rejected rows.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub rejections: Vec<RowRejection>,
}

/// Conjunctive record filter; unset fields pass everything through.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub city: Option<String>,
    pub month: Option<String>,
    pub operator: Option<String>,
}

impl Filter {
    fn matches(&self, record: &DeliveryRecord) -> bool {
        self.city.as_deref().is_none_or(|c| record.city == c)
            && self.month.as_deref().is_none_or(|m| record.month_key == m)
            && self
                .operator
                .as_deref()
                .is_none_or(|o| record.operator == o)
    }
}

/// The immutable normalized dataset for one ingested extract.
#[derive(Debug)]
pub struct Dataset {
    records: Vec<DeliveryRecord>,
    summary: IngestSummary,
}

impl Dataset {
    pub fn records(&self) -> &[DeliveryRecord] {
        &self.records
    }

    pub fn summary(&self) -> &IngestSummary {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Applies a conjunctive filter, preserving ingestion order. A filter
    /// combination matching nothing yields an empty subset, not an error.
    pub fn filter(&self, filter: &Filter) -> Vec<&DeliveryRecord> {
        self.records.iter().filter(|r| filter.matches(r)).collect()
    }

    /// Distinct cities across the whole dataset, first-seen order.
    pub fn cities(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.city.as_str()))
    }

    /// Distinct month keys among the selected city's records, first-seen
    /// order. Month options always depend on the chosen city, so callers
    /// never offer a month the city has no deliveries in.
    pub fn months_for_city(&self, city: &str) -> Vec<String> {
        distinct(
            self.records
                .iter()
                .filter(|r| r.city == city)
                .map(|r| r.month_key.as_str()),
        )
    }

    /// Distinct operators active in the selected city and month.
    pub fn operators_for(&self, city: &str, month: &str) -> Vec<String> {
        distinct(
            self.records
                .iter()
                .filter(|r| r.city == city && r.month_key == month)
                .map(|r| r.operator.as_str()),
        )
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        if !out.iter().any(|seen| seen == v) {
            out.push(v.to_string());
        }
    }
    out
}

/// Owns the current dataset for one analysis session.
#[derive(Debug, Default)]
pub struct Session {
    dataset: Option<Dataset>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Normalizes a raw extract and installs it as the session's dataset.
    ///
    /// The previous dataset is replaced only after normalization succeeds;
    /// a fatal schema error leaves it exactly as it was.
    pub fn ingest(
        &mut self,
        table: &RawTable,
        map: &ColumnMap,
    ) -> Result<IngestSummary, IngestError> {
        let (records, rejections) = normalize(table, map)?;

        let summary = IngestSummary {
            accepted: records.len(),
            rejected: rejections.len(),
            rejections,
        };

        if summary.rejected > 0 {
            warn!(
                accepted = summary.accepted,
                rejected = summary.rejected,
                "Ingestion finished with rejected rows"
            );
        } else {
            info!(accepted = summary.accepted, "Ingestion finished");
        }

        self.dataset = Some(Dataset {
            records,
            summary: summary.clone(),
        });
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> ColumnMap {
        ColumnMap {
            city: "city".into(),
            delivery_time: "time".into(),
            operator: "op".into(),
            order_id: "order".into(),
            lead_time_days: "lead".into(),
            vin: None,
        }
    }

    fn table(rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: ["city", "time", "op", "order", "lead"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    fn session_with(rows: &[&[&str]]) -> Session {
        let mut session = Session::new();
        session.ingest(&table(rows), &map()).unwrap();
        session
    }

    const SAMPLE: &[&[&str]] = &[
        &["CityA", "2024-01-05 09:00:00", "OpX", "O1", "2.0"],
        &["CityA", "2024-01-06 09:00:00", "OpY", "O2", "4.0"],
        &["CityA", "2024-02-01 09:00:00", "OpX", "O3", "6.0"],
        &["CityB", "2024-03-01 09:00:00", "OpZ", "O4", "1.0"],
    ];

    #[test]
    fn test_filters_are_conjunctive() {
        let session = session_with(SAMPLE);
        let ds = session.dataset().unwrap();

        let all = ds.filter(&Filter::default());
        assert_eq!(all.len(), 4);

        let city_a = ds.filter(&Filter {
            city: Some("CityA".into()),
            ..Default::default()
        });
        assert_eq!(city_a.len(), 3);

        let city_a_jan = ds.filter(&Filter {
            city: Some("CityA".into()),
            month: Some("2024-01".into()),
            ..Default::default()
        });
        assert_eq!(city_a_jan.len(), 2);

        let city_a_jan_opy = ds.filter(&Filter {
            city: Some("CityA".into()),
            month: Some("2024-01".into()),
            operator: Some("OpY".into()),
        });
        assert_eq!(city_a_jan_opy.len(), 1);
        assert_eq!(city_a_jan_opy[0].order_id, "O2");
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let session = session_with(SAMPLE);
        let ds = session.dataset().unwrap();
        let subset = ds.filter(&Filter {
            city: Some("CityB".into()),
            month: Some("2024-01".into()),
            ..Default::default()
        });
        assert!(subset.is_empty());
    }

    #[test]
    fn test_dependent_month_options() {
        let session = session_with(SAMPLE);
        let ds = session.dataset().unwrap();

        assert_eq!(ds.cities(), vec!["CityA", "CityB"]);
        assert_eq!(ds.months_for_city("CityA"), vec!["2024-01", "2024-02"]);
        assert_eq!(ds.months_for_city("CityB"), vec!["2024-03"]);
        assert!(ds.months_for_city("CityC").is_empty());
    }

    #[test]
    fn test_operator_options_for_city_and_month() {
        let session = session_with(SAMPLE);
        let ds = session.dataset().unwrap();
        assert_eq!(ds.operators_for("CityA", "2024-01"), vec!["OpX", "OpY"]);
        assert_eq!(ds.operators_for("CityA", "2024-02"), vec!["OpX"]);
        assert!(ds.operators_for("CityB", "2024-01").is_empty());
    }

    #[test]
    fn test_reingest_fully_replaces_dataset() {
        let mut session = session_with(SAMPLE);

        let replacement: &[&[&str]] = &[&["CityC", "2025-07-01 12:00:00", "OpQ", "N1", "3.0"]];
        session.ingest(&table(replacement), &map()).unwrap();

        let ds = session.dataset().unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.cities(), vec!["CityC"]);
        assert!(ds.filter(&Filter {
            city: Some("CityA".into()),
            ..Default::default()
        })
        .is_empty());
    }

    #[test]
    fn test_failed_reingest_keeps_previous_dataset() {
        let mut session = session_with(SAMPLE);

        // A table with the wrong header entirely is a fatal schema error.
        let broken = RawTable {
            headers: vec!["foo".into(), "bar".into()],
            rows: vec![vec!["x".into(), "y".into()]],
        };
        let err = session.ingest(&broken, &map()).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumns { .. }));

        let ds = session.dataset().unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.cities(), vec!["CityA", "CityB"]);
    }

    #[test]
    fn test_summary_counts_rejections() {
        let rows: &[&[&str]] = &[
            &["CityA", "2024-01-05 09:00:00", "OpX", "O1", "2.0"],
            &["CityA", "bogus", "OpX", "O2", "2.0"],
        ];
        let mut session = Session::new();
        let summary = session.ingest(&table(rows), &map()).unwrap();
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.rejections[0].row, 2);
        assert_eq!(session.dataset().unwrap().summary().rejected, 1);
    }
}
