//! Serializable report bundles handed to the presentation layer.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::metrics::{self, OperatorAvg, OperatorShare, TimeGrain};
use crate::record::DeliveryRecord;

/// One row of the slowest-deliveries ranking, owned so it can outlive the
/// filtered subset it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct SlowestEntry {
    pub order_id: String,
    pub delivery_time: NaiveDateTime,
    pub operator: String,
    pub lead_time_days: f64,
}

impl From<&DeliveryRecord> for SlowestEntry {
    fn from(r: &DeliveryRecord) -> Self {
        SlowestEntry {
            order_id: r.order_id.clone(),
            delivery_time: r.delivery_time,
            operator: r.operator.clone(),
            lead_time_days: r.lead_time_days,
        }
    }
}

/// All metrics for one filter context, composed in a single pass so the
/// presentation layer renders from one structure.
#[derive(Debug, Serialize)]
pub struct PerformanceReport {
    pub record_count: usize,
    /// `None` when the filter matched no records.
    pub avg_lead_time_days: Option<f64>,
    pub avg_by_operator: Vec<OperatorAvg>,
    pub slowest: Vec<SlowestEntry>,
    pub volume_trend: BTreeMap<String, usize>,
    pub contribution: BTreeMap<String, Vec<OperatorShare>>,
}

impl PerformanceReport {
    pub fn build(subset: &[&DeliveryRecord], slowest_n: usize, grain: TimeGrain) -> Self {
        PerformanceReport {
            record_count: subset.len(),
            avg_lead_time_days: metrics::avg_lead_time(subset),
            avg_by_operator: metrics::avg_by_operator(subset),
            slowest: metrics::slowest(subset, slowest_n)
                .into_iter()
                .map(SlowestEntry::from)
                .collect(),
            volume_trend: metrics::volume_trend(subset, grain),
            contribution: metrics::contribution(subset, grain),
        }
    }
}

/// The dependent selector option lists for the presentation layer.
#[derive(Debug, Serialize)]
pub struct SelectorOptions {
    pub cities: Vec<String>,
    /// Months available for the chosen city; empty when no city is chosen.
    pub months: Vec<String>,
    /// Operators active in the chosen city and month.
    pub operators: Vec<String>,
}

/// Prints any report structure as pretty JSON on stdout.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
