//! Aggregate metrics over an already-filtered record subset.
//!
//! Filtering is the query layer's job; every operation here is read-only
//! over the borrowed slice it is given. Empty subsets and absent grouping
//! keys yield empty results, never errors.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::record::DeliveryRecord;

/// Temporal grouping granularity for trend and contribution queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeGrain {
    Day,
    Week,
    Month,
}

impl TimeGrain {
    /// The sortable group key for a record at this grain. Weeks are
    /// zero-padded so lexicographic order matches numeric week order.
    pub fn key_for(&self, record: &DeliveryRecord) -> String {
        match self {
            TimeGrain::Day => record.calendar_date.to_string(),
            TimeGrain::Week => format!("W{:02}", record.iso_week),
            TimeGrain::Month => record.month_key.clone(),
        }
    }
}

/// Per-operator average lead time, one ranking row.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorAvg {
    pub operator: String,
    pub avg_lead_time_days: f64,
}

/// One operator's slice of a temporal group's deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorShare {
    pub operator: String,
    pub count: usize,
    pub percentage: f64,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Arithmetic mean of `lead_time_days` over the subset, `None` when empty.
pub fn avg_lead_time(records: &[&DeliveryRecord]) -> Option<f64> {
    mean(records.iter().map(|r| r.lead_time_days))
}

/// Average lead time per operator, sorted ascending by average so the
/// fastest operator comes first. Equal averages order by operator name.
pub fn avg_by_operator(records: &[&DeliveryRecord]) -> Vec<OperatorAvg> {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for r in records {
        let entry = sums.entry(r.operator.as_str()).or_insert((0.0, 0));
        entry.0 += r.lead_time_days;
        entry.1 += 1;
    }

    let mut out: Vec<OperatorAvg> = sums
        .into_iter()
        .map(|(operator, (sum, count))| OperatorAvg {
            operator: operator.to_string(),
            avg_lead_time_days: sum / count as f64,
        })
        .collect();

    out.sort_by(|a, b| {
        a.avg_lead_time_days
            .total_cmp(&b.avg_lead_time_days)
            .then_with(|| a.operator.cmp(&b.operator))
    });
    out
}

/// The `n` slowest deliveries, descending by lead time. The sort is stable,
/// so ties keep their ingestion order and re-runs on identical input return
/// identical output. `n` is clamped to `[1, len]` instead of erroring.
pub fn slowest<'a>(records: &[&'a DeliveryRecord], n: usize) -> Vec<&'a DeliveryRecord> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<&DeliveryRecord> = records.to_vec();
    ranked.sort_by(|a, b| b.lead_time_days.total_cmp(&a.lead_time_days));
    ranked.truncate(n.clamp(1, records.len()));
    ranked
}

/// Per-operator contribution shares within each temporal group.
///
/// Groups the subset by the chosen grain, then computes each operator's
/// share of the group's deliveries as a percentage. Shares within a group
/// sum to 100 (within floating-point tolerance) and sort descending by
/// percentage; groups with no deliveries are simply not present.
pub fn contribution(
    records: &[&DeliveryRecord],
    grain: TimeGrain,
) -> BTreeMap<String, Vec<OperatorShare>> {
    let mut counts: BTreeMap<String, HashMap<&str, usize>> = BTreeMap::new();
    for r in records {
        *counts
            .entry(grain.key_for(r))
            .or_default()
            .entry(r.operator.as_str())
            .or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(key, per_operator)| {
            let total: usize = per_operator.values().sum();

            let mut shares: Vec<OperatorShare> = per_operator
                .into_iter()
                .map(|(operator, count)| OperatorShare {
                    operator: operator.to_string(),
                    count,
                    percentage: count as f64 / total as f64 * 100.0,
                })
                .collect();

            shares.sort_by(|a, b| {
                b.percentage
                    .total_cmp(&a.percentage)
                    .then_with(|| a.operator.cmp(&b.operator))
            });

            (key, shares)
        })
        .collect()
}

/// Delivery counts per temporal bucket, for the volume trend view.
pub fn volume_trend(records: &[&DeliveryRecord], grain: TimeGrain) -> BTreeMap<String, usize> {
    let mut buckets = BTreeMap::new();
    for r in records {
        *buckets.entry(grain.key_for(r)).or_insert(0) += 1;
    }
    buckets
}
