//! The normalized delivery record and its derived temporal keys.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// One normalized row of delivery data.
///
/// The temporal keys (`month_key`, `iso_week`, `calendar_date`) are derived
/// from `delivery_time` once at construction; records are immutable after
/// ingestion, so they are never recomputed.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRecord {
    pub city: String,
    pub delivery_time: NaiveDateTime,
    pub operator: String,
    pub order_id: String,
    pub vin: Option<String>,
    /// PDI-to-delivery interval in days. Source data is sometimes
    /// inconsistent; zero and negative values pass through untouched.
    pub lead_time_days: f64,

    pub month_key: String,
    pub iso_week: u32,
    pub calendar_date: NaiveDate,
}

impl DeliveryRecord {
    pub fn new(
        city: String,
        delivery_time: NaiveDateTime,
        operator: String,
        order_id: String,
        vin: Option<String>,
        lead_time_days: f64,
    ) -> Self {
        DeliveryRecord {
            month_key: month_key(delivery_time),
            iso_week: iso_week(delivery_time),
            calendar_date: delivery_time.date(),
            city,
            delivery_time,
            operator,
            order_id,
            vin,
            lead_time_days,
        }
    }
}

/// Formats the year-month grouping key as `YYYY-MM`.
pub fn month_key(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m").to_string()
}

/// ISO-8601 week number (1–53, Monday start, week 1 contains the year's
/// first Thursday). Grouping and the week selector depend on this matching
/// the standard ISO calendar exactly.
pub fn iso_week(ts: NaiveDateTime) -> u32 {
    ts.date().iso_week().week()
}
