pub mod error;
pub mod ingest;
pub mod metrics;
pub mod query;
pub mod record;
pub mod report;
