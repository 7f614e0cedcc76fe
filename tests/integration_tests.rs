use delivery_perf::ingest::{ColumnMap, RawTable};
use delivery_perf::metrics::TimeGrain;
use delivery_perf::query::{Filter, Session};
use delivery_perf::report::PerformanceReport;

fn fixture_table() -> RawTable {
    let bytes: &[u8] = include_bytes!("fixtures/deliveries.csv");
    RawTable::from_csv_reader(csv::Reader::from_reader(bytes)).expect("Failed to read fixture")
}

#[test]
fn test_full_pipeline() {
    let mut session = Session::new();
    let summary = session
        .ingest(&fixture_table(), &ColumnMap::default())
        .expect("Failed to ingest fixture");

    // One row in the fixture carries an unparseable delivery time.
    assert_eq!(summary.accepted, 6);
    assert_eq!(summary.rejected, 1);

    let dataset = session.dataset().unwrap();
    assert_eq!(dataset.cities(), vec!["CityA", "CityB"]);
    assert_eq!(dataset.months_for_city("CityA"), vec!["2024-01", "2024-02"]);
    assert_eq!(dataset.months_for_city("CityB"), vec!["2024-02"]);
    assert_eq!(dataset.operators_for("CityA", "2024-01"), vec!["OpX", "OpY"]);

    let subset = dataset.filter(&Filter {
        city: Some("CityA".into()),
        month: Some("2024-01".into()),
        ..Default::default()
    });
    let report = PerformanceReport::build(&subset, 1, TimeGrain::Day);

    assert_eq!(report.record_count, 3);
    assert_eq!(report.avg_lead_time_days, Some(4.0));
    assert_eq!(report.slowest.len(), 1);
    assert_eq!(report.slowest[0].order_id, "O3");

    let jan6 = &report.contribution["2024-01-06"];
    assert_eq!(jan6.len(), 2);
    assert!((jan6[0].percentage - 50.0).abs() < 1e-6);
    assert!((jan6[1].percentage - 50.0).abs() < 1e-6);

    assert_eq!(report.volume_trend["2024-01-05"], 1);
    assert_eq!(report.volume_trend["2024-01-06"], 2);
}

#[test]
fn test_reingestion_replaces_dataset() {
    let mut session = Session::new();
    session
        .ingest(&fixture_table(), &ColumnMap::default())
        .unwrap();

    let replacement = RawTable {
        headers: ["交付城市", "交付时间", "交付A岗", "订单ID", "PDI OK→交付"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rows: vec![vec![
            "CityZ".to_string(),
            "2025-06-01 08:00:00".to_string(),
            "OpNew".to_string(),
            "N1".to_string(),
            "9.0".to_string(),
        ]],
    };
    session.ingest(&replacement, &ColumnMap::default()).unwrap();

    let dataset = session.dataset().unwrap();
    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.cities(), vec!["CityZ"]);
    // Nothing from the first extract survives the replacement.
    assert!(
        dataset
            .filter(&Filter {
                city: Some("CityA".into()),
                ..Default::default()
            })
            .is_empty()
    );
}
