//! Behavior-driven tests for the warehouse
//!
//! These tests verify what the store guarantees to callers: registry stability,
//! write modes, gap-fill arithmetic and the maintenance rebuild.

use bourse_warehouse::{
    CompanySeed, DailyBar, Granularity, IntradaySample, NewCompany, SeriesQuery, Sink, TimeRange,
    Venue, Warehouse, WarehouseConfig, WarehouseError, WriteMode,
};
use tempfile::{tempdir, TempDir};
use time::macros::{date, datetime};

fn open() -> (TempDir, Warehouse) {
    let temp = tempdir().expect("tempdir");
    let warehouse = Warehouse::open(WarehouseConfig {
        bourse_home: temp.path().to_path_buf(),
        db_path: temp.path().join("warehouse.duckdb"),
        max_pool_size: 2,
    })
    .expect("warehouse open");
    (temp, warehouse)
}

fn register(warehouse: &Warehouse, venue: Venue, symbols: &[&str]) -> Vec<i64> {
    let companies: Vec<NewCompany> = symbols
        .iter()
        .map(|symbol| NewCompany {
            symbol: symbol.to_string(),
            isin: None,
        })
        .collect();
    let sync = warehouse.sync_companies(venue, &companies).expect("sync");
    symbols
        .iter()
        .map(|symbol| sync.ids.resolve(symbol).expect("registered"))
        .collect()
}

fn sample(ts: time::PrimitiveDateTime, cid: i64, value: f64) -> IntradaySample {
    IntradaySample {
        ts,
        cid,
        value,
        volume: Some(1.0),
    }
}

// =============================================================================
// Warehouse: registry
// =============================================================================

#[test]
fn when_a_symbol_is_synced_from_both_venues_then_it_keeps_its_first_id() {
    let (_temp, warehouse) = open();

    let first = register(&warehouse, Venue::Euronext, &["ABC", "DEF"]);
    let again = register(&warehouse, Venue::Boursorama, &["DEF", "ABC", "GHI"]);

    assert_eq!(first, vec![1, 2]);
    assert_eq!(again, vec![2, 1, 3]);
    assert_eq!(warehouse.counts().expect("counts").companies, 3);
}

#[test]
fn when_the_registry_is_rebuilt_then_series_ledger_and_ids_start_over() {
    // Given: a populated store
    let (_temp, warehouse) = open();
    let ids = register(&warehouse, Venue::Boursorama, &["OLD", "ABC"]);
    warehouse
        .load_intraday(&[sample(datetime!(2024-01-02 10:00), ids[1], 5.0)], WriteMode::ReplaceKeys)
        .expect("load");
    warehouse
        .record_files(&[String::from("boursorama/2024/a.json")])
        .expect("ledger");

    // When: the registry is rebuilt from seeds
    let seeds = vec![
        CompanySeed {
            name: String::from("Abc Corp"),
            symbol: String::from("ABC"),
            isin: Some(String::from("FR0000000001")),
            euronext: Some(String::from("ABC")),
            boursorama: Some(String::from("1rPABC")),
        },
        CompanySeed {
            name: String::from("Def Corp"),
            symbol: String::from("DEF"),
            isin: None,
            euronext: None,
            boursorama: None,
        },
    ];
    let report = warehouse.rebuild_registry(&seeds).expect("rebuild");

    // Then: dependents are emptied and seeds get ids from 1
    assert_eq!(report.intraday_removed, 1);
    assert_eq!(report.files_forgotten, 1);
    assert_eq!(report.companies_removed, 2);
    assert_eq!(report.companies_loaded, 2);

    let ids = warehouse.company_ids().expect("ids");
    assert_eq!(ids.resolve("ABC"), Some(1));
    assert_eq!(ids.resolve("DEF"), Some(2));
    assert_eq!(ids.resolve("OLD"), None);
    assert!(warehouse.files_done().expect("ledger").is_empty());
}

#[test]
fn when_rebuild_seeds_repeat_a_symbol_then_nothing_is_touched() {
    let (_temp, warehouse) = open();
    register(&warehouse, Venue::Euronext, &["KEEP"]);
    let seed = CompanySeed {
        name: String::from("Twice"),
        symbol: String::from("TWO"),
        isin: None,
        euronext: None,
        boursorama: None,
    };

    let result = warehouse.rebuild_registry(&[seed.clone(), seed]);

    assert!(matches!(result, Err(WarehouseError::QueryRejected(_))));
    assert_eq!(warehouse.counts().expect("counts").companies, 1);
}

// =============================================================================
// Warehouse: write modes and range deletion
// =============================================================================

#[test]
fn when_the_same_samples_are_loaded_twice_then_only_append_only_duplicates() {
    let (_temp, warehouse) = open();
    let cid = register(&warehouse, Venue::Boursorama, &["ABC"])[0];
    let rows = vec![
        sample(datetime!(2024-01-02 09:00), cid, 1.0),
        sample(datetime!(2024-01-02 10:00), cid, 2.0),
    ];

    warehouse.load_intraday(&rows, WriteMode::ReplaceKeys).expect("load");
    warehouse.load_intraday(&rows, WriteMode::ReplaceKeys).expect("reload");
    assert_eq!(warehouse.counts().expect("counts").intraday_samples, 2);

    warehouse.load_intraday(&rows, WriteMode::AppendOnly).expect("append");
    assert_eq!(warehouse.counts().expect("counts").intraday_samples, 4);
}

#[test]
fn when_a_range_is_deleted_then_its_end_bound_survives() {
    let (_temp, warehouse) = open();
    let cid = register(&warehouse, Venue::Boursorama, &["ABC"])[0];
    warehouse
        .load_intraday(
            &[
                sample(datetime!(2024-01-02 00:00), cid, 1.0),
                sample(datetime!(2024-01-02 23:59:59), cid, 2.0),
                sample(datetime!(2024-01-03 00:00), cid, 3.0),
            ],
            WriteMode::AppendOnly,
        )
        .expect("load");

    let removed = warehouse
        .delete_range(
            Sink::Intraday,
            TimeRange {
                start: datetime!(2024-01-02 00:00),
                end: datetime!(2024-01-03 00:00),
            },
        )
        .expect("delete");

    assert_eq!(removed, 2);
    assert_eq!(warehouse.counts().expect("counts").intraday_samples, 1);
}

// =============================================================================
// Warehouse: gap-fill
// =============================================================================

#[test]
fn when_a_day_has_one_sample_then_the_synthesized_std_is_null() {
    let (_temp, warehouse) = open();
    let cid = register(&warehouse, Venue::Boursorama, &["ONE"])[0];
    warehouse
        .load_intraday(&[sample(datetime!(2024-01-02 12:00), cid, 7.5)], WriteMode::ReplaceKeys)
        .expect("load");

    let report = warehouse
        .fill_daily_gaps(date!(2024-01-02), date!(2024-01-02))
        .expect("gap fill");
    assert_eq!(report.filled, 1);

    let points = warehouse
        .series(&SeriesQuery {
            symbols: Vec::new(),
            start: datetime!(2024-01-02 00:00),
            end: datetime!(2024-01-03 00:00),
            granularity: Granularity::Daily,
        })
        .expect("series");
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].open, Some(7.5));
    assert_eq!(points[0].close, 7.5);
    assert_eq!(points[0].mean, Some(7.5));
    assert_eq!(points[0].std, None);
}

#[test]
fn when_a_daily_bar_exists_then_gap_fill_leaves_it_alone() {
    let (_temp, warehouse) = open();
    let cid = register(&warehouse, Venue::Euronext, &["ABC"])[0];
    warehouse
        .load_daily(
            &[DailyBar::from_prices(date!(2024-01-02), cid, 1.0, 3.0, 1.0, 2.0, Some(5.0))],
            WriteMode::ReplaceKeys,
        )
        .expect("daily");
    warehouse
        .load_intraday(
            &[
                sample(datetime!(2024-01-02 10:00), cid, 100.0),
                sample(datetime!(2024-01-02 11:00), cid, 101.0),
            ],
            WriteMode::ReplaceKeys,
        )
        .expect("intraday");

    let first = warehouse
        .fill_daily_gaps(date!(2024-01-01), date!(2024-01-05))
        .expect("gap fill");
    let second = warehouse
        .fill_daily_gaps(date!(2024-01-01), date!(2024-01-05))
        .expect("gap fill again");

    assert_eq!(first.business_days, 5);
    assert_eq!(first.filled, 0);
    assert_eq!(second.filled, 0);
    assert_eq!(warehouse.counts().expect("counts").daily_bars, 1);
}

#[test]
fn when_weekend_samples_exist_then_no_bar_is_synthesized_for_them() {
    let (_temp, warehouse) = open();
    let cid = register(&warehouse, Venue::Boursorama, &["ABC"])[0];
    warehouse
        .load_intraday(&[sample(datetime!(2024-01-06 10:00), cid, 1.0)], WriteMode::ReplaceKeys)
        .expect("load");

    let report = warehouse
        .fill_daily_gaps(date!(2024-01-06), date!(2024-01-07))
        .expect("gap fill");

    assert_eq!(report.business_days, 0);
    assert_eq!(report.filled, 0);
}

// =============================================================================
// Warehouse: series queries
// =============================================================================

#[test]
fn when_no_symbol_is_given_then_every_company_is_returned_in_order() {
    let (_temp, warehouse) = open();
    let ids = register(&warehouse, Venue::Boursorama, &["ZED", "ALP"]);
    warehouse
        .load_intraday(
            &[
                sample(datetime!(2024-01-02 11:00), ids[0], 3.0),
                sample(datetime!(2024-01-02 10:00), ids[0], 2.0),
                sample(datetime!(2024-01-02 09:00), ids[1], 1.0),
            ],
            WriteMode::ReplaceKeys,
        )
        .expect("load");

    let points = warehouse
        .series(&SeriesQuery {
            symbols: Vec::new(),
            start: datetime!(2024-01-02 00:00),
            end: datetime!(2024-01-03 00:00),
            granularity: Granularity::Intraday,
        })
        .expect("series");

    let order: Vec<(&str, f64)> = points
        .iter()
        .map(|point| (point.symbol.as_str(), point.close))
        .collect();
    assert_eq!(order, vec![("ALP", 1.0), ("ZED", 2.0), ("ZED", 3.0)]);
    assert!(points.iter().all(|point| point.open.is_none()));
}

#[test]
fn when_the_series_range_is_empty_then_the_query_is_rejected() {
    let (_temp, warehouse) = open();
    let result = warehouse.series(&SeriesQuery {
        symbols: vec![String::from("ABC")],
        start: datetime!(2024-01-02 00:00),
        end: datetime!(2024-01-02 00:00),
        granularity: Granularity::Daily,
    });
    assert!(matches!(result, Err(WarehouseError::QueryRejected(_))));
}
