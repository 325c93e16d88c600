//! End-to-end loads through the public API

use chrono::NaiveDate;
use gazpar::sources::{ExcelFileDataSource, JsonFileDataSource, TestDataSource};
use gazpar::{Client, Frequency, GazparError};
use std::path::PathBuf;

const PCE: &str = "0123456789";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ========== JSON files ==========

#[test]
fn test_json_files_every_frequency() {
    let source = JsonFileDataSource::new(
        fixture("donnees_informatives.json"),
        Some(fixture("temperatures.json")),
    );
    let mut client = Client::new(Box::new(source));

    let data = client
        .load_date_range(PCE, ymd(2019, 7, 1), ymd(2019, 7, 14), None)
        .unwrap();

    let keys: Vec<_> = data.keys().copied().collect();
    assert_eq!(keys, Frequency::ALL.to_vec());
    assert!(data[&Frequency::Hourly].is_empty());

    let daily = &data[&Frequency::Daily];
    let weekly = &data[&Frequency::Weekly];
    assert_eq!(daily.len(), 14);
    assert_eq!(weekly.len(), 2);

    // both weeks cover 7 readings, totals match the daily energies
    let daily_total: f64 = daily.iter().filter_map(|r| r.energy).sum();
    let weekly_total: f64 = weekly.iter().filter_map(|r| r.energy).sum();
    assert!((daily_total - weekly_total).abs() < 1e-9);

    assert_eq!(weekly[0].start_index, daily[0].start_index);
    assert_eq!(weekly[1].end_index, daily[13].end_index);

    assert_eq!(data[&Frequency::Monthly][0].time_period, "Juillet 2019");
    assert_eq!(data[&Frequency::Yearly][0].time_period, "2019");
}

#[test]
fn test_json_output_shape() {
    let source = JsonFileDataSource::new(fixture("donnees_informatives.json"), None);
    let mut client = Client::new(Box::new(source));

    let data = client
        .load_date_range(
            PCE,
            ymd(2019, 7, 1),
            ymd(2019, 7, 14),
            Some(&[Frequency::Daily, Frequency::Daily]),
        )
        .unwrap();

    let value = serde_json::to_value(&data).unwrap();
    let first = &value["daily"][0];
    assert_eq!(first["time_period"], "01/07/2019");
    assert_eq!(first["energy"], 33.0);
    assert_eq!(first["type"], "Mesuré");
    assert!(first["timestamp"].is_string());
    // 03/07 has no temperature and no weather file was given
    assert!(value["daily"][2].get("temperature").is_none());
}

// ========== Excel files ==========

#[test]
fn test_excel_file_daily_and_yearly() {
    let source = ExcelFileDataSource::new(fixture("Donnees_informatives_daily.xlsx"));
    let mut client = Client::new(Box::new(source));

    let data = client
        .load_date_range(
            PCE,
            ymd(2019, 7, 1),
            ymd(2019, 7, 10),
            Some(&[Frequency::Daily, Frequency::Yearly]),
        )
        .unwrap();

    assert_eq!(data[&Frequency::Daily].len(), 10);
    let yearly = &data[&Frequency::Yearly];
    assert_eq!(yearly.len(), 1);
    assert_eq!(yearly[0].energy, Some(331.0));
}

#[test]
fn test_excel_file_has_no_meter_list() {
    let source = ExcelFileDataSource::new(fixture("Donnees_informatives_daily.xlsx"));
    let mut client = Client::new(Box::new(source));

    assert!(matches!(
        client.get_pce_identifiers(),
        Err(GazparError::Unsupported(_))
    ));
}

// ========== Sample data ==========

#[test]
fn test_sample_source_since() {
    let mut client = Client::new(Box::new(TestDataSource::new()));

    let data = client
        .load_since(PCE, 30, Some(&[Frequency::Monthly, Frequency::Hourly]))
        .unwrap();

    assert_eq!(data.len(), 2);
    assert!(data[&Frequency::Hourly].is_empty());
    assert_eq!(data[&Frequency::Monthly].len(), 3);
}
