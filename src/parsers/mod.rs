//! Parsers turning GrDF source documents into daily meter readings

mod excel;
mod json;

pub use excel::{ExcelParser, FIRST_DATA_ROW};
pub use json::{ConsumptionPayload, JsonParser, PceConsumption, Releve, WeatherPayload};

use chrono::{Local, NaiveDateTime};

/// Date format used by the GrDF API (`journeeGaziere`, weather keys)
pub const SOURCE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Capture time stamped on every row produced by one parse call
pub fn capture_timestamp() -> NaiveDateTime {
    Local::now().naive_local()
}
