//! Data sources producing meter readings for a date range
//!
//! Every source yields daily readings one way or another (spreadsheet, JSON
//! payload, canned samples) and answers the coarser frequencies either from
//! the source itself or through the [`Aggregator`].

mod excel;
mod fixture;
mod json;

pub use excel::{ExcelFileDataSource, ExcelWebDataSource, DATA_FILENAME_PATTERN};
pub use fixture::TestDataSource;
pub use json::{weather_window, JsonFileDataSource, JsonWebDataSource};

use crate::services::Aggregator;
use crate::types::{Frequency, MeterReading, MeterReadingsByFrequency, Result};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Identifier reported by sources that are not bound to a GrDF account
pub const SAMPLE_PCE_IDENTIFIER: &str = "0123456789";

/// Capabilities shared by every data source
pub trait DataSource {
    /// Source name (e.g., "json-web")
    fn name(&self) -> &str;

    /// Open a session with the remote service, if any
    fn login(&mut self) -> Result<()> {
        Ok(())
    }

    /// Close the session with the remote service, if any
    fn logout(&mut self) {}

    /// Metering points available through this source
    fn get_pce_identifiers(&mut self) -> Result<Vec<String>>;

    /// Readings of `pce_identifier` between two dates for each requested
    /// frequency (all frequencies when `None`, duplicates ignored)
    fn load(
        &mut self,
        pce_identifier: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        frequencies: Option<&[Frequency]>,
    ) -> Result<MeterReadingsByFrequency>;
}

/// Derive every requested frequency from one daily sequence
fn derive_from_daily(
    daily: &[MeterReading],
    frequencies: &BTreeSet<Frequency>,
) -> Result<MeterReadingsByFrequency> {
    frequencies
        .iter()
        .map(|&frequency| Ok((frequency, Aggregator::convert(daily, frequency)?)))
        .collect()
}

/// Empty sequence for every requested frequency
fn empty_result(frequencies: &BTreeSet<Frequency>) -> MeterReadingsByFrequency {
    frequencies.iter().map(|&f| (f, Vec::new())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn day(d: u32, energy: f64) -> MeterReading {
        let ts = NaiveDateTime::parse_from_str("2019-07-10 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let mut r = MeterReading::new(format!("{:02}/07/2019", d), ts);
        r.energy = Some(energy);
        r
    }

    #[test]
    fn test_derive_from_daily_covers_requested_only() {
        let daily = vec![day(1, 40.0), day(2, 31.0), day(3, 33.0)];
        let frequencies = Frequency::resolve(Some(&[Frequency::Weekly, Frequency::Weekly]));

        let result = derive_from_daily(&daily, &frequencies).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[&Frequency::Weekly][0].energy, Some(104.0));
    }

    #[test]
    fn test_derive_from_daily_all() {
        let daily = vec![day(1, 40.0)];
        let result = derive_from_daily(&daily, &Frequency::resolve(None)).unwrap();

        assert_eq!(result.len(), 5);
        assert!(result[&Frequency::Hourly].is_empty());
        assert_eq!(result[&Frequency::Daily], daily);
        assert_eq!(result[&Frequency::Yearly][0].time_period, "2019");
    }

    #[test]
    fn test_empty_result() {
        let result = empty_result(&Frequency::resolve(Some(&[Frequency::Daily])));
        assert_eq!(result.len(), 1);
        assert!(result[&Frequency::Daily].is_empty());
    }
}
