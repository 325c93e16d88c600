//! Canned readings for demos and tests

use crate::types::{Frequency, GazparError, MeterReading, MeterReadingsByFrequency, Result};
use chrono::NaiveDate;
use tracing::debug;

use super::{DataSource, SAMPLE_PCE_IDENTIFIER};

const HOURLY_SAMPLE: &str = include_str!("../resources/hourly_data_sample.json");
const DAILY_SAMPLE: &str = include_str!("../resources/daily_data_sample.json");
const WEEKLY_SAMPLE: &str = include_str!("../resources/weekly_data_sample.json");
const MONTHLY_SAMPLE: &str = include_str!("../resources/monthly_data_sample.json");
const YEARLY_SAMPLE: &str = include_str!("../resources/yearly_data_sample.json");

/// Returns the bundled sample readings whatever the meter or dates
#[derive(Debug, Default)]
pub struct TestDataSource;

impl TestDataSource {
    pub fn new() -> Self {
        Self
    }

    fn sample(frequency: Frequency) -> Result<Vec<MeterReading>> {
        let raw = match frequency {
            Frequency::Hourly => HOURLY_SAMPLE,
            Frequency::Daily => DAILY_SAMPLE,
            Frequency::Weekly => WEEKLY_SAMPLE,
            Frequency::Monthly => MONTHLY_SAMPLE,
            Frequency::Yearly => YEARLY_SAMPLE,
        };
        let mut bytes = raw.as_bytes().to_vec();
        simd_json::serde::from_slice(&mut bytes).map_err(|e| {
            GazparError::Parse(format!("invalid {} sample: {}", frequency, e))
        })
    }
}

impl DataSource for TestDataSource {
    fn name(&self) -> &str {
        "test"
    }

    fn get_pce_identifiers(&mut self) -> Result<Vec<String>> {
        Ok(vec![SAMPLE_PCE_IDENTIFIER.to_string()])
    }

    fn load(
        &mut self,
        pce_identifier: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
        frequencies: Option<&[Frequency]>,
    ) -> Result<MeterReadingsByFrequency> {
        debug!(pce = pce_identifier, "serving sample data");
        Frequency::resolve(frequencies)
            .into_iter()
            .map(|frequency| Ok((frequency, Self::sample(frequency)?)))
            .collect()
    }
}
