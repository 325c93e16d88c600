//! Entry point for loading meter readings

use crate::sources::DataSource;
use crate::types::{Frequency, GazparError, MeterReadingsByFrequency, Result};
use chrono::{Local, NaiveDate, TimeDelta};
use tracing::{debug, error};

/// Window used when no explicit range is requested
pub const DEFAULT_LAST_N_DAYS: i64 = 365;

/// Runs date-range requests against one data source
pub struct Client {
    source: Box<dyn DataSource>,
}

impl Client {
    pub fn new(source: Box<dyn DataSource>) -> Self {
        Self { source }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn login(&mut self) -> Result<()> {
        self.source.login()
    }

    pub fn logout(&mut self) {
        self.source.logout()
    }

    pub fn get_pce_identifiers(&mut self) -> Result<Vec<String>> {
        self.source.get_pce_identifiers().inspect_err(|e| {
            error!(source = self.source.name(), error = %e, "failed to list meters");
        })
    }

    /// Readings from `last_n_days` days ago up to today.
    ///
    /// A negative count, or one reaching past the calendar range, is a
    /// `Config` error.
    pub fn load_since(
        &mut self,
        pce_identifier: &str,
        last_n_days: i64,
        frequencies: Option<&[Frequency]>,
    ) -> Result<MeterReadingsByFrequency> {
        let end_date = Local::now().date_naive();
        let start_date = window_start(end_date, last_n_days)?;
        self.load_date_range(pce_identifier, start_date, end_date, frequencies)
    }

    pub fn load_date_range(
        &mut self,
        pce_identifier: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        frequencies: Option<&[Frequency]>,
    ) -> Result<MeterReadingsByFrequency> {
        debug!(
            source = self.source.name(),
            pce = pce_identifier,
            %start_date,
            %end_date,
            "loading readings"
        );

        self.source
            .load(pce_identifier, start_date, end_date, frequencies)
            .inspect_err(|e| {
                error!(pce = pce_identifier, error = %e, "failed to load readings");
            })
    }
}

fn window_start(end_date: NaiveDate, last_n_days: i64) -> Result<NaiveDate> {
    if last_n_days < 0 {
        return Err(GazparError::Config(format!(
            "number of days must not be negative, got {}",
            last_n_days
        )));
    }
    TimeDelta::try_days(last_n_days)
        .and_then(|window| end_date.checked_sub_signed(window))
        .ok_or_else(|| {
            GazparError::Config(format!("number of days out of range: {}", last_n_days))
        })
}
