//! JSON-backed data sources

use crate::parsers::JsonParser;
use crate::services::api_client::{ApiClient, ConsumptionType, GrdfApi};
use crate::types::{Frequency, MeterReadingsByFrequency, Result};
use chrono::{Duration, Local, NaiveDate};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::{derive_from_daily, empty_result, DataSource, SAMPLE_PCE_IDENTIFIER};

/// Fewest days the weather endpoint is asked for
const MIN_WEATHER_DAYS: i64 = 10;

/// Most days the weather endpoint accepts without failing
const MAX_WEATHER_DAYS: i64 = 730;

/// End date and day count of the weather request covering `[start, end]`.
///
/// Weather stops at yesterday, so an end date of today or later is moved back
/// one day before `today`.
pub fn weather_window(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> (NaiveDate, i64) {
    let end = if end >= today {
        today - Duration::days(1)
    } else {
        end
    };
    let days = (end - start)
        .num_days()
        .clamp(MIN_WEATHER_DAYS, MAX_WEATHER_DAYS);
    (end, days)
}

/// Reads consumption (and optionally weather) JSON documents from disk
pub struct JsonFileDataSource {
    consumption_file: PathBuf,
    weather_file: Option<PathBuf>,
}

impl JsonFileDataSource {
    pub fn new(consumption_file: impl Into<PathBuf>, weather_file: Option<PathBuf>) -> Self {
        Self {
            consumption_file: consumption_file.into(),
            weather_file,
        }
    }
}

impl DataSource for JsonFileDataSource {
    fn name(&self) -> &str {
        "json-file"
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
        let consumption = fs::read_to_string(&self.consumption_file)?;
        let weather = match &self.weather_file {
            Some(path) => match fs::read_to_string(path) {
                Ok(content) => Some(content),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "weather file unavailable");
                    None
                }
            },
            None => None,
        };

        let daily = JsonParser::parse(&consumption, weather.as_deref(), pce_identifier)?;
        derive_from_daily(&daily, &Frequency::resolve(frequencies))
    }
}

/// Fetches one consumption payload from the GrDF API and derives every
/// frequency from it
pub struct JsonWebDataSource<A: GrdfApi = ApiClient> {
    api: A,
}

impl JsonWebDataSource<ApiClient> {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_api(ApiClient::new(username, password))
    }
}

impl<A: GrdfApi> JsonWebDataSource<A> {
    pub fn with_api(api: A) -> Self {
        Self { api }
    }
}

impl<A: GrdfApi> DataSource for JsonWebDataSource<A> {
    fn name(&self) -> &str {
        "json-web"
    }

    fn login(&mut self) -> Result<()> {
        self.api.login()
    }

    fn logout(&mut self) {
        self.api.logout()
    }

    fn get_pce_identifiers(&mut self) -> Result<Vec<String>> {
        self.api.login()?;
        self.api.get_pce_list()
    }

    fn load(
        &mut self,
        pce_identifier: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        frequencies: Option<&[Frequency]>,
    ) -> Result<MeterReadingsByFrequency> {
        self.api.login()?;
        let frequencies = Frequency::resolve(frequencies);

        let consumption = self.api.get_pce_consumption(
            ConsumptionType::Informative,
            start_date,
            end_date,
            &[pce_identifier],
        )?;
        debug!(meters = consumption.len(), "consumption data received");

        let (weather_end, days) = weather_window(start_date, end_date, Local::now().date_naive());
        let weather = match self.api.get_pce_meteo(weather_end, days, pce_identifier) {
            Ok(weather) => Some(weather),
            Err(e) => {
                warn!(error = %e, "weather data unavailable, temperatures may be missing");
                None
            }
        };

        if consumption.is_empty() {
            info!(pce = pce_identifier, "no consumption data for this period");
            return Ok(empty_result(&frequencies));
        }

        let daily = JsonParser::parse_payloads(&consumption, weather.as_ref(), pce_identifier)?;
        info!(pce = pce_identifier, days = daily.len(), "consumption data loaded");

        derive_from_daily(&daily, &frequencies)
    }
}
