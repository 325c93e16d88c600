//! Meter reading types shared by parsers, the aggregator and data sources

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::{GazparError, Result};

/// Display format of daily `time_period` labels
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

/// Reporting granularity of a reading sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Recognized but never supplied by the source
    Hourly,
    Daily,
    Weekly,
    Monthly,
    /// Always derived from daily readings
    Yearly,
}

impl Frequency {
    pub const ALL: [Frequency; 5] = [
        Frequency::Hourly,
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    /// Label used as key in `MeterReadingsByFrequency` output
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }

    /// Distinct frequencies to produce for a request (`None` → all of them)
    pub fn resolve(requested: Option<&[Frequency]>) -> BTreeSet<Frequency> {
        match requested {
            Some(list) => list.iter().copied().collect(),
            None => Frequency::ALL.into_iter().collect(),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = GazparError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Frequency::Hourly),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(GazparError::Config(format!("unknown frequency '{}'", other))),
        }
    }
}

/// One row of metering data.
///
/// Numeric fields stay `None` when the source has no value for them, which is
/// distinct from a reading of zero. `None` fields are omitted from JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterReading {
    /// `dd/mm/yyyy` for daily rows, a range or period name otherwise
    pub time_period: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<f64>,
    /// Gas volume in m³
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Energy in kWh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// How the index was obtained (estimated, measured...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub reading_type: Option<String>,
    /// When this system materialized the row, shared by every row of one parse
    pub timestamp: NaiveDateTime,
}

impl MeterReading {
    /// Empty reading for a period; fields are filled by the caller
    pub fn new(time_period: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            time_period: time_period.into(),
            start_index: None,
            end_index: None,
            volume: None,
            energy: None,
            converter_factor: None,
            temperature: None,
            reading_type: None,
            timestamp,
        }
    }

    /// Calendar date of a daily reading
    pub fn date(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(self.time_period.trim(), DISPLAY_DATE_FORMAT).map_err(|e| {
            GazparError::Parse(format!(
                "invalid daily time period '{}': {}",
                self.time_period, e
            ))
        })
    }
}

/// Reading sequences keyed by frequency, covering only the requested ones
pub type MeterReadingsByFrequency = BTreeMap<Frequency, Vec<MeterReading>>;
