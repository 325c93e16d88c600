//! Aggregator service for rolling daily readings up to coarser periods

use crate::types::{Frequency, MeterReading, Result, DISPLAY_DATE_FORMAT};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// Month names used in monthly period labels, January first
pub const MONTHS: [&str; 12] = [
    "Janvier",
    "Février",
    "Mars",
    "Avril",
    "Mai",
    "Juin",
    "Juillet",
    "Août",
    "Septembre",
    "Octobre",
    "Novembre",
    "Décembre",
];

/// Period a group of daily readings is rolled up into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    /// Minimum number of days for a bucket to count as complete
    fn min_days(self) -> u32 {
        match self {
            Period::Week => 7,
            Period::Month => 28,
            Period::Year => 360,
        }
    }

    /// Bucket label and ordering key for a day
    fn bucket(self, date: NaiveDate) -> (String, NaiveDate) {
        match self {
            Period::Week => {
                let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
                let sunday = monday + Duration::days(6);
                let label = format!(
                    "Du {} au {}",
                    monday.format(DISPLAY_DATE_FORMAT),
                    sunday.format(DISPLAY_DATE_FORMAT)
                );
                (label, monday)
            }
            Period::Month => {
                let label = format!("{} {}", MONTHS[date.month0() as usize], date.year());
                (label, date)
            }
            Period::Year => {
                // Jan 1st orders years the same way the year number does
                let first_day = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
                (date.year().to_string(), first_day)
            }
        }
    }
}

/// Running totals of one bucket
#[derive(Debug)]
struct Bucket {
    label: String,
    order: NaiveDate,
    start_index: Option<f64>,
    end_index: Option<f64>,
    volume: Option<f64>,
    energy: Option<f64>,
    timestamp: NaiveDateTime,
    count: u32,
}

impl Bucket {
    fn new(label: String, order: NaiveDate, timestamp: NaiveDateTime) -> Self {
        Self {
            label,
            order,
            start_index: None,
            end_index: None,
            volume: None,
            energy: None,
            timestamp,
            count: 0,
        }
    }

    fn add(&mut self, date: NaiveDate, reading: &MeterReading) {
        self.order = self.order.min(date);
        self.start_index = combine(self.start_index, reading.start_index, f64::min);
        self.end_index = combine(self.end_index, reading.end_index, f64::max);
        self.volume = combine(self.volume, reading.volume, |a, b| a + b);
        self.energy = combine(self.energy, reading.energy, |a, b| a + b);
        self.timestamp = self.timestamp.min(reading.timestamp);
        self.count = self.count.saturating_add(1);
    }

    fn into_reading(self) -> MeterReading {
        let mut reading = MeterReading::new(self.label, self.timestamp);
        reading.start_index = self.start_index;
        reading.end_index = self.end_index;
        reading.volume = self.volume;
        reading.energy = self.energy;
        reading
    }
}

/// Fold an optional value into an optional accumulator, skipping absent values
fn combine(acc: Option<f64>, value: Option<f64>, op: impl Fn(f64, f64) -> f64) -> Option<f64> {
    match (acc, value) {
        (Some(a), Some(b)) => Some(op(a, b)),
        (a, b) => a.or(b),
    }
}

/// Aggregator converting daily readings to other frequencies
pub struct Aggregator;

impl Aggregator {
    /// Derive the sequence for `frequency` from chronological daily readings
    pub fn convert(daily: &[MeterReading], frequency: Frequency) -> Result<Vec<MeterReading>> {
        match frequency {
            Frequency::Hourly => Ok(Self::hourly(daily)),
            Frequency::Daily => Ok(Self::daily(daily)),
            Frequency::Weekly => Self::weekly(daily),
            Frequency::Monthly => Self::monthly(daily),
            Frequency::Yearly => Self::yearly(daily),
        }
    }

    /// The source never provides hourly data
    pub fn hourly(_daily: &[MeterReading]) -> Vec<MeterReading> {
        Vec::new()
    }

    pub fn daily(daily: &[MeterReading]) -> Vec<MeterReading> {
        daily.to_vec()
    }

    /// Monday-to-Sunday weeks labelled `Du dd/mm/yyyy au dd/mm/yyyy`
    pub fn weekly(daily: &[MeterReading]) -> Result<Vec<MeterReading>> {
        Self::rollup(daily, Period::Week)
    }

    /// Calendar months labelled `<Mois> yyyy`
    pub fn monthly(daily: &[MeterReading]) -> Result<Vec<MeterReading>> {
        Self::rollup(daily, Period::Month)
    }

    /// Calendar years labelled `yyyy`
    pub fn yearly(daily: &[MeterReading]) -> Result<Vec<MeterReading>> {
        Self::rollup(daily, Period::Year)
    }

    /// Group days into buckets, sort them chronologically and drop incomplete
    /// buckets except the most recent one, which is still accumulating.
    fn rollup(daily: &[MeterReading], period: Period) -> Result<Vec<MeterReading>> {
        if daily.is_empty() {
            return Ok(Vec::new());
        }

        let mut dated: Vec<(NaiveDate, &MeterReading)> = daily
            .iter()
            .map(|r| r.date().map(|d| (d, r)))
            .collect::<Result<_>>()?;
        dated.sort_by_key(|(date, _)| *date);

        let mut buckets: HashMap<String, Bucket> = HashMap::new();
        for (date, reading) in dated {
            let (label, order) = period.bucket(date);
            buckets
                .entry(label.clone())
                .or_insert_with(|| Bucket::new(label, order, reading.timestamp))
                .add(date, reading);
        }

        let mut buckets: Vec<Bucket> = buckets.into_values().collect();
        buckets.sort_by_key(|b| b.order);

        let last = buckets.len() - 1;
        let min_days = period.min_days();
        let result = buckets
            .into_iter()
            .enumerate()
            .filter(|(i, b)| *i == last || b.count >= min_days)
            .map(|(_, b)| b.into_reading())
            .collect();

        Ok(result)
    }
}
