//! GrDF consumption JSON parser

use crate::types::{GazparError, MeterReading, Result, DISPLAY_DATE_FORMAT};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::{capture_timestamp, SOURCE_DATE_FORMAT};

/// Consumption payload keyed by PCE identifier
pub type ConsumptionPayload = HashMap<String, PceConsumption>;

/// Weather payload: temperature keyed by `yyyy-mm-dd`
pub type WeatherPayload = HashMap<String, Option<f64>>;

/// Consumption data of one metering point
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PceConsumption {
    #[serde(default)]
    pub releves: Vec<Releve>,
}

/// One daily reading as published by GrDF
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Releve {
    pub journee_gaziere: Option<String>,
    pub index_debut: Option<f64>,
    pub index_fin: Option<f64>,
    pub volume_brut_consomme: Option<f64>,
    pub energie_consomme: Option<f64>,
    pub coeff_conversion: Option<f64>,
    pub temperature: Option<f64>,
    pub qualification_releve: Option<String>,
}

/// Parser for GrDF JSON consumption and weather payloads
pub struct JsonParser;

impl JsonParser {
    /// Parse raw JSON documents into daily readings of `pce_identifier`.
    ///
    /// The weather document is optional: when missing, `null` or not a map of
    /// temperatures it is ignored and temperatures stay as the consumption
    /// payload reports them.
    pub fn parse(
        consumption_json: &str,
        weather_json: Option<&str>,
        pce_identifier: &str,
    ) -> Result<Vec<MeterReading>> {
        let mut bytes = consumption_json.as_bytes().to_vec();
        let consumption: ConsumptionPayload = simd_json::serde::from_slice(&mut bytes)
            .map_err(|e| GazparError::Parse(format!("invalid consumption JSON: {}", e)))?;

        let weather = weather_json.and_then(Self::decode_weather);

        Self::parse_payloads(&consumption, weather.as_ref(), pce_identifier)
    }

    /// Build daily readings from decoded payloads
    pub fn parse_payloads(
        consumption: &ConsumptionPayload,
        weather: Option<&WeatherPayload>,
        pce_identifier: &str,
    ) -> Result<Vec<MeterReading>> {
        let pce = consumption.get(pce_identifier).ok_or_else(|| {
            GazparError::Parse(format!(
                "meter '{}' not found in consumption payload",
                pce_identifier
            ))
        })?;

        let weather = weather.filter(|w| !w.is_empty());
        let timestamp = capture_timestamp();

        let mut dated = Vec::with_capacity(pce.releves.len());
        for releve in &pce.releves {
            let day = match &releve.journee_gaziere {
                Some(day) => day,
                None => {
                    debug!("skipping reading without gas day");
                    continue;
                }
            };
            let date = NaiveDate::parse_from_str(day.trim(), SOURCE_DATE_FORMAT)
                .map_err(|e| GazparError::Parse(format!("invalid gas day '{}': {}", day, e)))?;

            let temperature = releve
                .temperature
                .or_else(|| weather.and_then(|w| w.get(day.trim()).copied().flatten()));

            let mut reading =
                MeterReading::new(date.format(DISPLAY_DATE_FORMAT).to_string(), timestamp);
            reading.start_index = releve.index_debut;
            reading.end_index = releve.index_fin;
            reading.volume = releve.volume_brut_consomme;
            reading.energy = releve.energie_consomme;
            reading.converter_factor = releve.coeff_conversion;
            reading.temperature = temperature;
            reading.reading_type = releve.qualification_releve.clone();

            dated.push((date, reading));
        }

        dated.sort_by_key(|(date, _)| *date);
        let readings: Vec<MeterReading> = dated.into_iter().map(|(_, r)| r).collect();

        debug!(rows = readings.len(), "daily data read from JSON");

        Ok(readings)
    }

    /// Decode a weather document; `[]` is how GrDF reports no data
    fn decode_weather(json: &str) -> Option<WeatherPayload> {
        if json.trim().is_empty() {
            return None;
        }
        let mut bytes = json.as_bytes().to_vec();
        let value: serde_json::Value = match simd_json::serde::from_slice(&mut bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable weather data");
                return None;
            }
        };

        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Array(items) if items.is_empty() => Some(WeatherPayload::new()),
            other => match serde_json::from_value(other) {
                Ok(weather) => Some(weather),
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable weather data");
                    None
                }
            },
        }
    }
}
