//! GrDF spreadsheet (xlsx) parser

use crate::types::{Frequency, GazparError, MeterReading, Result, DISPLAY_DATE_FORMAT};
use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use chrono::NaiveDateTime;
use std::path::Path;
use tracing::debug;

use super::capture_timestamp;

/// First data row of every layout (1-based, as shown in a spreadsheet)
pub const FIRST_DATA_ROW: u32 = 10;

/// Column holding the date/period of each row (B)
const PERIOD_COLUMN: u32 = 1;

/// Reading field a spreadsheet column maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    TimePeriod,
    StartIndex,
    EndIndex,
    Volume,
    Energy,
    ConverterFactor,
    Temperature,
    Type,
}

/// Daily export: B..I
const DAILY_LAYOUT: &[(u32, Field)] = &[
    (1, Field::TimePeriod),
    (2, Field::StartIndex),
    (3, Field::EndIndex),
    (4, Field::Volume),
    (5, Field::Energy),
    (6, Field::ConverterFactor),
    (7, Field::Temperature),
    (8, Field::Type),
];

/// Weekly and monthly exports: B..D
const PERIOD_LAYOUT: &[(u32, Field)] = &[
    (1, Field::TimePeriod),
    (2, Field::Volume),
    (3, Field::Energy),
];

/// Parser for GrDF "Donnees_informatives" workbooks
pub struct ExcelParser;

impl ExcelParser {
    /// Parse the first worksheet of a workbook file with the layout of `frequency`
    pub fn parse_file(path: &Path, frequency: Frequency) -> Result<Vec<MeterReading>> {
        debug!(path = %path.display(), %frequency, "loading Excel data file");

        let mut workbook = open_workbook_auto(path).map_err(|e| {
            GazparError::Parse(format!("cannot open workbook {}: {}", path.display(), e))
        })?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| {
                GazparError::Parse(format!("workbook {} has no worksheet", path.display()))
            })?
            .map_err(|e| {
                GazparError::Parse(format!(
                    "cannot read worksheet of {}: {}",
                    path.display(),
                    e
                ))
            })?;

        Self::parse_range(&range, frequency)
    }

    /// Parse the cells of a worksheet with the layout of `frequency`
    pub fn parse_range(range: &Range<Data>, frequency: Frequency) -> Result<Vec<MeterReading>> {
        let layout = match frequency {
            Frequency::Hourly => return Ok(Vec::new()),
            Frequency::Daily => DAILY_LAYOUT,
            Frequency::Weekly | Frequency::Monthly => PERIOD_LAYOUT,
            Frequency::Yearly => {
                return Err(GazparError::Unsupported(
                    "no yearly spreadsheet layout, derive it from daily data".into(),
                ))
            }
        };

        let timestamp = capture_timestamp();
        let first_row = FIRST_DATA_ROW - 1;
        let last_row = match range.end() {
            Some((row, _)) => row,
            None => return Ok(Vec::new()),
        };

        let mut readings = Vec::new();
        for row in first_row..=last_row {
            if let Some(reading) = Self::parse_row(range, row, layout, timestamp)? {
                readings.push(reading);
            }
        }

        debug!(
            %frequency,
            rows = readings.len(),
            first_row = FIRST_DATA_ROW,
            last_row = last_row + 1,
            "Excel data read"
        );

        Ok(readings)
    }

    /// Read one row; rows without a period are skipped
    fn parse_row(
        range: &Range<Data>,
        row: u32,
        layout: &[(u32, Field)],
        timestamp: NaiveDateTime,
    ) -> Result<Option<MeterReading>> {
        let period = match range
            .get_value((row, PERIOD_COLUMN))
            .and_then(text_value)
            .filter(|p| !p.is_empty())
        {
            Some(p) => p,
            None => return Ok(None),
        };

        let mut reading = MeterReading::new(period, timestamp);
        for &(column, field) in layout {
            let cell = match range.get_value((row, column)) {
                Some(cell) => cell,
                None => continue,
            };
            match field {
                Field::TimePeriod => {}
                Field::Type => reading.reading_type = text_value(cell),
                _ => {
                    let value = number_value(cell).map_err(|msg| {
                        GazparError::Parse(format!("row {}, column {}: {}", row + 1, column + 1, msg))
                    })?;
                    match field {
                        Field::StartIndex => reading.start_index = value,
                        Field::EndIndex => reading.end_index = value,
                        Field::Volume => reading.volume = value,
                        Field::Energy => reading.energy = value,
                        Field::ConverterFactor => reading.converter_factor = value,
                        Field::Temperature => reading.temperature = value,
                        Field::TimePeriod | Field::Type => {}
                    }
                }
            }
        }

        Ok(Some(reading))
    }
}

/// Text of a cell, trimmed; date cells are rendered as `dd/mm/yyyy`
fn text_value(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.trim().to_string()),
        Data::DateTime(_) => cell
            .as_date()
            .map(|d| d.format(DISPLAY_DATE_FORMAT).to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric value of a cell; textual numbers may use a decimal comma.
/// Empty cells and blank strings give `None`. Date cells give their Excel
/// serial, booleans 1 or 0, ISO text cells nothing.
fn number_value(cell: &Data) -> std::result::Result<Option<f64>, String> {
    match cell {
        Data::Empty | Data::Error(_) => Ok(None),
        Data::Float(f) => Ok(Some(*f)),
        Data::Int(i) => Ok(Some(*i as f64)),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .replace(',', ".")
                .parse::<f64>()
                .map(Some)
                .map_err(|e| format!("invalid number '{}': {}", s, e))
        }
        Data::DateTime(dt) => Ok(Some(dt.as_f64())),
        Data::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        _ => Ok(None),
    }
}
