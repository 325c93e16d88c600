//! Natural gas consumption readings from GrDF
//!
//! Readings come from a [`DataSource`](sources::DataSource) (GrDF web API,
//! downloaded spreadsheets, JSON files or bundled samples) and are returned
//! per [`Frequency`](types::Frequency) through the [`Client`].

pub mod client;
pub mod parsers;
pub mod services;
pub mod sources;
pub mod types;

pub use client::{Client, DEFAULT_LAST_N_DAYS};
pub use types::{Frequency, GazparError, MeterReading, MeterReadingsByFrequency, Result};
