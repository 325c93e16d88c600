//! Frequency conversion and GrDF API access

pub mod aggregator;
pub mod api_client;

pub use aggregator::Aggregator;
pub use api_client::{ApiClient, ApiEndpoints, ConsumptionType, ExcelSheet, GrdfApi};
