//! Type definitions for gazpar

mod error;
mod reading;

pub use error::*;
pub use reading::*;
