use thiserror::Error;

/// gazpar error types
#[derive(Error, Debug)]
pub enum GazparError {
    /// Credentials rejected or session not established
    #[error("authentication error: {0}")]
    Auth(String),

    /// HTTP request failed once the retry budget was spent
    #[error("http error: {0}")]
    Http(String),

    /// Source document is structurally wrong (workbook, JSON, dates, numbers)
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation not offered by this data source or layout
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for gazpar
pub type Result<T> = std::result::Result<T, GazparError>;
