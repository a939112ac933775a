use thiserror::Error;

#[derive(Error, Debug)]
pub enum QcTrendError {
    #[error("Failed to parse payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Unknown metric series configuration: {0}")]
    UnknownMetric(String),

    #[error("Unparseable date value: {0}")]
    InvalidDate(String),

    #[error("Paging window {start}..{end} is out of range for {rows} data rows")]
    InvalidPageWindow { start: usize, end: usize, rows: usize },

    #[error("Remote request failed: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, QcTrendError>;
