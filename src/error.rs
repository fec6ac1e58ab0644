use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API response format error: {0}")]
    ApiFormat(String),

    #[error("Schema violation in table '{table}': {message}")]
    SchemaViolation { table: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl IngestError {
    /// Classify a reqwest failure as a transport-level network error.
    pub fn network(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IngestError::Network(format!("request timed out: {}", err))
        } else if err.is_connect() {
            IngestError::Network(format!("connection failed: {}", err))
        } else {
            IngestError::Network(err.to_string())
        }
    }

    pub fn schema(table: &str, message: impl Into<String>) -> Self {
        IngestError::SchemaViolation {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for IngestError {
    fn from(err: config::ConfigError) -> Self {
        IngestError::Config(err.to_string())
    }
}
