use thiserror::Error;

pub type RfmResult<T> = Result<T, RfmError>;

#[derive(Error, Debug)]
pub enum RfmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input for customer {customer_id}: {field} {reason}")]
    InvalidInput {
        customer_id: String,
        field: &'static str,
        reason: String,
    },

    #[error("Invalid {field} score: {value} (expected 1..=5)")]
    InvalidScore { field: &'static str, value: u8 },

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for RfmError {
    fn from(err: config::ConfigError) -> Self {
        RfmError::Config(err.to_string())
    }
}
