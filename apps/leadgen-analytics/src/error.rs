use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("invalid data format: {0}")]
    InvalidPayload(String),
    #[error("invalid record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AnalyticsError {
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload(message.into())
    }

    pub fn invalid_record(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            index,
            reason: reason.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
