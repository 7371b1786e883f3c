use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("collector request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("collector answered with status {0}")]
    Status(u16),
    #[error("summary encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings unavailable: {0}")]
    Unavailable(String),
    #[error("invalid collector endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

pub type TransportResult<T> = Result<T, TransportError>;
pub type SettingsResult<T> = Result<T, SettingsError>;

impl From<TransportError> for actiontrail_core_types::TrailError {
    fn from(value: TransportError) -> Self {
        actiontrail_core_types::TrailError::new(value.to_string())
    }
}
