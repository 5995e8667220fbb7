use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("All providers failed for {ticker}: {last}")]
    AllProvidersFailed {
        ticker: String,
        #[source]
        last: Box<ProviderError>,
    },
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::InvalidData(e.to_string())
    }
}

/// Uniform failure of one data provider, carrying the causing condition.
#[derive(Error, Debug)]
#[error("{provider}: {cause}")]
pub struct ProviderError {
    pub provider: String,
    #[source]
    pub cause: AnalysisError,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, cause: AnalysisError) -> Self {
        Self {
            provider: provider.into(),
            cause,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.cause, AnalysisError::NotFound(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, AnalysisError::Timeout(_))
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
pub type ProviderResult<T> = Result<T, ProviderError>;
