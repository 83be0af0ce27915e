use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A single upstream provider failed; the fetcher moves on to the next one
    #[error("Provider {provider} failed: {reason}")]
    Provider { provider: String, reason: String },

    /// Provider rows are unusable after column normalization
    #[error("Schema error from {provider}: {reason}")]
    Schema { provider: String, reason: String },

    #[error("Provider {provider} timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },

    /// Every provider was exhausted without usable data
    #[error("No data for {0}")]
    NoData(String),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn provider(provider: &str, reason: impl Into<String>) -> Self {
        AppError::Provider {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }

    pub fn schema(provider: &str, reason: impl Into<String>) -> Self {
        AppError::Schema {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the fetcher may recover by trying the next provider
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Provider { .. }
                | AppError::Schema { .. }
                | AppError::Timeout { .. }
                | AppError::Network(_)
                | AppError::Parse(_)
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<isahc::Error> for AppError {
    fn from(err: isahc::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(format!("JSON error: {}", err))
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Parse(format!("CSV error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

// Alias for convenience
pub type Error = AppError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(AppError::provider("TCBS", "boom").is_recoverable());
        assert!(AppError::schema("VCI", "missing close").is_recoverable());
        assert!(AppError::Timeout { provider: "VCI".into(), secs: 30 }.is_recoverable());
        assert!(!AppError::NoData("VCB".into()).is_recoverable());
        assert!(!AppError::InvalidInput("bad date".into()).is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = AppError::provider("TCBS", "HTTP 500");
        assert_eq!(err.to_string(), "Provider TCBS failed: HTTP 500");
        assert_eq!(AppError::NoData("HPG".into()).to_string(), "No data for HPG");
    }
}
