//! Error types for PharmaBoost
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in PharmaBoost
#[derive(Debug, Error)]
pub enum PharmaBoostError {
    /// Required credentials missing at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Prompt template missing or malformed
    #[error("Template error: {0}")]
    Template(String),

    /// Batch input (items or catalog) could not be read
    #[error("Batch input error: {0}")]
    BatchInput(String),

    /// Ledger/memory persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for PharmaBoost operations
pub type Result<T> = std::result::Result<T, PharmaBoostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error() {
        let err = PharmaBoostError::Configuration("GEMINI_API_KEY not set".to_string());
        assert_eq!(err.to_string(), "Configuration error: GEMINI_API_KEY not set");
    }

    #[test]
    fn test_template_error() {
        let err = PharmaBoostError::Template("medicine_generator not found".to_string());
        assert_eq!(err.to_string(), "Template error: medicine_generator not found");
    }

    #[test]
    fn test_batch_input_error() {
        let err = PharmaBoostError::BatchInput("items file unreadable".to_string());
        assert_eq!(err.to_string(), "Batch input error: items file unreadable");
    }

    #[test]
    fn test_storage_error() {
        let err = PharmaBoostError::Storage("ledger locked".to_string());
        assert_eq!(err.to_string(), "Storage error: ledger locked");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PharmaBoostError = io_err.into();
        assert!(matches!(err, PharmaBoostError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: PharmaBoostError = json_err.into();
        assert!(matches!(err, PharmaBoostError::Json(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(PharmaBoostError::Storage("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
