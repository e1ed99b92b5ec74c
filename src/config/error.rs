//! Configuration Error Types
//!
//! Error handling for resilience configuration loading and validation, with
//! specific messages naming the offending field.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Configuration file not found at an explicitly requested path
    #[error("Configuration file not found: {path}")]
    ConfigFileNotFound { path: PathBuf },

    /// Invalid TOML syntax or shape in configuration file
    #[error("Invalid TOML in '{file_path}': {error}")]
    InvalidToml { file_path: String, error: String },

    /// Missing required configuration field
    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// Environment-specific configuration issues
    #[error("Environment configuration error for '{environment}': {error}")]
    EnvironmentConfigError { environment: String, error: String },

    /// Layer merging or deserialization errors from the `config` crate
    #[error("Failed to merge configuration layers: {error}")]
    ConfigMergeError { error: String },

    /// Configuration validation errors
    #[error("Configuration validation failed: {error}")]
    ValidationError { error: String },
}

impl ConfigurationError {
    pub fn config_file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigFileNotFound { path: path.into() }
    }

    /// Create an invalid TOML error
    pub fn invalid_toml<P: Into<String>, E: std::fmt::Display>(file_path: P, error: E) -> Self {
        Self::InvalidToml {
            file_path: file_path.into(),
            error: error.to_string(),
        }
    }

    /// Create a missing required field error
    pub fn missing_required_field<F: Into<String>, C: Into<String>>(field: F, context: C) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value<F: Into<String>, V: Into<String>, C: Into<String>>(
        field: F,
        value: V,
        context: C,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    /// Create an environment configuration error
    pub fn environment_config_error<E: Into<String>, R: std::fmt::Display>(
        environment: E,
        error: R,
    ) -> Self {
        Self::EnvironmentConfigError {
            environment: environment.into(),
            error: error.to_string(),
        }
    }

    pub fn config_merge_error<E: std::fmt::Display>(error: E) -> Self {
        Self::ConfigMergeError {
            error: error.to_string(),
        }
    }

    /// Create a validation error
    pub fn validation_error<E: std::fmt::Display>(error: E) -> Self {
        Self::ValidationError {
            error: error.to_string(),
        }
    }
}

impl From<ConfigurationError> for crate::errors::ResilienceError {
    fn from(err: ConfigurationError) -> Self {
        crate::errors::ResilienceError::configuration(err.to_string()).with_component("config")
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;

    #[test]
    fn test_missing_required_field_error() {
        let error = ConfigurationError::missing_required_field(
            "recovery.backup_strategies.name",
            "backup strategy",
        );

        let error_string = error.to_string();
        assert!(error_string
            .contains("Missing required configuration field 'recovery.backup_strategies.name'"));
        assert!(error_string.contains("backup strategy"));
    }

    #[test]
    fn test_invalid_value_error() {
        let error = ConfigurationError::invalid_value(
            "retry.telegram.exponential_base",
            "1",
            "exponential_base must be greater than 1",
        );

        let error_string = error.to_string();
        assert!(error_string.contains("Invalid value '1' for field 'retry.telegram.exponential_base'"));
        assert!(error_string.contains("must be greater than 1"));
    }

    #[test]
    fn test_conversion_to_taxonomy() {
        let error: crate::errors::ResilienceError =
            ConfigurationError::validation_error("bad thresholds").into();
        assert_eq!(error.category, ErrorCategory::Configuration);
        assert!(!error.retryable);
        assert!(error.message.contains("bad thresholds"));
    }
}
