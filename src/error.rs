//! Error types and handling for Telemirror
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting. None of these errors is
//! fatal to the process: a failed poll is logged and retried on a later
//! heartbeat.

use thiserror::Error;

/// Result type alias for Telemirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Main error type for Telemirror
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Unexpected responses from the vehicle cloud service
    #[error("API error: {message}")]
    Api { message: String },

    /// The provider rejected the credentials
    #[error("Login error: {message}")]
    Login { message: String },

    /// The provider does not know the username
    #[error("Invalid username: {message}")]
    InvalidUsername { message: String },

    /// No vehicle on the account matched the configured identifier
    #[error("Vehicle not found: {message}")]
    VehicleNotFound { message: String },

    /// Transient failure inside the provider
    #[error("Provider internal error: {message}")]
    ProviderInternal { message: String },

    /// Reverse geocoding errors
    #[error("Geocoding error: {message}")]
    Geocoding { message: String },

    /// Device registry errors
    #[error("Registry error: {message}")]
    Registry { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl MirrorError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        MirrorError::Config {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        MirrorError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        MirrorError::Network {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        MirrorError::Api {
            message: message.into(),
        }
    }

    /// Create a new login error
    pub fn login<S: Into<String>>(message: S) -> Self {
        MirrorError::Login {
            message: message.into(),
        }
    }

    /// Create a new invalid-username error
    pub fn invalid_username<S: Into<String>>(message: S) -> Self {
        MirrorError::InvalidUsername {
            message: message.into(),
        }
    }

    /// Create a new vehicle-not-found error
    pub fn vehicle_not_found<S: Into<String>>(message: S) -> Self {
        MirrorError::VehicleNotFound {
            message: message.into(),
        }
    }

    /// Create a new provider-internal error
    pub fn provider_internal<S: Into<String>>(message: S) -> Self {
        MirrorError::ProviderInternal {
            message: message.into(),
        }
    }

    /// Create a new geocoding error
    pub fn geocoding<S: Into<String>>(message: S) -> Self {
        MirrorError::Geocoding {
            message: message.into(),
        }
    }

    /// Create a new registry error
    pub fn registry<S: Into<String>>(message: S) -> Self {
        MirrorError::Registry {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        MirrorError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        MirrorError::Generic {
            message: message.into(),
        }
    }

    /// Whether the provider refused the account itself
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            MirrorError::Login { .. } | MirrorError::InvalidUsername { .. }
        )
    }
}

impl From<std::io::Error> for MirrorError {
    fn from(err: std::io::Error) -> Self {
        MirrorError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for MirrorError {
    fn from(err: serde_yaml::Error) -> Self {
        MirrorError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for MirrorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MirrorError::api(err.to_string())
        } else {
            MirrorError::network(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for MirrorError {
    fn from(err: chrono::ParseError) -> Self {
        MirrorError::validation("datetime", err.to_string().as_str())
    }
}
