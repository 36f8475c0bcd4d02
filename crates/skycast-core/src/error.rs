//! Centralized error types for Skycast.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling throughout the codebase
//! - Provides user-friendly messages suitable for UI display
//! - Preserves full error context for debugging/logging
//!
//! Network-origin failures are absorbed by the weather layer (it returns
//! default structures instead); these types describe what went wrong for
//! logs and request-slot bookkeeping.

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a UI-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Storage(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Client setup failed: {0}")]
    ClientSetup(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
            NetworkError::ClientSetup(_) => "Network setup failed. Check your settings.",
        }
    }
}

/// Key-value persistence errors (saved locations, preferences).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read {key}: {message}")]
    ReadFailed { key: String, message: String },

    #[error("Failed to write {key}: {message}")]
    WriteFailed { key: String, message: String },

    #[error("Stored value for {key} is malformed: {message}")]
    Malformed { key: String, message: String },
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::ReadFailed { .. } => "Saved locations could not be loaded.",
            StorageError::WriteFailed { .. } => "Saved locations could not be updated.",
            StorageError::Malformed { .. } => {
                "Saved locations look corrupted. They were reset to defaults."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Weather service errors.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error("Request cancelled: {0}")]
    Cancelled(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::LocationNotFound(_) => "Location not found. Check and try again.",
            WeatherError::ServiceUnavailable => {
                "Weather service unavailable. Please try again later."
            }
            WeatherError::Cancelled(_) => "The request was cancelled.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if self.is_builder() {
            NetworkError::ClientSetup(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
