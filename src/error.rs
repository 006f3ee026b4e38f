//! Unified error handling for the StyleMuse client
//!
//! This module provides a single error system with:
//! - Unique error codes for debugging and documentation
//! - Structured error information with context
//! - Convenient constructor methods
//! - Automatic conversions from common error types

use std::fmt;
use thiserror::Error;

/// Unified Result type for all StyleMuse operations
pub type Result<T> = std::result::Result<T, MuseError>;

/// Error codes for StyleMuse operations
///
/// Each error has a unique code in the format `MXXX` where:
/// - M1XX: Authentication and session errors
/// - M2XX: Network and API errors
/// - M3XX: File and I/O errors
/// - M4XX: Configuration errors
/// - M5XX: Validation and input errors
/// - M6XX: Chat and resource errors
/// - M7XX: Audio capture and playback errors
/// - M9XX: Internal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (M1XX)
    /// M101: Authentication failed
    AuthenticationFailed,
    /// M102: No persisted session
    SessionNotFound,

    // Network (M2XX)
    /// M201: HTTP request failed
    HttpError,
    /// M202: Connection timeout
    ConnectionTimeout,
    /// M203: Connection refused
    ConnectionRefused,
    /// M204: API returned error response
    ApiError,
    /// M205: Invalid API response format
    InvalidResponse,

    // File/IO (M3XX)
    /// M301: File not found
    FileNotFound,
    /// M302: File read error
    FileReadError,
    /// M303: File write error
    FileWriteError,

    // Configuration (M4XX)
    /// M401: Configuration error
    ConfigError,
    /// M402: Invalid endpoint URL
    InvalidEndpoint,

    // Validation (M5XX)
    /// M501: Invalid input
    InvalidInput,
    /// M502: Validation failed
    ValidationFailed,

    // Chat/Resource (M6XX)
    /// M601: Chat session not found
    ChatNotFound,

    // Audio (M7XX)
    /// M701: No usable recorder or player binary
    AudioToolMissing,
    /// M702: Transcription failed
    TranscriptionFailed,
    /// M703: Speech synthesis failed
    SynthesisFailed,
    /// M704: Audio playback failed
    PlaybackFailed,

    // Internal (M9XX)
    /// M901: Internal error
    InternalError,
    /// M902: Serialization error
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::AuthenticationFailed => 101,
            ErrorCode::SessionNotFound => 102,

            ErrorCode::HttpError => 201,
            ErrorCode::ConnectionTimeout => 202,
            ErrorCode::ConnectionRefused => 203,
            ErrorCode::ApiError => 204,
            ErrorCode::InvalidResponse => 205,

            ErrorCode::FileNotFound => 301,
            ErrorCode::FileReadError => 302,
            ErrorCode::FileWriteError => 303,

            ErrorCode::ConfigError => 401,
            ErrorCode::InvalidEndpoint => 402,

            ErrorCode::InvalidInput => 501,
            ErrorCode::ValidationFailed => 502,

            ErrorCode::ChatNotFound => 601,

            ErrorCode::AudioToolMissing => 701,
            ErrorCode::TranscriptionFailed => 702,
            ErrorCode::SynthesisFailed => 703,
            ErrorCode::PlaybackFailed => 704,

            ErrorCode::InternalError => 901,
            ErrorCode::SerializationError => 902,
        }
    }

    /// Get the string code (e.g., "M101")
    pub fn as_str(&self) -> String {
        format!("M{}", self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.code())
    }
}

/// Main error type for all StyleMuse operations
#[derive(Error, Debug)]
pub enum MuseError {
    /// Authentication or session error
    #[error("[{code}] Authentication failed: {message}")]
    Authentication { code: ErrorCode, message: String },

    /// HTTP/Network error
    #[error("[{code}] Network error: {message}")]
    Network {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// API error with status code
    #[error("[{code}] API error ({status}): {message}")]
    Api {
        code: ErrorCode,
        status: u16,
        message: String,
    },

    /// File or IO error
    #[error("[{code}] {context}: {message}")]
    Io {
        code: ErrorCode,
        context: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration error
    #[error("[{code}] Configuration error: {message}")]
    Config {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<config::ConfigError>,
    },

    /// Validation error
    #[error("[{code}] Validation error: {message}")]
    Validation { code: ErrorCode, message: String },

    /// Invalid input error
    #[error("[{code}] Invalid input: {message}")]
    InvalidInput { code: ErrorCode, message: String },

    /// Resource not found
    #[error("[{code}] Not found: {resource}")]
    NotFound { code: ErrorCode, resource: String },

    /// Audio capture/synthesis/playback error
    #[error("[{code}] Audio error: {message}")]
    Audio { code: ErrorCode, message: String },

    /// Internal/Unexpected error
    #[error("[{code}] Internal error: {message}")]
    Internal { code: ErrorCode, message: String },

    /// JSON serialization error
    #[error("[{code}] Serialization error: {message}")]
    Serialization {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

impl MuseError {
    // --- Authentication ---

    /// Create authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::AuthenticationFailed,
            message: message.into(),
        }
    }

    /// Create missing-session error
    pub fn session_not_found() -> Self {
        Self::Authentication {
            code: ErrorCode::SessionNotFound,
            message: "No persisted session. Please log in first.".to_string(),
        }
    }

    // --- Network ---

    /// Create network error from reqwest error
    pub fn network_from_reqwest(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::ConnectionTimeout
        } else if err.is_connect() {
            ErrorCode::ConnectionRefused
        } else {
            ErrorCode::HttpError
        };

        Self::Network {
            code,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::ApiError,
            status,
            message: message.into(),
        }
    }

    /// Create invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::InvalidResponse,
            status: 0,
            message: message.into(),
        }
    }

    // --- File/IO ---

    /// Create IO error from std::io::Error
    pub fn io_from_error(context: impl Into<String>, err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::FileWriteError,
            _ => ErrorCode::FileReadError,
        };

        Self::Io {
            code,
            context: context.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create file not found error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::Io {
            code: ErrorCode::FileNotFound,
            context: "File not found".to_string(),
            message: path.into(),
            source: None,
        }
    }

    // --- Configuration ---

    /// Create configuration error with source
    pub fn config_from_error(err: config::ConfigError) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create invalid endpoint error
    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::InvalidEndpoint,
            message: message.into(),
            source: None,
        }
    }

    // --- Validation ---

    /// Create validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
        }
    }

    /// Create invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code: ErrorCode::InvalidInput,
            message: message.into(),
        }
    }

    // --- Chat/Resource ---

    /// Create chat not found error
    pub fn chat_not_found(chat: impl Into<String>) -> Self {
        Self::NotFound {
            code: ErrorCode::ChatNotFound,
            resource: chat.into(),
        }
    }

    // --- Audio ---

    /// Create missing audio tool error
    pub fn audio_tool_missing(message: impl Into<String>) -> Self {
        Self::Audio {
            code: ErrorCode::AudioToolMissing,
            message: message.into(),
        }
    }

    /// Create transcription error
    pub fn transcription(message: impl Into<String>) -> Self {
        Self::Audio {
            code: ErrorCode::TranscriptionFailed,
            message: message.into(),
        }
    }

    /// Create synthesis error
    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::Audio {
            code: ErrorCode::SynthesisFailed,
            message: message.into(),
        }
    }

    /// Create playback error
    pub fn playback(message: impl Into<String>) -> Self {
        Self::Audio {
            code: ErrorCode::PlaybackFailed,
            message: message.into(),
        }
    }

    // --- Internal ---

    /// Create internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: ErrorCode::InternalError,
            message: message.into(),
        }
    }

    /// Create serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            code: ErrorCode::SerializationError,
            message: message.into(),
            source: None,
        }
    }

    // --- Utility Methods ---

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Api { code, .. } => *code,
            Self::Io { code, .. } => *code,
            Self::Config { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::InvalidInput { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Audio { code, .. } => *code,
            Self::Internal { code, .. } => *code,
            Self::Serialization { code, .. } => *code,
        }
    }

    /// Check if this is an authentication error
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Check if this is a network error
    pub fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Api { .. })
    }

    /// Check if this error was raised before any network I/O
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::InvalidInput { .. })
    }
}

// ==================== From Implementations ====================

impl From<std::io::Error> for MuseError {
    fn from(err: std::io::Error) -> Self {
        Self::io_from_error("IO operation", err)
    }
}

impl From<reqwest::Error> for MuseError {
    fn from(err: reqwest::Error) -> Self {
        Self::network_from_reqwest(err)
    }
}

impl From<serde_json::Error> for MuseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            code: ErrorCode::SerializationError,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<config::ConfigError> for MuseError {
    fn from(err: config::ConfigError) -> Self {
        Self::config_from_error(err)
    }
}

impl From<dialoguer::Error> for MuseError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Internal {
            code: ErrorCode::InternalError,
            message: format!("Prompt error: {}", err),
        }
    }
}

impl From<validator::ValidationErrors> for MuseError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::AuthenticationFailed.code(), 101);
        assert_eq!(ErrorCode::HttpError.code(), 201);
        assert_eq!(ErrorCode::FileNotFound.code(), 301);
        assert_eq!(ErrorCode::AudioToolMissing.code(), 701);
    }

    #[test]
    fn test_error_code_string() {
        assert_eq!(ErrorCode::AuthenticationFailed.as_str(), "M101");
        assert_eq!(ErrorCode::ApiError.as_str(), "M204");
    }

    #[test]
    fn test_error_display() {
        let err = MuseError::authentication("Invalid credentials");
        assert!(err.to_string().contains("M101"));
        assert!(err.to_string().contains("Invalid credentials"));
    }

    #[test]
    fn test_api_error_keeps_server_message() {
        let err = MuseError::api(400, "Please upload at least one photo first");
        assert!(err.to_string().contains("upload at least one photo"));
        assert!(err.is_network_error());
    }

    #[test]
    fn test_validation_is_not_network() {
        let err = MuseError::invalid_input("userId is required");
        assert!(err.is_validation_error());
        assert!(!err.is_network_error());
    }
}
