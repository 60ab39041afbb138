/*
[INPUT]:  Error sources (wallet provider, HTTP, API, serialization, storage)
[OUTPUT]: Structured error types with retry and auth hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Backend message that marks a wallet without an account.
pub const USER_NOT_FOUND_MESSAGE: &str = "User not found";

/// Main error type for the marketplace client
#[derive(Error, Debug)]
pub enum MarketError {
    /// No compatible wallet provider is installed
    #[error("Wallet is not installed. Please install a compatible wallet extension.")]
    WalletUnavailable,

    /// User declined the request in the wallet UI
    #[error("{action} rejected by user")]
    UserRejected { action: String },

    /// Backend does not know this wallet yet
    #[error("Wallet not registered. Please complete registration.")]
    WalletNotRegistered,

    /// Backend rejected the signed challenge
    #[error("Signature verification failed: {message}")]
    SignatureVerificationFailed { message: String },

    /// Wallet call issued before a successful connect
    #[error("Wallet not connected. Please connect your wallet first.")]
    NotConnected,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error (code {code}): {message}")]
    Api { code: i32, message: String },

    /// Session refresh failed and the local session was invalidated
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// A wallet or network call did not finish in time
    #[error("{operation} timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// A login or registration attempt is already running
    #[error("An authentication attempt is already in progress")]
    AttemptInProgress,

    /// User supplied input failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Operation not valid in the current login state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid response from server or wallet
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Session or key storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Wallet provider reported a failure other than rejection
    #[error("Wallet error: {0}")]
    Wallet(String),
}

impl MarketError {
    /// Check if the error is worth retrying from the UI
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MarketError::Http(_)
                | MarketError::UserRejected { .. }
                | MarketError::Timeout { .. }
                | MarketError::SignatureVerificationFailed { .. }
                | MarketError::AttemptInProgress
        )
    }

    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        match self {
            MarketError::SessionExpired | MarketError::SignatureVerificationFailed { .. } => true,
            MarketError::Api { code, .. } => *code == 401,
            _ => false,
        }
    }

    /// Check if the backend signalled an unknown wallet
    pub fn is_not_registered(&self) -> bool {
        match self {
            MarketError::WalletNotRegistered => true,
            MarketError::Api { code, message } => {
                *code == 404 || message.contains(USER_NOT_FOUND_MESSAGE)
            }
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            MarketError::Api { code, .. } => u16::try_from(*code)
                .ok()
                .and_then(|code| StatusCode::from_u16(code).ok()),
            MarketError::Http(err) => err.status(),
            _ => None,
        }
    }

    /// Short text suitable for a transient notification
    pub fn user_message(&self) -> String {
        match self {
            MarketError::Api { message, .. } if !message.is_empty() => message.clone(),
            MarketError::Http(_) => "Network error, please try again".to_string(),
            other => other.to_string(),
        }
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        MarketError::Api {
            code: status.as_u16() as i32,
            message: message.into(),
        }
    }

    pub fn rejected(action: impl Into<String>) -> Self {
        MarketError::UserRejected {
            action: action.into(),
        }
    }
}

/// Result type alias for marketplace operations
pub type Result<T> = std::result::Result<T, MarketError>;
