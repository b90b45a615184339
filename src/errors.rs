//! Error types for the mpesa-rs library.
//!
//! Every failure keeps its underlying cause so callers can tell a bad public key
//! from a rejected session or a transport failure.

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Main error type for M-Pesa operations.
#[derive(Error, Debug)]
pub enum MpesaError {
    /// Error during HTTP request/response handling
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error during Base64 decoding of a public key
    #[error("Base64 error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// The public key is not a valid X.509 SubjectPublicKeyInfo
    #[error("Public key parse error: {0}")]
    KeyParseError(#[from] rsa::pkcs8::spki::Error),

    /// The public key parsed, but its algorithm is not rsaEncryption
    #[error("Public key is not an RSA key (algorithm {0})")]
    NotRsaKey(String),

    /// RSA encryption of the application key failed
    #[error("Encryption error: {0}")]
    EncryptionError(#[from] rsa::Error),

    /// No API environment was given
    #[error("Missing API environment")]
    MissingEnvironment,

    /// No market was given
    #[error("Missing market")]
    MissingMarket,

    /// No application key was given and MPESA_APPLICATION_KEY is unset
    #[error("Missing application key")]
    MissingApplicationKey,

    /// The market code is not a single alphanumeric path segment
    #[error("Invalid market code: {0:?}")]
    InvalidMarket(String),

    /// The operation path contains empty, dot or non-alphanumeric segments
    #[error("Invalid operation path: {0:?}")]
    InvalidOperation(String),

    /// The API environment name is not recognised
    #[error("Unknown API environment: {0}")]
    UnknownEnvironment(String),

    /// The provider answered the session request with a non-success code
    #[error("Session rejected ({code}): {description}")]
    SessionRejected {
        /// `output_ResponseCode` returned by the provider
        code: String,
        /// `output_ResponseDesc` returned by the provider
        description: String,
    },

    /// An authenticated request was attempted before a session was established
    #[error("No active session")]
    NoSession,

    /// The configured session lifetime has elapsed
    #[error("Session expired")]
    SessionExpired,

    /// The API answered with a non-2xx status
    #[error("API request failed with status {status}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Raw response body, kept for [`MpesaError::decode_body`]
        body: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error parsing URL
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
}

impl MpesaError {
    /// Best-effort decoding of a failed response body into the caller's own type.
    ///
    /// Returns `None` for every variant except [`MpesaError::ApiError`], and when the
    /// body is empty or does not match `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mpesa_rs::MpesaError;
    /// use serde_json::Value;
    ///
    /// let err = MpesaError::ApiError {
    ///     status: 400,
    ///     body: r#"{"output_ResponseCode":"INS-13"}"#.to_string(),
    /// };
    /// let body: Value = err.decode_body().unwrap();
    /// assert_eq!(body["output_ResponseCode"], "INS-13");
    /// ```
    pub fn decode_body<T: DeserializeOwned>(&self) -> Option<T> {
        match self {
            MpesaError::ApiError { body, .. } if !body.is_empty() => {
                serde_json::from_str(body).ok()
            }
            _ => None,
        }
    }

    /// Returns the HTTP status of an [`MpesaError::ApiError`].
    pub fn status(&self) -> Option<u16> {
        match self {
            MpesaError::ApiError { status, .. } => Some(*status),
            MpesaError::HttpError(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for M-Pesa operations.
pub type Result<T> = std::result::Result<T, MpesaError>;
