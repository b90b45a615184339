//! Core type definitions for the M-Pesa OpenAPI.
//!
//! This module contains the deployment targets, markets and wire shapes shared by
//! the session exchange and the application client.

use crate::errors::{MpesaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default host of the M-Pesa OpenAPI.
pub const BASE_URL: &str = "https://openapi.m-pesa.com";

/// Response code the provider returns for a successfully processed request.
pub const SUCCESS_RESPONSE_CODE: &str = "INS-0";

/// Environment variable holding the fallback application key.
pub const APPLICATION_KEY_ENV: &str = "MPESA_APPLICATION_KEY";

/// Environment variable selecting the API environment (`sandbox` or `openapi`).
pub const ENVIRONMENT_ENV: &str = "MPESA_ENVIRONMENT";

/// Environment variable selecting the market (e.g. `vodacomTZN`).
pub const MARKET_ENV: &str = "MPESA_MARKET";

/// Environment variable overriding [`BASE_URL`].
pub const BASE_URL_ENV: &str = "MPESA_BASE_URL";

/// Environment variable overriding the embedded provider public key.
pub const PUBLIC_KEY_ENV: &str = "MPESA_PUBLIC_KEY";

/// API deployment target.
///
/// # Examples
///
/// ```
/// use mpesa_rs::types::Environment;
///
/// let env: Environment = "sandbox".parse().unwrap();
/// assert_eq!(env, Environment::Sandbox);
/// assert_eq!(Environment::Production.as_str(), "openapi");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    /// Dedicated environment for testing purposes
    Sandbox,
    /// Production ready environment
    Production,
}

impl Environment {
    /// Path segment used in endpoint URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "openapi",
        }
    }

    /// Base64 encoded provider public key for this environment.
    pub fn public_key(&self) -> &'static str {
        crate::crypto::public_key(*self)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = MpesaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(MpesaError::MissingEnvironment),
            "sandbox" => Ok(Environment::Sandbox),
            "openapi" | "production" => Ok(Environment::Production),
            _ => Err(MpesaError::UnknownEnvironment(s.to_string())),
        }
    }
}

/// Vodacom/Vodafone operating territory: a country and currency pairing.
///
/// Markets the provider opens after this crate was published can be addressed with
/// [`Market::Other`].
///
/// # Examples
///
/// ```
/// use mpesa_rs::types::Market;
///
/// let market: Market = "vodacomTZN".parse().unwrap();
/// assert_eq!(market, Market::VodacomTanzania);
/// assert_eq!(market.currency_code(), Some("TZS"));
///
/// let other: Market = "vodacomLES".parse().unwrap();
/// assert_eq!(other.code(), "vodacomLES");
///
/// assert!("vodacomTZN/../evil".parse::<Market>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Market {
    /// Country code GHA, currency code GHS
    VodafoneGhana,
    /// Country code TZN, currency code TZS
    VodacomTanzania,
    /// Any other market code accepted by the provider
    Other(String),
}

impl Market {
    /// Market code used in endpoint URLs.
    pub fn code(&self) -> &str {
        match self {
            Market::VodafoneGhana => "vodafoneGHA",
            Market::VodacomTanzania => "vodacomTZN",
            Market::Other(code) => code.as_str(),
        }
    }

    /// Checks that the code is a single path segment of ASCII letters and digits.
    ///
    /// # Errors
    ///
    /// * [`MpesaError::MissingMarket`] for an empty code
    /// * [`MpesaError::InvalidMarket`] for anything else outside `[A-Za-z0-9]+`
    pub fn validate(&self) -> Result<()> {
        let code = self.code();
        if code.is_empty() {
            return Err(MpesaError::MissingMarket);
        }
        if !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(MpesaError::InvalidMarket(code.to_string()));
        }
        Ok(())
    }

    /// ISO country code, when known.
    pub fn country_code(&self) -> Option<&'static str> {
        match self {
            Market::VodafoneGhana => Some("GHA"),
            Market::VodacomTanzania => Some("TZN"),
            Market::Other(_) => None,
        }
    }

    /// ISO currency code, when known.
    pub fn currency_code(&self) -> Option<&'static str> {
        match self {
            Market::VodafoneGhana => Some("GHS"),
            Market::VodacomTanzania => Some("TZS"),
            Market::Other(_) => None,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Market {
    type Err = MpesaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(MpesaError::MissingMarket),
            "vodafoneGHA" => Ok(Market::VodafoneGhana),
            "vodacomTZN" => Ok(Market::VodacomTanzania),
            code => {
                let market = Market::Other(code.to_string());
                market.validate()?;
                Ok(market)
            }
        }
    }
}

/// Body returned by the `getSession` endpoint.
///
/// Missing fields decode as empty strings so that a partial body surfaces as a
/// rejected session rather than a decoding error.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionResponse {
    /// The response code for the request
    #[serde(rename = "output_ResponseCode", default)]
    pub code: String,

    /// The response description for the request
    #[serde(rename = "output_ResponseDesc", default)]
    pub description: String,

    /// The session key that authorises subsequent API calls
    #[serde(rename = "output_SessionID", default)]
    pub session_id: String,
}

impl SessionResponse {
    /// Whether the provider accepted the request and issued a session id.
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_RESPONSE_CODE && !self.session_id.is_empty()
    }
}
