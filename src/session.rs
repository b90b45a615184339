//! Session key exchange.
//!
//! A session key acts as an access token for every other API call. It is obtained by
//! sending the encrypted application key to `/{environment}/ipg/v2/{market}/getSession/`.

use crate::crypto::encrypt_api_key;
use crate::errors::{MpesaError, Result};
use crate::types::{Environment, Market, SessionResponse};
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use reqwest::Client;
use std::fmt;
use std::time::Duration;

/// An established session.
#[derive(Clone)]
pub struct Session {
    id: String,
    description: String,
    established_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Builds a session from an accepted provider response.
    ///
    /// `lifetime` is the session lifetime configured for the application on the
    /// developer portal, if any.
    pub fn new(response: SessionResponse, lifetime: Option<Duration>) -> Self {
        let established_at = Utc::now();
        let expires_at = lifetime
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .and_then(|d| established_at.checked_add_signed(d));

        Self {
            id: response.session_id,
            description: response.description,
            established_at,
            expires_at,
        }
    }

    /// The session key to send as bearer token.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Description returned alongside the session key.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// When the session was established.
    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }

    /// When the configured lifetime runs out, if a lifetime was configured.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the configured lifetime has elapsed. Always `false` without a lifetime.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

// The session id is a credential.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &"<redacted>")
            .field("description", &self.description)
            .field("established_at", &self.established_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Builds the `getSession` endpoint URL.
///
/// # Examples
///
/// ```
/// use mpesa_rs::session::session_endpoint;
/// use mpesa_rs::types::{Environment, Market};
///
/// let url = session_endpoint(
///     "https://openapi.m-pesa.com",
///     Environment::Sandbox,
///     &Market::VodacomTanzania,
/// );
/// assert_eq!(url, "https://openapi.m-pesa.com/sandbox/ipg/v2/vodacomTZN/getSession/");
/// ```
pub fn session_endpoint(base_url: &str, environment: Environment, market: &Market) -> String {
    format!(
        "{}/{}/ipg/v2/{}/getSession/",
        base_url.trim_end_matches('/'),
        environment,
        market
    )
}

/// Exchanges an application key for a session key.
///
/// The application key is encrypted with `public_key` (Base64 X.509, normally
/// [`Environment::public_key`]) before anything touches the network, so key and
/// market problems surface without a request.
///
/// # Errors
///
/// * [`MpesaError::MissingMarket`] or [`MpesaError::InvalidMarket`] for a market code
///   that is not a single alphanumeric path segment
/// * Any [`encrypt_api_key`] error
/// * [`MpesaError::HttpError`] on transport failure
/// * [`MpesaError::ApiError`] on a non-2xx status
/// * [`MpesaError::JsonError`] on a malformed body
/// * [`MpesaError::SessionRejected`] when the response code is not `INS-0` or no
///   session id was issued
pub async fn fetch_session(
    http_client: &Client,
    base_url: &str,
    environment: Environment,
    market: &Market,
    public_key: &str,
    application_key: &str,
    lifetime: Option<Duration>,
) -> Result<Session> {
    market.validate()?;
    let encrypted_key = encrypt_api_key(public_key, application_key)?;
    let endpoint = session_endpoint(base_url, environment, market);

    tracing::debug!(%endpoint, %environment, %market, "requesting session key");

    let response = http_client
        .get(&endpoint)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {}", encrypted_key))
        .header(ORIGIN, "*")
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "session request failed");
        return Err(MpesaError::ApiError {
            status: status.as_u16(),
            body,
        });
    }

    let session_response: SessionResponse = serde_json::from_str(&body)?;

    if !session_response.is_success() {
        tracing::warn!(
            code = %session_response.code,
            description = %session_response.description,
            "session request rejected"
        );
        return Err(MpesaError::SessionRejected {
            code: session_response.code,
            description: session_response.description,
        });
    }

    let session = Session::new(session_response, lifetime);
    tracing::info!(
        %environment,
        %market,
        expires_at = ?session.expires_at(),
        "session established"
    );

    Ok(session)
}
