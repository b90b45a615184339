//! Application client for the M-Pesa OpenAPI.
//!
//! An [`Application`] holds one application's credentials, exchanges them for a
//! session key, and sends authenticated JSON requests on behalf of the payment
//! operation endpoints.

use crate::crypto::parse_public_key;
use crate::errors::{MpesaError, Result};
use crate::session::{fetch_session, Session};
use crate::types::{
    Environment, Market, APPLICATION_KEY_ENV, BASE_URL, BASE_URL_ENV, ENVIRONMENT_ENV, MARKET_ENV,
    PUBLIC_KEY_ENV,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Configuration for an [`Application`].
#[derive(Clone)]
pub struct ApplicationConfig {
    /// Application key; empty means "read `MPESA_APPLICATION_KEY`"
    pub application_key: String,

    /// Operating market
    pub market: Market,

    /// API environment
    pub environment: Environment,

    /// Host of the API (defaults to [`BASE_URL`])
    pub base_url: String,

    /// HTTP client to use for requests
    pub http_client: Client,

    /// Session lifetime configured for the application on the portal
    pub session_lifetime: Option<Duration>,

    /// Base64 X.509 provider public key; `None` uses the key embedded for `environment`
    pub public_key: Option<String>,
}

impl ApplicationConfig {
    /// Creates a new application configuration.
    ///
    /// # Arguments
    ///
    /// * `application_key` - Key generated with the application; may be empty when
    ///   `MPESA_APPLICATION_KEY` is set
    /// * `market` - Operating market
    /// * `environment` - Sandbox or production
    ///
    /// # Examples
    ///
    /// ```
    /// use mpesa_rs::client::ApplicationConfig;
    /// use mpesa_rs::types::{Environment, Market};
    ///
    /// let config =
    ///     ApplicationConfig::new("my-api-key", Market::VodacomTanzania, Environment::Sandbox);
    /// assert_eq!(config.base_url, "https://openapi.m-pesa.com");
    /// ```
    pub fn new(
        application_key: impl Into<String>,
        market: Market,
        environment: Environment,
    ) -> Self {
        Self {
            application_key: application_key.into(),
            market,
            environment,
            base_url: BASE_URL.to_string(),
            http_client: Client::new(),
            session_lifetime: None,
            public_key: None,
        }
    }

    /// Creates a configuration from string values, as read from a config file or CLI.
    ///
    /// Empty environment or market strings are rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use mpesa_rs::client::ApplicationConfig;
    /// use mpesa_rs::MpesaError;
    ///
    /// assert!(ApplicationConfig::parse("key", "vodafoneGHA", "openapi").is_ok());
    /// assert!(matches!(
    ///     ApplicationConfig::parse("key", "", "sandbox"),
    ///     Err(MpesaError::MissingMarket)
    /// ));
    /// ```
    pub fn parse(
        application_key: impl Into<String>,
        market: &str,
        environment: &str,
    ) -> Result<Self> {
        let environment = environment.parse()?;
        let market = market.parse()?;
        Ok(Self::new(application_key, market, environment))
    }

    /// Loads the configuration from `MPESA_APPLICATION_KEY`, `MPESA_MARKET`,
    /// `MPESA_ENVIRONMENT` and the optional `MPESA_BASE_URL` and `MPESA_PUBLIC_KEY`.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name).unwrap_or_default();

        let mut config = Self::parse(
            var(APPLICATION_KEY_ENV),
            &var(MARKET_ENV),
            &var(ENVIRONMENT_ENV),
        )?;
        let base_url = var(BASE_URL_ENV);
        if !base_url.is_empty() {
            config.base_url = base_url;
        }
        let public_key = var(PUBLIC_KEY_ENV);
        if !public_key.trim().is_empty() {
            config.public_key = Some(public_key);
        }
        Ok(config)
    }

    /// Sets the API host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets a custom HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Sets the session lifetime configured for the application.
    pub fn with_session_lifetime(mut self, lifetime: Duration) -> Self {
        self.session_lifetime = Some(lifetime);
        self
    }

    /// Sets the provider public key published on the developer portal, replacing the
    /// key embedded for the environment (e.g. after a key rotation).
    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }
}

impl fmt::Debug for ApplicationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationConfig")
            .field("application_key", &"<redacted>")
            .field("market", &self.market)
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("session_lifetime", &self.session_lifetime)
            .field("public_key", &self.public_key.as_deref().unwrap_or("<embedded>"))
            .finish()
    }
}

/// Checks that an operation path is made of non-empty `[A-Za-z0-9_-]` segments.
fn validate_operation(operation: &str) -> Result<&str> {
    let trimmed = operation.trim_matches('/');
    let valid = !trimmed.is_empty()
        && trimmed.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        });

    if valid {
        Ok(trimmed)
    } else {
        Err(MpesaError::InvalidOperation(operation.to_string()))
    }
}

/// Picks the explicit application key, falling back to the environment value.
fn resolve_application_key(explicit: &str, fallback: Option<String>) -> Result<String> {
    if !explicit.trim().is_empty() {
        return Ok(explicit.to_string());
    }

    fallback
        .filter(|key| !key.trim().is_empty())
        .ok_or(MpesaError::MissingApplicationKey)
}

/// A registered M-Pesa application and its current session.
///
/// The session is replaced only through `&mut self`; share an `Application`
/// across tasks behind a lock.
pub struct Application {
    http_client: Client,
    environment: Environment,
    market: Market,
    application_key: String,
    base_url: String,
    public_key: String,
    session_lifetime: Option<Duration>,
    session: Option<Session>,
}

impl Application {
    /// Validates a configuration and builds an application without a session.
    ///
    /// # Errors
    ///
    /// * [`MpesaError::MissingMarket`] for an empty market code
    /// * [`MpesaError::InvalidMarket`] for a market code that is not a single
    ///   alphanumeric path segment
    /// * Any [`parse_public_key`] error for a custom public key
    /// * [`MpesaError::MissingApplicationKey`] when the key is empty and
    ///   `MPESA_APPLICATION_KEY` is unset or empty
    /// * [`MpesaError::UrlParseError`] for an invalid base URL
    ///
    /// # Examples
    ///
    /// ```
    /// use mpesa_rs::client::{Application, ApplicationConfig};
    /// use mpesa_rs::types::{Environment, Market};
    ///
    /// let config =
    ///     ApplicationConfig::new("my-api-key", Market::VodafoneGhana, Environment::Sandbox);
    /// let app = Application::new(config).unwrap();
    /// assert!(app.session_key().is_none());
    /// ```
    pub fn new(config: ApplicationConfig) -> Result<Self> {
        config.market.validate()?;

        let public_key = match config.public_key {
            Some(key) => key.trim().to_string(),
            None => config.environment.public_key().to_string(),
        };
        parse_public_key(&public_key)?;

        let application_key = resolve_application_key(
            &config.application_key,
            std::env::var(APPLICATION_KEY_ENV).ok(),
        )?;

        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(MpesaError::ConfigError(format!(
                "base URL cannot be a base: {}",
                config.base_url
            )));
        }

        Ok(Self {
            http_client: config.http_client,
            environment: config.environment,
            market: config.market,
            application_key,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            public_key,
            session_lifetime: config.session_lifetime,
            session: None,
        })
    }

    /// Builds an application and establishes its session.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mpesa_rs::client::{Application, ApplicationConfig};
    /// use mpesa_rs::types::{Environment, Market};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config =
    ///     ApplicationConfig::new("my-api-key", Market::VodacomTanzania, Environment::Sandbox);
    /// let app = Application::connect(config).await?;
    /// assert!(app.session_key().is_some());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: ApplicationConfig) -> Result<Self> {
        let mut app = Self::new(config)?;
        app.generate_session_key().await?;
        Ok(app)
    }

    /// Requests a new session key and stores it.
    ///
    /// On failure the previously stored session, if any, is left untouched.
    pub async fn generate_session_key(&mut self) -> Result<&Session> {
        let session = fetch_session(
            &self.http_client,
            &self.base_url,
            self.environment,
            &self.market,
            &self.public_key,
            &self.application_key,
            self.session_lifetime,
        )
        .await?;

        Ok(&*self.session.insert(session))
    }

    /// API environment of this application.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Market of this application.
    pub fn market(&self) -> &Market {
        &self.market
    }

    /// API host requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The current session, if one was established.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The current session key, if one was established.
    pub fn session_key(&self) -> Option<&str> {
        self.session.as_ref().map(Session::id)
    }

    /// Builds the URL of an operation under this application's environment and market.
    ///
    /// Each `/`-separated segment of `operation` must be non-empty and made of ASCII
    /// letters, digits, `_` or `-`; anything else is [`MpesaError::InvalidOperation`].
    ///
    /// # Examples
    ///
    /// ```
    /// use mpesa_rs::client::{Application, ApplicationConfig};
    /// use mpesa_rs::types::{Environment, Market};
    ///
    /// let config =
    ///     ApplicationConfig::new("key", Market::VodacomTanzania, Environment::Production);
    /// let app = Application::new(config).unwrap();
    /// assert_eq!(
    ///     app.endpoint("c2bPayment/singleStage").unwrap(),
    ///     "https://openapi.m-pesa.com/openapi/ipg/v2/vodacomTZN/c2bPayment/singleStage/"
    /// );
    /// assert!(app.endpoint("../../getSession").is_err());
    /// ```
    pub fn endpoint(&self, operation: &str) -> Result<String> {
        let operation = validate_operation(operation)?;
        Ok(format!(
            "{}/{}/ipg/v2/{}/{}/",
            self.base_url, self.environment, self.market, operation
        ))
    }

    fn bearer(&self) -> Result<String> {
        let session = self.session.as_ref().ok_or(MpesaError::NoSession)?;
        if session.is_expired() {
            return Err(MpesaError::SessionExpired);
        }
        Ok(format!("Bearer {}", session.id()))
    }

    /// Sends an authenticated request and returns the raw response.
    ///
    /// Sets `Content-Type: application/json`, `Authorization: Bearer {session key}`
    /// and `Origin: *`, and serializes `payload` as the JSON body.
    pub async fn execute<B>(
        &self,
        method: Method,
        url: &str,
        payload: Option<&B>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let bearer = self.bearer()?;

        let mut request = self
            .http_client
            .request(method.clone(), url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, bearer)
            .header(ORIGIN, "*");

        if let Some(payload) = payload {
            request = request.json(payload);
        }

        tracing::debug!(%method, %url, "sending request");

        Ok(request.send().await?)
    }

    /// Sends an authenticated request and decodes the JSON response into `T`.
    ///
    /// A non-2xx status yields [`MpesaError::ApiError`] with the raw body; use
    /// [`MpesaError::decode_body`] to read it as the provider's error shape.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mpesa_rs::client::{Application, ApplicationConfig};
    /// use mpesa_rs::types::{Environment, Market};
    /// use reqwest::Method;
    /// use serde_json::{json, Value};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config =
    ///     ApplicationConfig::new("my-api-key", Market::VodacomTanzania, Environment::Sandbox);
    /// let app = Application::connect(config).await?;
    ///
    /// let url = app.endpoint("queryTransactionStatus")?;
    /// let body = json!({"input_QueryReference": "000000000000000000001"});
    /// let status: Value = app.request(Method::GET, &url, Some(&body)).await?;
    /// println!("{}", status);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request<T, B>(&self, method: Method, url: &str, payload: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.execute(method, url, payload).await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), %url, "request failed");
            return Err(MpesaError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// A simpler convenience function for GET requests without a body.
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.request::<T, ()>(Method::GET, url, None).await
    }

    /// A simpler convenience function for POST requests.
    pub async fn post<T, B>(&self, url: &str, payload: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, url, Some(payload)).await
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("environment", &self.environment)
            .field("market", &self.market)
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
