//! # mpesa-rs
//!
//! A Rust client for the M-Pesa OpenAPI, Vodacom/Vodafone's mobile-money payment API.
//!
//! The crate covers the part every payment operation depends on: authenticating an
//! application and obtaining the session key that authorises the rest of the API calls.
//!
//! ## Features
//!
//! - **Key Encryption**: RSA PKCS#1 v1.5 encryption of the application key with the
//!   provider's public key
//! - **Session Exchange**: `getSession` call with response-code validation
//! - **Authenticated Requests**: JSON requests carrying the session key, with the raw
//!   error body preserved on failure
//! - **Version Reporting**: semantic version with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mpesa_rs::client::{Application, ApplicationConfig};
//! use mpesa_rs::types::{Environment, Market};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ApplicationConfig::new(
//!     "YOUR_APPLICATION_KEY",
//!     Market::VodacomTanzania,
//!     Environment::Sandbox,
//! );
//!
//! let app = Application::connect(config).await?;
//! println!("Session established: {:?}", app.session());
//! # Ok(())
//! # }
//! ```
//!
//! An empty application key is accepted as long as `MPESA_APPLICATION_KEY` is set.
//!
//! ## Session Flow
//!
//! 1. **Encrypt**: the application key is encrypted with the environment's public key
//! 2. **Exchange**: `GET /{environment}/ipg/v2/{market}/getSession/` with the
//!    encrypted key as bearer token
//! 3. **Validate**: the response code must be `INS-0`
//! 4. **Use**: every later request carries `Authorization: Bearer {session key}`
//!
//! The session key is never refreshed behind your back. Call
//! [`Application::generate_session_key`](client::Application::generate_session_key)
//! to replace it.
//!
//! ## References
//!
//! - [M-Pesa OpenAPI portal](https://openapiportal.m-pesa.com)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod crypto;
pub mod errors;
pub mod session;
pub mod types;
pub mod version;

// Re-export commonly used items
pub use client::{Application, ApplicationConfig};
pub use errors::{MpesaError, Result};
pub use session::Session;
pub use types::{Environment, Market, SessionResponse, BASE_URL};
pub use version::{version, DevStage, Version};
