//! Example session exchange.
//!
//! This example establishes a session with the M-Pesa OpenAPI and prints its status.
//!
//! Run with:
//! ```bash
//! cargo run --example session
//! ```
//!
//! Environment variables (a `.env` file is loaded if present):
//! - MPESA_APPLICATION_KEY: Application key from the developer portal
//! - MPESA_MARKET: Market code, e.g. vodacomTZN
//! - MPESA_ENVIRONMENT: sandbox or openapi
//! - MPESA_BASE_URL: Optional API host override

use mpesa_rs::client::{Application, ApplicationConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ApplicationConfig::from_env()?;

    println!("M-Pesa session example");
    println!("   Host:        {}", config.base_url);
    println!("   Environment: {}", config.environment);
    println!("   Market:      {}", config.market);
    println!();

    let app = match Application::connect(config).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Session request failed: {}", e);
            if let Some(body) = e.decode_body::<serde_json::Value>() {
                eprintln!("{}", serde_json::to_string_pretty(&body)?);
            }
            return Err(e.into());
        }
    };

    if let Some(session) = app.session() {
        println!("Session established at {}", session.established_at());
        println!("   {}", session.description());
    }

    Ok(())
}
