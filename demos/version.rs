//! Prints the library version.
//!
//! `MAJOR_VERSION`, `MINOR_VERSION`, `PATCH_VERSION`, `DEV_STAGE` and `STAGE_ITERATION`
//! override the compiled-in defaults; a `.env` file is loaded if present.
//!
//! ```bash
//! cargo run --example version
//! ```

fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("No .env file loaded: {}", e);
    }
    tracing_subscriber::fmt::init();

    let version = mpesa_rs::Version::from_env();
    println!("{} ({})", version, version.stage);
}
