//! Integration tests for the mpesa-rs library.
//!
//! These tests run the session exchange and authenticated requests against an
//! in-process mock of the M-Pesa OpenAPI.

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use mpesa_rs::{
    client::{Application, ApplicationConfig},
    errors::MpesaError,
    types::{Environment, Market},
};
use rsa::pkcs8::EncodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};

const SESSION_PATH: &str = "/sandbox/ipg/v2/vodacomTZN/getSession/";

async fn spawn_provider(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config(base_url: &str) -> ApplicationConfig {
    ApplicationConfig::new("test-application-key", Market::VodacomTanzania, Environment::Sandbox)
        .with_base_url(base_url)
}

fn accepted_session(id: &str) -> Value {
    json!({
        "output_ResponseCode": "INS-0",
        "output_ResponseDesc": "Request processed successfully",
        "output_SessionID": id,
    })
}

#[tokio::test]
async fn test_session_exchange_success() {
    let seen: Arc<Mutex<Vec<HeaderMap>>> = Arc::default();
    let recorder = seen.clone();
    let router = Router::new().route(
        SESSION_PATH,
        get(move |headers: HeaderMap| {
            let recorder = recorder.clone();
            async move {
                recorder.lock().unwrap().push(headers);
                Json(accepted_session("session-1"))
            }
        }),
    );
    let base_url = spawn_provider(router).await;

    let app = Application::connect(config(&base_url)).await.unwrap();
    assert_eq!(app.session_key(), Some("session-1"));
    assert_eq!(
        app.session().unwrap().description(),
        "Request processed successfully"
    );

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let headers = &seen[0];
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["origin"], "*");

    let authorization = headers["authorization"].to_str().unwrap();
    let encrypted = authorization.strip_prefix("Bearer ").unwrap();
    // 4096-bit sandbox key
    assert_eq!(BASE64.decode(encrypted).unwrap().len(), 512);
    assert!(!authorization.contains("test-application-key"));
}

#[tokio::test]
async fn test_session_exchange_with_custom_public_key() {
    let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
    let public_key = BASE64.encode(private_key.to_public_key().to_public_key_der().unwrap().as_bytes());

    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let recorder = seen.clone();
    let router = Router::new().route(
        SESSION_PATH,
        get(move |headers: HeaderMap| {
            let recorder = recorder.clone();
            async move {
                let authorization = headers["authorization"].to_str().unwrap().to_string();
                recorder.lock().unwrap().push(authorization);
                Json(accepted_session("rotated"))
            }
        }),
    );
    let base_url = spawn_provider(router).await;

    let app = Application::connect(config(&base_url).with_public_key(public_key))
        .await
        .unwrap();
    assert_eq!(app.session_key(), Some("rotated"));

    let seen = seen.lock().unwrap();
    let encrypted = seen[0].strip_prefix("Bearer ").unwrap();
    let ciphertext = BASE64.decode(encrypted).unwrap();
    // 1024-bit key
    assert_eq!(ciphertext.len(), 128);
    let plaintext = private_key.decrypt(Pkcs1v15Encrypt, &ciphertext).unwrap();
    assert_eq!(plaintext, b"test-application-key");
}

#[tokio::test]
async fn test_market_with_path_segments_never_reaches_provider() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let router = Router::new().route(
        "/sandbox/evil/getSession/",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(accepted_session("hijacked"))
            }
        }),
    );
    let base_url = spawn_provider(router).await;
    let code = "vodacomTZN/../../../evil";

    assert!(matches!(
        code.parse::<Market>(),
        Err(MpesaError::InvalidMarket(c)) if c == code
    ));

    let config = ApplicationConfig::new("key", Market::Other(code.into()), Environment::Sandbox)
        .with_base_url(&base_url);
    let err = Application::connect(config).await.unwrap_err();
    assert!(matches!(err, MpesaError::InvalidMarket(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_session_exchange_server_error() {
    let router = Router::new().route(
        SESSION_PATH,
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream unavailable") }),
    );
    let base_url = spawn_provider(router).await;

    let mut app = Application::new(config(&base_url)).unwrap();
    let err = app.generate_session_key().await.unwrap_err();

    match err {
        MpesaError::ApiError { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(app.session_key().is_none());
}

#[tokio::test]
async fn test_session_exchange_rejected_code() {
    let router = Router::new().route(
        SESSION_PATH,
        get(|| async {
            Json(json!({
                "output_ResponseCode": "INS-2051",
                "output_ResponseDesc": "Invalid API Key",
                "output_SessionID": "",
            }))
        }),
    );
    let base_url = spawn_provider(router).await;

    let err = Application::connect(config(&base_url)).await.unwrap_err();
    match err {
        MpesaError::SessionRejected { code, description } => {
            assert_eq!(code, "INS-2051");
            assert_eq!(description, "Invalid API Key");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_session_exchange_malformed_body() {
    let router = Router::new().route(SESSION_PATH, get(|| async { "<html>maintenance</html>" }));
    let base_url = spawn_provider(router).await;

    let mut app = Application::new(config(&base_url)).unwrap();
    let err = app.generate_session_key().await.unwrap_err();
    assert!(matches!(err, MpesaError::JsonError(_)));
    assert!(app.session().is_none());
}

#[tokio::test]
async fn test_session_exchange_unreachable_host() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut app = Application::new(config(&format!("http://{}", addr))).unwrap();
    let err = app.generate_session_key().await.unwrap_err();
    assert!(matches!(err, MpesaError::HttpError(_)));
    assert!(app.session_key().is_none());
}

#[tokio::test]
async fn test_failed_regeneration_keeps_session() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let router = Router::new().route(
        SESSION_PATH,
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    (StatusCode::OK, Json(accepted_session("first")))
                } else {
                    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})))
                }
            }
        }),
    );
    let base_url = spawn_provider(router).await;

    let mut app = Application::connect(config(&base_url)).await.unwrap();
    assert!(app.generate_session_key().await.is_err());
    assert_eq!(app.session_key(), Some("first"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_authenticated_request() {
    let seen: Arc<Mutex<Vec<(HeaderMap, Value)>>> = Arc::default();
    let recorder = seen.clone();
    let router = Router::new()
        .route(SESSION_PATH, get(|| async { Json(accepted_session("session-42")) }))
        .route(
            "/sandbox/ipg/v2/vodacomTZN/c2bPayment/singleStage/",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let recorder = recorder.clone();
                async move {
                    let reply = json!({
                        "output_ResponseCode": "INS-0",
                        "output_ThirdPartyConversationID": body["input_ThirdPartyConversationID"],
                    });
                    recorder.lock().unwrap().push((headers, body));
                    Json(reply)
                }
            }),
        );
    let base_url = spawn_provider(router).await;
    let app = Application::connect(config(&base_url)).await.unwrap();

    let url = app.endpoint("c2bPayment/singleStage").unwrap();
    let payload = json!({
        "input_Amount": "10",
        "input_ThirdPartyConversationID": "asv02e5958774f7ba228d83d0d689761",
    });
    let response: Value = app.post(&url, &payload).await.unwrap();
    assert_eq!(
        response["output_ThirdPartyConversationID"],
        "asv02e5958774f7ba228d83d0d689761"
    );

    let seen = seen.lock().unwrap();
    let (headers, body) = &seen[0];
    assert_eq!(body, &payload);
    assert_eq!(headers["authorization"], "Bearer session-42");
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["origin"], "*");
}

#[tokio::test]
async fn test_request_error_body_is_recoverable() {
    let router = Router::new()
        .route(SESSION_PATH, get(|| async { Json(accepted_session("session-7")) }))
        .route(
            "/sandbox/ipg/v2/vodacomTZN/queryTransactionStatus/",
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "output_ResponseCode": "INS-996",
                        "output_ResponseDesc": "Customer's account is not active",
                    })),
                )
            }),
        );
    let base_url = spawn_provider(router).await;
    let app = Application::connect(config(&base_url)).await.unwrap();

    let err = app
        .get::<Value>(&app.endpoint("queryTransactionStatus").unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    let body: Value = err.decode_body().unwrap();
    assert_eq!(body["output_ResponseCode"], "INS-996");
}

#[tokio::test]
async fn test_expired_session_blocks_requests() {
    let router =
        Router::new().route(SESSION_PATH, get(|| async { Json(accepted_session("short")) }));
    let base_url = spawn_provider(router).await;

    let config = config(&base_url).with_session_lifetime(std::time::Duration::ZERO);
    let app = Application::connect(config).await.unwrap();
    assert!(app.session().unwrap().is_expired());

    let url = app.endpoint("anything").unwrap();
    let err = app.get::<Value>(&url).await.unwrap_err();
    assert!(matches!(err, MpesaError::SessionExpired));
}

// Only test in this binary that touches MPESA_* variables.
#[test]
fn test_application_key_from_environment() {
    std::env::remove_var("MPESA_APPLICATION_KEY");
    std::env::remove_var("MPESA_PUBLIC_KEY");
    let empty_key = ApplicationConfig::new("", Market::VodafoneGhana, Environment::Production);
    assert!(matches!(
        Application::new(empty_key.clone()),
        Err(MpesaError::MissingApplicationKey)
    ));

    std::env::set_var("MPESA_APPLICATION_KEY", "key-from-env");
    assert!(Application::new(empty_key).is_ok());

    std::env::set_var("MPESA_MARKET", "vodafoneGHA");
    std::env::set_var("MPESA_ENVIRONMENT", "openapi");
    std::env::set_var("MPESA_BASE_URL", "http://127.0.0.1:4000");
    let config = ApplicationConfig::from_env().unwrap();
    assert_eq!(config.application_key, "key-from-env");
    assert_eq!(config.market, Market::VodafoneGhana);
    assert_eq!(config.environment, Environment::Production);
    assert_eq!(config.base_url, "http://127.0.0.1:4000");
    assert!(config.public_key.is_none());

    std::env::set_var("MPESA_PUBLIC_KEY", Environment::Sandbox.public_key());
    let config = ApplicationConfig::from_env().unwrap();
    assert_eq!(config.public_key.as_deref(), Some(Environment::Sandbox.public_key()));

    std::env::set_var("MPESA_ENVIRONMENT", "");
    assert!(matches!(
        ApplicationConfig::from_env(),
        Err(MpesaError::MissingEnvironment)
    ));

    for name in [
        "MPESA_APPLICATION_KEY",
        "MPESA_MARKET",
        "MPESA_ENVIRONMENT",
        "MPESA_BASE_URL",
        "MPESA_PUBLIC_KEY",
    ] {
        std::env::remove_var(name);
    }
}

#[test]
fn test_construction_requires_market_and_environment() {
    assert!(matches!(
        ApplicationConfig::parse("key", "vodacomTZN", ""),
        Err(MpesaError::MissingEnvironment)
    ));
    assert!(matches!(
        ApplicationConfig::parse("key", "", "sandbox"),
        Err(MpesaError::MissingMarket)
    ));
}

#[test]
fn test_version_reporting() {
    use mpesa_rs::version::{DevStage, Version};

    assert_eq!(Version::new(2, 5, 8, DevStage::Release, 0).to_string(), "2.5.8");
    assert_eq!(Version::new(1, 4, 8, DevStage::Alpha, 2).to_string(), "1.4.8-a.2");
}

#[test]
fn test_error_types() {
    let err = MpesaError::MissingApplicationKey;
    assert_eq!(err.to_string(), "Missing application key");

    let err = MpesaError::NotRsaKey("1.2.840.10045.2.1".to_string());
    assert_eq!(err.to_string(), "Public key is not an RSA key (algorithm 1.2.840.10045.2.1)");
}
