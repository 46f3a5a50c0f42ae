//! Server Startup Tests
//!
//! State construction, fail-fast configuration, and serving over a real socket.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{body::Body, http::Request};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tower::util::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use nls_tts_proxy::{NlsError, ServerConfig, SynthesisOptions, Transport, routes, state::AppState};

/// Helper function to create a minimal test configuration
fn create_minimal_config(token_url: &str, tts_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tls: None,
        access_key_id: "test-access-key-id".to_string(),
        access_key_secret: "test-access-key-secret".to_string(),
        app_key: "test-app-key".to_string(),
        nls_region: "cn-shanghai".to_string(),
        nls_token_url: token_url.to_string(),
        nls_tts_url: tts_url.to_string(),
        request_timeout_seconds: 5,
        token_cache: true,
        tts_transport: Transport::Post,
        tts_defaults: SynthesisOptions::default(),
        cors_allowed_origins: None,
        rate_limit_requests_per_second: 100000,
        rate_limit_burst_size: 100,
    }
}

fn default_config() -> ServerConfig {
    create_minimal_config(
        "https://nls-meta.cn-shanghai.aliyuncs.com/",
        "https://nls-gateway.cn-shanghai.aliyuncs.com/stream/v1/tts",
    )
}

/// State builds without touching the network
#[tokio::test]
async fn test_minimal_config_boot() {
    let app_state = AppState::new(default_config()).unwrap();
    let app = routes::api::create_api_router().with_state(app_state);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn test_blank_credentials_fail_fast() {
    let mut config = default_config();
    config.app_key = String::new();

    assert!(matches!(
        AppState::new(config),
        Err(NlsError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_invalid_endpoint_fails_fast() {
    let config = create_minimal_config(
        "https://nls-meta.cn-shanghai.aliyuncs.com/?Action=CreateToken",
        "https://nls-gateway.cn-shanghai.aliyuncs.com/stream/v1/tts",
    );

    assert!(matches!(
        AppState::new(config),
        Err(NlsError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_address_parsing() {
    let mut config = default_config();
    config.port = 8000;
    let addr: SocketAddr = config.address().parse().unwrap();
    assert_eq!(addr.port(), 8000);
}

/// Audio reaches a real HTTP client through a bound listener
#[tokio::test]
async fn test_serves_audio_over_tcp() {
    let token_server = MockServer::start().await;
    let tts_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"Token": {"Id": "tok-123"}})),
        )
        .mount(&token_server)
        .await;
    let audio: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(audio.clone(), "audio/mpeg"))
        .mount(&tts_server)
        .await;

    let config = create_minimal_config(
        &token_server.uri(),
        &format!("{}/stream/v1/tts", tts_server.uri()),
    );
    let app = routes::api::create_api_router().with_state(AppState::new(config).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    let response = timeout(
        Duration::from_secs(5),
        reqwest::get(format!("http://{addr}/speak?text=%E4%BD%A0%E5%A5%BD")),
    )
    .await
    .expect("request should complete")
    .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "audio/mpeg");
    assert_eq!(response.bytes().await.unwrap().to_vec(), audio);

    server.abort();
}

/// Concurrent requests share one state
#[tokio::test]
async fn test_concurrent_request_handling() {
    let app_state = AppState::new(default_config()).unwrap();
    let app = routes::api::create_api_router().with_state(app_state);

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                let request = Request::builder().uri("/").body(Body::empty()).unwrap();
                let response = app.oneshot(request).await.unwrap();
                response.status()
            })
        })
        .collect();

    for task in tasks {
        let status = task.await.expect("Task should complete");
        assert_eq!(status, axum::http::StatusCode::OK);
    }
}
