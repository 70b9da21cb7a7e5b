use crate::fixtures::{catalog_json, open, secs, FakeBroker, Reply};
use axum::http::Method;
use boss_client::{BrokerError, ClientConfig, ErrorKind};
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_server_errors_are_retried() {
    let broker = FakeBroker::start().await;
    broker.reply(
        Method::GET,
        "/v2/catalog",
        vec![
            Reply::text(500, "boom"),
            Reply::json(500, json!({"error": "InternalError", "description": "retry me"})),
            Reply::json(200, catalog_json()),
        ],
    );
    let (client, clock) = open(ClientConfig {
        max_retries: 2,
        ..broker.config()
    });

    let catalog = client.catalog().await.unwrap();
    assert_eq!(catalog.services.len(), 2);
    assert_eq!(clock.sleeps(), secs(&[1, 4]));
    assert_eq!(broker.requests().len(), 3);
}

#[tokio::test]
async fn test_retries_exhausted() {
    let broker = FakeBroker::start().await;
    broker.reply(Method::GET, "/v2/catalog", vec![Reply::text(503, "")]);
    let (client, clock) = open(ClientConfig {
        max_retries: 2,
        ..broker.config()
    });

    let err = client.catalog().await.unwrap_err();
    assert_eq!(broker.requests().len(), 3);
    assert_eq!(clock.sleeps(), secs(&[1, 4]));

    assert_eq!(err.api_error().map(|e| e.status), Some(503));
    assert_eq!(
        err.to_string(),
        "failed to get catalog: request failed after 3 attempts: \
         HTTPError: HTTP 503: 503 Service Unavailable"
    );
    match err {
        BrokerError::Context { source, .. } => {
            assert!(matches!(*source, BrokerError::Retries { attempts: 3, .. }))
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_default_budget_is_three_retries() {
    let broker = FakeBroker::start().await;
    broker.reply(Method::GET, "/b/status", vec![Reply::text(502, "bad gateway")]);
    let (client, clock) = broker.client();

    let err = client.status().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(clock.sleeps(), secs(&[1, 4, 9]));
    assert_eq!(broker.requests().len(), 4);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let broker = FakeBroker::start().await;
    broker.reply(
        Method::GET,
        "/v2/catalog",
        vec![
            Reply::json(404, json!({"error": "NotFound", "description": "no catalog"})),
            Reply::json(200, catalog_json()),
        ],
    );
    let (client, clock) = broker.client();

    let err = client.catalog().await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.kind(), ErrorKind::Api);
    assert!(!matches!(
        err,
        BrokerError::Context { ref source, .. } if matches!(**source, BrokerError::Retries { .. })
    ));
    assert_eq!(broker.requests().len(), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_not_retried() {
    let broker = FakeBroker::start().await;
    broker.reply(Method::GET, "/v2/catalog", vec![Reply::text(200, "<html>")]);
    let (client, clock) = broker.client();

    let err = client.catalog().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(broker.requests().len(), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_empty_body_decodes_to_default() {
    let broker = FakeBroker::start().await;
    broker.reply(Method::GET, "/v2/catalog", vec![Reply::text(200, "")]);
    let (client, _) = broker.client();

    let catalog = client.catalog().await.unwrap();
    assert!(catalog.services.is_empty());
}

#[tokio::test]
async fn test_redirect_status_is_an_error() {
    let broker = FakeBroker::start().await;
    broker.reply(Method::GET, "/b/status", vec![Reply::text(304, "")]);
    let (client, _) = broker.client();

    let err = client.status().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedStatus);
    assert_eq!(broker.requests().len(), 1);
}

#[tokio::test]
async fn test_connection_refused_is_retried() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let (client, clock) = open(ClientConfig {
        max_retries: 1,
        ..ClientConfig::new(url, "admin", "secret")
    });

    let err = client.catalog().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_retryable());
    assert!(err.to_string().contains("request failed after 2 attempts"));
    assert_eq!(clock.sleeps(), secs(&[1]));
}

#[tokio::test]
async fn test_cancelled_client_sends_nothing() {
    let broker = FakeBroker::start().await;
    broker.reply(Method::GET, "/v2/catalog", vec![Reply::json(200, catalog_json())]);
    let (client, clock) = broker.client();

    let token = CancellationToken::new();
    token.cancel();
    let cancelled = client.with_cancellation(token);

    let err = cancelled.catalog().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(broker.requests().is_empty());
    assert!(clock.sleeps().is_empty());

    // The original handle is unaffected.
    client.catalog().await.unwrap();
}
