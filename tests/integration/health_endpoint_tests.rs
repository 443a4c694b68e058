use std::time::Duration;

use super::test_helpers::{spawn_hub, test_config};

#[tokio::test]
async fn health_returns_ok() {
    let hub = spawn_hub(test_config()).await;

    let response = reqwest::get(format!("{}/health", hub.http_url()))
        .await
        .expect("GET /health");
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.expect("body"), "ok");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let hub = spawn_hub(test_config()).await;

    let response = reqwest::get(format!("{}/nope", hub.http_url()))
        .await
        .expect("GET /nope");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn cancellation_stops_the_server() {
    let hub = spawn_hub(test_config()).await;
    let _agent = hub.connect_agent("a").await;
    hub.ct.cancel();

    let url = format!("{}/health", hub.http_url());
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(300))
        .build()
        .expect("client");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        if client.get(&url).send().await.is_err() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "server still answering after shutdown"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
