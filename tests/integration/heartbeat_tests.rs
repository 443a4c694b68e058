//! Keepalive pings and the idle timeout.

use std::time::Duration;

use agent_hub::config::GlobalConfig;
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use super::test_helpers::spawn_hub;

fn fast_heartbeat() -> GlobalConfig {
    GlobalConfig::from_toml_str(
        r#"
host = "127.0.0.1"
http_port = 0

[session]
send_timeout_ms = 200
heartbeat_interval_seconds = 1
idle_timeout_seconds = 2
"#,
    )
    .expect("valid config")
}

#[tokio::test]
async fn silent_client_is_dropped_after_idle_timeout() {
    let hub = spawn_hub(fast_heartbeat()).await;
    let _silent = hub.connect_agent("quiet").await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while hub.state.registry.lookup("quiet").is_some() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "idle client was never dropped"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn reading_client_answers_pings_and_stays_connected() {
    let hub = spawn_hub(fast_heartbeat()).await;
    let mut socket = hub.connect_agent("chatty").await;

    // Reading drives tungstenite's automatic pong replies.
    let mut pings = 0;
    let _ = tokio::time::timeout(Duration::from_secs(3), async {
        while let Some(Ok(message)) = socket.next().await {
            if matches!(message, Message::Ping(_)) {
                pings += 1;
            }
        }
    })
    .await;

    assert!(pings >= 2, "expected periodic pings, saw {pings}");
    assert!(hub.state.registry.lookup("chatty").is_some());
}
