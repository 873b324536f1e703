#![cfg(unix)]

use std::sync::Arc;

use cmdbridge_app::{CommandBridge, HostDispatcher, JsonDocumentStore, LoggingNotificationHandler};
use cmdbridge_config::BridgeConfig;
use cmdbridge_domain::{ClientMessage, ExecutionResult, HostMessage, SPAWN_FAILURE_CODE};
use cmdbridge_infra::{MemoryChannel, ShellCommandRunner};
use pretty_assertions::assert_eq;
use serde_json::json;

fn connect(config: &BridgeConfig) -> Arc<CommandBridge<MemoryChannel<ClientMessage>>> {
    let (client_sink, client_receiver) = MemoryChannel::<ClientMessage>::pair();
    let (host_sink, host_receiver) = MemoryChannel::<HostMessage>::pair();

    let bridge = Arc::new(CommandBridge::from_config(client_sink, config));
    let dispatcher = HostDispatcher::new(
        Arc::new(ShellCommandRunner::from_config(config)),
        Arc::new(host_sink),
        Arc::new(LoggingNotificationHandler),
    );

    tokio::spawn(async move { dispatcher.run(client_receiver).await });
    let receiver_bridge = bridge.clone();
    tokio::spawn(async move { receiver_bridge.run_receiver(host_receiver).await });

    bridge
}

#[tokio::test]
async fn test_echo_through_real_shell() {
    let bridge = connect(&BridgeConfig::default());

    let actual = bridge.execute_command("echo hi").await.unwrap();

    let expected = ExecutionResult::new("echo hi")
        .request_id(actual.request_id.unwrap())
        .stdout("hi\n");
    assert_eq!(actual, expected);
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test]
async fn test_concurrent_failures_keep_their_own_results() {
    let bridge = connect(&BridgeConfig::default());

    let (slow, fast) = tokio::join!(
        bridge.execute_command("sleep 0.2; echo slow 1>&2; exit 4"),
        bridge.execute_command("echo fast 1>&2; false"),
    );

    let slow = slow.unwrap();
    let fast = fast.unwrap();
    assert_eq!(slow.stderr.as_deref(), Some("slow\n"));
    assert_eq!(slow.error_code, Some(4));
    assert_eq!(fast.stderr.as_deref(), Some("fast\n"));
    assert_eq!(fast.error_code, Some(1));
    assert_ne!(slow.request_id, fast.request_id);
}

#[tokio::test]
async fn test_host_timeout_surfaces_as_failed_result() {
    let config = BridgeConfig::default().command_timeout_ms(50u64);
    let bridge = connect(&config);

    let actual = bridge.execute_command("sleep 5").await.unwrap();

    assert_eq!(actual.error_code, Some(SPAWN_FAILURE_CODE));
    assert!(actual.stderr.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_document_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    let bridge = connect(&BridgeConfig::default());
    let store = JsonDocumentStore::new(bridge, path.to_string_lossy());
    let fixture = json!({
        "stages": [{"name": "dev", "branch": "feature/it's-done"}, {"name": "prod"}]
    });

    let before = store.exists().await.unwrap();
    store.write(&fixture).await.unwrap();
    let after = store.exists().await.unwrap();
    let actual: serde_json::Value = store.read().await.unwrap();

    assert!(!before);
    assert!(after);
    assert_eq!(actual, fixture);
}
