//! Signaling channel integration tests
//!
//! Two clients sharing one in-memory store, exercising the command
//! streams, the state machine, dispose ordering, and write-failure
//! propagation.

use async_trait::async_trait;
use flexcall_core::{
    CallSessionState, OngoingCallRecord, SequencedEnvelope, SignalingCommand, SignalingStore,
};
use flexcall_webrtc::{MemorySignalingStore, SignalingClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

const CONVERSATION: &str = "conv-1";

fn pair(store: &Arc<MemorySignalingStore>) -> (SignalingClient, SignalingClient) {
    let alice = SignalingClient::new(Arc::clone(store) as Arc<dyn SignalingStore>, "alice");
    let bob = SignalingClient::new(Arc::clone(store) as Arc<dyn SignalingStore>, "bob");
    (alice, bob)
}

#[tokio::test]
async fn test_offer_reaches_peer_with_prefix_stripped() {
    let store = Arc::new(MemorySignalingStore::new());
    let (alice, bob) = pair(&store);

    bob.observe(CONVERSATION).await.unwrap();
    let mut commands = bob.commands();

    alice
        .send_command(SignalingCommand::Offer, "v=0 fake-sdp", CONVERSATION, "alice")
        .await;

    let (command, payload) = timeout(Duration::from_secs(2), commands.recv())
        .await
        .expect("command within two seconds")
        .unwrap();
    assert_eq!(command, SignalingCommand::Offer);
    assert_eq!(payload, "v=0 fake-sdp");
}

#[tokio::test]
async fn test_own_writes_are_not_echoed_back() {
    let store = Arc::new(MemorySignalingStore::new());
    let (alice, _bob) = pair(&store);

    alice.observe(CONVERSATION).await.unwrap();
    let mut commands = alice.commands();

    alice
        .send_command(SignalingCommand::Offer, "v=0", CONVERSATION, "alice")
        .await;

    assert!(timeout(Duration::from_millis(300), commands.recv()).await.is_err());
}

#[tokio::test]
async fn test_state_messages_drive_both_state_streams() {
    let store = Arc::new(MemorySignalingStore::new());
    let (alice, bob) = pair(&store);

    bob.observe(CONVERSATION).await.unwrap();
    let mut bob_state = bob.session_state();
    assert_eq!(*bob_state.borrow(), CallSessionState::Offline);

    alice
        .send_command(SignalingCommand::State, "Creating", CONVERSATION, "alice")
        .await;

    // The sender transitions locally without waiting for the echo.
    assert_eq!(alice.current_state(), CallSessionState::Creating);

    timeout(
        Duration::from_secs(2),
        bob_state.wait_for(|state| *state == CallSessionState::Creating),
    )
    .await
    .expect("bob reaches Creating")
    .unwrap();
}

#[tokio::test]
async fn test_commands_in_send_order() {
    let store = Arc::new(MemorySignalingStore::new());
    let (alice, bob) = pair(&store);

    bob.observe(CONVERSATION).await.unwrap();
    let mut commands = bob.commands();

    alice
        .send_command(SignalingCommand::Offer, "v=0", CONVERSATION, "alice")
        .await;
    alice
        .send_command(SignalingCommand::Ice, "0$0$candidate:1", CONVERSATION, "alice")
        .await;
    alice
        .send_command(SignalingCommand::Ice, "0$0$candidate:2", CONVERSATION, "alice")
        .await;

    let mut received = Vec::new();
    for _ in 0..3 {
        let (command, payload) = timeout(Duration::from_secs(2), commands.recv())
            .await
            .expect("command within two seconds")
            .unwrap();
        received.push((command, payload));
    }
    assert_eq!(received[0].0, SignalingCommand::Offer);
    assert_eq!(received[1].1, "0$0$candidate:1");
    assert_eq!(received[2].1, "0$0$candidate:2");
}

#[tokio::test]
async fn test_dispose_goes_offline_before_deleting() {
    let store = Arc::new(MemorySignalingStore::new());
    let (alice, _bob) = pair(&store);

    alice
        .send_command(SignalingCommand::State, "Active", CONVERSATION, "alice")
        .await;
    assert_eq!(alice.current_state(), CallSessionState::Active);

    // Let the fire-and-forget write land before tearing down.
    timeout(Duration::from_secs(2), async {
        while store.is_empty(CONVERSATION).await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("state write lands");

    alice.dispose();

    // The state reset is synchronous; deletion is issued asynchronously.
    assert_eq!(alice.current_state(), CallSessionState::Offline);

    timeout(Duration::from_secs(2), async {
        loop {
            if store.is_empty(CONVERSATION).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("record deleted after dispose");
}

#[tokio::test]
async fn test_dispose_from_any_state_resets_to_offline() {
    for state in ["Creating", "Ready", "Impossible"] {
        let store = Arc::new(MemorySignalingStore::new());
        let (alice, _bob) = pair(&store);
        alice
            .send_command(SignalingCommand::State, state, CONVERSATION, "alice")
            .await;
        alice.dispose();
        assert_eq!(alice.current_state(), CallSessionState::Offline);
    }
}

/// Store whose writes always fail
struct FailingStore;

#[async_trait]
impl SignalingStore for FailingStore {
    async fn append(&self, _sender_id: &str, _record: OngoingCallRecord) -> flexcall_core::Result<u64> {
        Err(flexcall_core::Error::TransportWrite("store unavailable".to_string()))
    }

    async fn latest(
        &self,
        _conversation_id: &str,
    ) -> flexcall_core::Result<Option<SequencedEnvelope>> {
        Ok(None)
    }

    async fn delete(&self, _conversation_id: &str) -> flexcall_core::Result<()> {
        Ok(())
    }

    async fn subscribe(
        &self,
        _conversation_id: &str,
    ) -> flexcall_core::Result<broadcast::Receiver<SequencedEnvelope>> {
        Ok(broadcast::channel(1).1)
    }
}

#[tokio::test]
async fn test_failed_write_drives_state_to_failed() {
    let client = SignalingClient::new(Arc::new(FailingStore), "alice");
    let mut state = client.session_state();

    client
        .send_command(SignalingCommand::Offer, "v=0", CONVERSATION, "alice")
        .await;

    timeout(
        Duration::from_secs(2),
        state.wait_for(|state| *state == CallSessionState::Failed),
    )
    .await
    .expect("write failure surfaces as Failed")
    .unwrap();
}
