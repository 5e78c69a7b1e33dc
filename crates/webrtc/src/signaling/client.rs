//! Signaling client over the shared ongoing-call record

use crate::Result;
use flexcall_core::envelope::{self, SignalingCommand};
use flexcall_core::{CallSessionState, OngoingCallRecord, SequencedEnvelope, SignalingStore};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Command fan-out depth per call
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Outbound writes waiting on the store
const WRITE_QUEUE_CAPACITY: usize = 64;

struct Observation {
    conversation_id: String,
    task: JoinHandle<()>,
}

/// Maps local session activity to store writes and remote store updates
/// back into typed events
///
/// State is exposed watch-style (current value visible to every new
/// subscriber); commands are exposed broadcast-style (late subscribers
/// only see subsequent emissions). Writes are fire-and-forget for the
/// caller but serialized through one writer task, so envelopes reach the
/// store in `send_command` order.
pub struct SignalingClient {
    /// Local participant; envelopes this client wrote are dropped on the
    /// observe path instead of being re-dispatched as remote commands.
    local_peer_id: String,
    store: Arc<dyn SignalingStore>,
    state_tx: watch::Sender<CallSessionState>,
    command_tx: broadcast::Sender<(SignalingCommand, String)>,
    observation: Mutex<Option<Observation>>,
    write_tx: Mutex<Option<mpsc::Sender<OngoingCallRecord>>>,
}

impl SignalingClient {
    pub fn new(store: Arc<dyn SignalingStore>, local_peer_id: impl Into<String>) -> Self {
        let (state_tx, _) = watch::channel(CallSessionState::Offline);
        let (command_tx, _) = broadcast::channel(COMMAND_CHANNEL_CAPACITY);
        Self {
            local_peer_id: local_peer_id.into(),
            store,
            state_tx,
            command_tx,
            observation: Mutex::new(None),
            write_tx: Mutex::new(None),
        }
    }

    /// Session-state stream for subscribers
    pub fn session_state(&self) -> watch::Receiver<CallSessionState> {
        self.state_tx.subscribe()
    }

    /// The state as of this call
    pub fn current_state(&self) -> CallSessionState {
        *self.state_tx.borrow()
    }

    /// Remote command stream: `(command, payload)` with the prefix stripped
    pub fn commands(&self) -> broadcast::Receiver<(SignalingCommand, String)> {
        self.command_tx.subscribe()
    }

    /// Start observing a conversation's signaling log
    ///
    /// Re-observing the current conversation is a no-op; observing a new
    /// one replaces the subscription.
    pub async fn observe(&self, conversation_id: &str) -> Result<()> {
        {
            let observation = self.observation.lock();
            if observation
                .as_ref()
                .is_some_and(|current| current.conversation_id == conversation_id)
            {
                return Ok(());
            }
        }

        let envelopes = self.store.subscribe(conversation_id).await?;
        debug!("Observing signaling for conversation {conversation_id}");
        let task = tokio::spawn(observe_loop(
            envelopes,
            self.local_peer_id.clone(),
            self.state_tx.clone(),
            self.command_tx.clone(),
        ));

        let mut observation = self.observation.lock();
        if let Some(previous) = observation.replace(Observation {
            conversation_id: conversation_id.to_string(),
            task,
        }) {
            previous.task.abort();
        }
        Ok(())
    }

    /// Append one signaling envelope to the conversation's record
    ///
    /// Fire-and-forget for the caller: the write is queued to the writer
    /// task and this returns immediately. A failed write is logged and
    /// drives the session state to [`CallSessionState::Failed`] so the
    /// UI never hangs in `Creating` with nothing but a log line to show
    /// for it.
    pub async fn send_command(
        &self,
        command: SignalingCommand,
        payload: &str,
        conversation_id: &str,
        call_initiator_id: &str,
    ) {
        debug!("[send_command] {command} {payload}");
        if let Err(e) = self.observe(conversation_id).await {
            error!("Failed to observe conversation {conversation_id}: {e}");
        }

        // A STATE write also transitions the local stream; the echo of
        // our own envelope is filtered out on the observe path.
        if command == SignalingCommand::State {
            match payload.parse::<CallSessionState>() {
                Ok(state) => {
                    let _ = self.state_tx.send(state);
                }
                Err(e) => warn!("Refusing to publish unknown state: {e}"),
            }
        }

        let record = OngoingCallRecord::new(command, payload, conversation_id, call_initiator_id);
        if self.writer().try_send(record).is_err() {
            error!("Signaling write queue unavailable, dropping {command}");
            let _ = self.state_tx.send(CallSessionState::Failed);
        }
    }

    /// The serializing writer task's queue, started on first use
    fn writer(&self) -> mpsc::Sender<OngoingCallRecord> {
        let mut guard = self.write_tx.lock();
        if let Some(tx) = guard.as_ref() {
            return tx.clone();
        }

        let (tx, mut rx) = mpsc::channel::<OngoingCallRecord>(WRITE_QUEUE_CAPACITY);
        let store = Arc::clone(&self.store);
        let sender_id = self.local_peer_id.clone();
        let state_tx = self.state_tx.clone();
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                let command = record.signaling_command.clone();
                match store.append(&sender_id, record).await {
                    Ok(sequence) => debug!("Sent {command} at sequence {sequence}"),
                    Err(e) => {
                        error!("Signaling write failed: {e}");
                        let _ = state_tx.send(CallSessionState::Failed);
                    }
                }
            }
        });

        *guard = Some(tx.clone());
        tx
    }

    /// Tear the channel down
    ///
    /// The state stream is reset to Offline *before* record deletion is
    /// issued; deletion itself is fire-and-forget (the record is keyed
    /// by conversation id, a later call simply starts a fresh log).
    /// Queued-but-unwritten envelopes are dropped with the writer.
    pub fn dispose(&self) {
        let _ = self.state_tx.send(CallSessionState::Offline);
        drop(self.write_tx.lock().take());

        if let Some(observation) = self.observation.lock().take() {
            let store = Arc::clone(&self.store);
            let conversation_id = observation.conversation_id;
            tokio::spawn(async move {
                if let Err(e) = store.delete(&conversation_id).await {
                    error!("Failed to delete ongoing-call record for {conversation_id}: {e}");
                }
            });
            observation.task.abort();
        }
    }
}

impl Drop for SignalingClient {
    fn drop(&mut self) {
        if let Some(observation) = self.observation.lock().take() {
            observation.task.abort();
        }
    }
}

async fn observe_loop(
    mut envelopes: broadcast::Receiver<SequencedEnvelope>,
    local_peer_id: String,
    state_tx: watch::Sender<CallSessionState>,
    command_tx: broadcast::Sender<(SignalingCommand, String)>,
) {
    let mut last_sequence = 0u64;
    loop {
        match envelopes.recv().await {
            Ok(envelope) => {
                if last_sequence != 0 && envelope.sequence > last_sequence + 1 {
                    warn!(
                        "Signaling sequence gap for conversation {}: {} -> {}",
                        envelope.record.conversation_id, last_sequence, envelope.sequence
                    );
                }
                last_sequence = last_sequence.max(envelope.sequence);

                if envelope.sender_id == local_peer_id {
                    continue;
                }
                dispatch(&envelope, &state_tx, &command_tx);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Signaling observer lagged, skipped {skipped} envelopes");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn dispatch(
    envelope: &SequencedEnvelope,
    state_tx: &watch::Sender<CallSessionState>,
    command_tx: &broadcast::Sender<(SignalingCommand, String)>,
) {
    let text = &envelope.record.session_description;
    match SignalingCommand::classify(text) {
        Some(SignalingCommand::State) => match envelope::payload(text).parse::<CallSessionState>() {
            Ok(state) => {
                debug!("received signaling state: {state}");
                let _ = state_tx.send(state);
            }
            Err(e) => warn!("Ignoring malformed state message: {e}"),
        },
        Some(command) => {
            debug!("received signaling: {command}");
            let _ = command_tx.send((command, envelope::payload(text).to_string()));
        }
        None => warn!(
            "Unclassified signaling envelope for conversation {}: {:.32}",
            envelope.record.conversation_id, text
        ),
    }
}
