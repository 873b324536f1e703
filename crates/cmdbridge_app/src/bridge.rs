use std::time::Duration;

use cmdbridge_config::BridgeConfig;
use cmdbridge_domain::{
    ClientMessage, Error, ExecutionRequest, ExecutionResult, HostMessage, MessageSink, RequestId,
    Result,
};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

/// Correlates execution requests posted to the host with the results that
/// come back.
///
/// Every awaited call registers a single-use resolver under a fresh
/// [`RequestId`] before the request is posted. The resolver is removed when
/// the matching result is delivered through
/// [`CommandBridge::handle_command_result`]. Results that match nothing are
/// dropped, so late, duplicate and fire-and-forget replies are harmless.
///
/// The bridge is an ordinary value: share it with `Arc` between the tasks
/// that issue commands and the task that feeds it host messages.
pub struct CommandBridge<S> {
    sink: S,
    pending: DashMap<RequestId, oneshot::Sender<ExecutionResult>>,
    notifications: broadcast::Sender<Value>,
    request_timeout: Option<Duration>,
}

impl<S: MessageSink<ClientMessage>> CommandBridge<S> {
    pub fn new(sink: S) -> Self {
        Self::from_config(sink, &BridgeConfig::default())
    }

    pub fn from_config(sink: S, config: &BridgeConfig) -> Self {
        let (notifications, _) = broadcast::channel(config.notification_buffer.max(1));
        Self {
            sink,
            pending: DashMap::new(),
            notifications,
            request_timeout: config.request_timeout(),
        }
    }

    /// Sends `command` to the host and waits for its result.
    ///
    /// The result is returned exactly as the host reported it; a failed
    /// command resolves normally with `stderr` and `error_code` populated.
    /// Without a configured request timeout this waits indefinitely.
    pub async fn execute_command(&self, command: impl Into<String>) -> Result<ExecutionResult> {
        if let Some(timeout) = self.request_timeout {
            return self.execute_command_with_timeout(command, timeout).await;
        }

        let (request_id, resolver) = self.send_request(command.into()).await?;
        resolver.await.map_err(|_| Error::BridgeClosed(request_id))
    }

    /// Like [`CommandBridge::execute_command`] with an explicit deadline. On
    /// expiry the pending entry is discarded and a later result for it is
    /// ignored.
    pub async fn execute_command_with_timeout(
        &self,
        command: impl Into<String>,
        timeout: Duration,
    ) -> Result<ExecutionResult> {
        let (request_id, resolver) = self.send_request(command.into()).await?;

        match tokio::time::timeout(timeout, resolver).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(Error::BridgeClosed(request_id)),
            Err(_) => {
                self.pending.remove(&request_id);
                warn!(%request_id, ?timeout, "Request timed out");
                Err(Error::Timeout { request_id, timeout })
            }
        }
    }

    async fn send_request(
        &self,
        command: String,
    ) -> Result<(RequestId, oneshot::Receiver<ExecutionResult>)> {
        let request = ExecutionRequest::new(command);
        let request_id = request.request_id;

        let (sender, receiver) = oneshot::channel();
        self.pending.insert(request_id, sender);

        debug!(%request_id, command = %request.command, "Posting execution request");
        if let Err(error) = self.sink.post(ClientMessage::Execute(request)).await {
            self.pending.remove(&request_id);
            return Err(Error::Transport(error));
        }

        Ok((request_id, receiver))
    }

    /// Delivers a result from the host. Returns `true` if it resolved a
    /// waiting request.
    pub fn handle_command_result(&self, result: ExecutionResult) -> bool {
        let Some(request_id) = result.request_id else {
            debug!(command = %result.command, "Dropping result without request id");
            return false;
        };

        match self.pending.remove(&request_id) {
            Some((_, resolver)) => {
                if resolver.send(result).is_err() {
                    debug!(%request_id, "Caller stopped waiting before the result arrived");
                }
                true
            }
            None => {
                debug!(%request_id, "Dropping unmatched result");
                false
            }
        }
    }

    /// Entry point for everything the host sends back.
    pub fn handle_message(&self, message: HostMessage) {
        match message {
            HostMessage::CommandResult(result) => {
                self.handle_command_result(result);
            }
            HostMessage::Notify(payload) => {
                if self.notifications.send(payload).is_err() {
                    debug!("No subscribers for host notification");
                }
            }
        }
    }

    /// Posts a payload without expecting a reply.
    pub async fn send_message(&self, payload: Value) -> Result<()> {
        self.sink
            .post(ClientMessage::Notify(payload))
            .await
            .map_err(Error::Transport)
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Value> {
        self.notifications.subscribe()
    }

    /// Number of requests still waiting for a result.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Feeds host messages into the bridge until the channel closes.
    pub async fn run_receiver(&self, mut receiver: mpsc::UnboundedReceiver<HostMessage>) {
        while let Some(message) = receiver.recv().await {
            self.handle_message(message);
        }
        debug!(pending = self.pending_count(), "Host channel closed");
    }
}
