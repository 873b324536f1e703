use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use cmdbridge_domain::{
    ClientMessage, CommandRunner, ExecutionRequest, ExecutionResult, HostMessage, MessageSink,
    NotificationHandler,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Host side of the bridge: runs execution requests and posts correlated
/// results back to the UI context.
pub struct HostDispatcher<R, S, N> {
    runner: Arc<R>,
    sink: Arc<S>,
    notifications: Arc<N>,
}

impl<R, S, N> HostDispatcher<R, S, N>
where
    R: CommandRunner + 'static,
    S: MessageSink<HostMessage> + 'static,
    N: NotificationHandler + 'static,
{
    pub fn new(runner: Arc<R>, sink: Arc<S>, notifications: Arc<N>) -> Self {
        Self { runner, sink, notifications }
    }

    /// Runs one request to completion and posts its result.
    pub async fn execute(&self, request: ExecutionRequest) -> anyhow::Result<()> {
        execute_request(self.runner.as_ref(), self.sink.as_ref(), request).await
    }

    /// Handles one client message. Execution requests are spawned onto
    /// `in_flight`; notifications reach the handler before this returns.
    pub async fn dispatch(&self, message: ClientMessage, in_flight: &mut JoinSet<()>) {
        match message {
            ClientMessage::Execute(request) => {
                let runner = self.runner.clone();
                let sink = self.sink.clone();
                in_flight.spawn(async move {
                    let delivered = execute_request(runner.as_ref(), sink.as_ref(), request).await;
                    if let Err(error) = delivered {
                        error!("Failed to deliver command result: {error:#}");
                    }
                });
            }
            ClientMessage::Notify(payload) => {
                if let Err(error) = self.notifications.notify(payload).await {
                    warn!("Notification handler failed: {error:#}");
                }
            }
        }
    }

    /// Processes client messages until the channel closes, then waits for
    /// commands still running.
    ///
    /// Each request runs on its own task, so results are posted in
    /// completion order rather than request order.
    pub async fn run(
        &self,
        mut receiver: mpsc::UnboundedReceiver<ClientMessage>,
    ) -> anyhow::Result<()> {
        let mut in_flight = JoinSet::new();
        info!("Host dispatcher ready, waiting for messages");

        while let Some(message) = receiver.recv().await {
            self.dispatch(message, &mut in_flight).await;

            while let Some(finished) = in_flight.try_join_next() {
                log_join_error(finished);
            }
        }

        info!(in_flight = in_flight.len(), "Client channel closed, draining");
        while let Some(finished) = in_flight.join_next().await {
            log_join_error(finished);
        }

        Ok(())
    }
}

async fn execute_request<R, S>(
    runner: &R,
    sink: &S,
    request: ExecutionRequest,
) -> anyhow::Result<()>
where
    R: CommandRunner + ?Sized,
    S: MessageSink<HostMessage> + ?Sized,
{
    let result = match runner.run(&request.command).await {
        Ok(output) => ExecutionResult::from_output(&request, output),
        Err(error) => {
            warn!(request_id = %request.request_id, "Command could not be run: {error:#}");
            ExecutionResult::from_failure(&request, format!("{error:#}"))
        }
    };

    debug!(
        request_id = %request.request_id,
        error_code = ?result.error_code,
        "Posting command result"
    );
    sink.post(HostMessage::CommandResult(result))
        .await
        .with_context(|| format!("Failed to post result for request {}", request.request_id))
}

fn log_join_error(finished: Result<(), tokio::task::JoinError>) {
    if let Err(error) = finished {
        error!("Command task failed: {error}");
    }
}

/// Default notification handler: records the payload in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotificationHandler;

#[async_trait]
impl NotificationHandler for LoggingNotificationHandler {
    async fn notify(&self, payload: Value) -> anyhow::Result<()> {
        info!(%payload, "Received notification");
        Ok(())
    }
}
