use async_trait::async_trait;
use serde_json::Value;

use crate::CommandOutput;

/// Posting half of a message channel.
///
/// Implementations must preserve the order of messages posted from a single
/// task. Delivery of the reply, if any, happens through whatever receive
/// loop the owner of the channel runs.
#[async_trait]
pub trait MessageSink<M>: Send + Sync {
    async fn post(&self, message: M) -> anyhow::Result<()>;
}

/// Port for running a shell command line on the host.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `command` to completion. A non-zero exit is not an error; `Err`
    /// means the command could not be run at all.
    async fn run(&self, command: &str) -> anyhow::Result<CommandOutput>;
}

/// Receives fire-and-forget payloads on the host side.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn notify(&self, payload: Value) -> anyhow::Result<()>;
}
