use std::time::Duration;

use thiserror::Error;

use crate::RequestId;

/// Errors surfaced by the bridge, its transports and the caller helpers.
///
/// Process failures are never represented here by the bridge itself: a
/// command exiting non-zero resolves normally with `error_code` set. Only
/// callers that opt into [`crate::ExecutionResult::into_stdout`] turn such a
/// result into [`Error::CommandFailed`].
#[derive(Debug, Error)]
pub enum Error {
    /// The message channel refused an outgoing message
    #[error("Failed to post message on the channel: {0}")]
    Transport(#[source] anyhow::Error),

    /// The bridge went away before the result arrived
    #[error("Bridge closed before request {0} was resolved")]
    BridgeClosed(RequestId),

    /// No result arrived within the configured deadline
    #[error("Request {request_id} timed out after {timeout:?}")]
    Timeout {
        request_id: RequestId,
        timeout: Duration,
    },

    /// The host reported a failed command
    #[error("Command '{command}' failed with code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Stdout of a successful command was not the expected JSON
    #[error("Failed to parse output of '{command}': {source}")]
    ParseOutput {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),

    /// A transport frame could not be decoded
    #[error("Failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Transport I/O failed: {0}")]
    Io(#[source] std::io::Error),

    #[error("Invalid request id: {0}")]
    InvalidRequestId(#[source] uuid::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
