use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ExecutionRequest, ExecutionResult, RequestId};

/// Messages travelling from the UI context to the host.
///
/// Only [`ClientMessage::Execute`] expects a correlated reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ClientMessage {
    Execute(ExecutionRequest),
    Notify(Value),
}

impl ClientMessage {
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            ClientMessage::Execute(request) => Some(request.request_id),
            ClientMessage::Notify(_) => None,
        }
    }
}

/// Messages travelling from the host back to the UI context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum HostMessage {
    CommandResult(ExecutionResult),
    Notify(Value),
}
