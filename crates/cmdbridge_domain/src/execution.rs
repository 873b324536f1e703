use derive_setters::Setters;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Error, RequestId, Result};

/// Exit code reported when the host could not run the command at all
/// (spawn failure, host-side timeout).
pub const SPAWN_FAILURE_CODE: i32 = -1;

/// A shell command line sent from the UI context to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub command: String,
    pub request_id: RequestId,
}

impl ExecutionRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into(), request_id: RequestId::generate() }
    }
}

/// Result of a command as reported by the host.
///
/// The command is echoed back for logging only; correlation uses
/// `request_id` exclusively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Setters)]
#[serde(rename_all = "camelCase")]
#[setters(into, strip_option)]
pub struct ExecutionResult {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i32>,
    /// Routing hint for consumers that do not await a specific request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
}

impl ExecutionResult {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into(), ..Default::default() }
    }

    /// Builds the reply for `request` from what the runner captured.
    pub fn from_output(request: &ExecutionRequest, output: CommandOutput) -> Self {
        let mut result = Self::new(request.command.clone()).request_id(request.request_id);

        // A failed command reports through stderr and the code
        if output.exit_code == Some(0) || !output.stdout.is_empty() {
            result = result.stdout(output.stdout);
        }
        if !output.stderr.is_empty() {
            result = result.stderr(output.stderr);
        }

        match output.exit_code {
            Some(0) => result,
            Some(code) => result.error_code(code),
            // Terminated by a signal
            None => result.error_code(SPAWN_FAILURE_CODE),
        }
    }

    /// Builds the reply for a request the host failed to run.
    pub fn from_failure(request: &ExecutionRequest, message: impl Into<String>) -> Self {
        Self::new(request.command.clone())
            .request_id(request.request_id)
            .stderr(message)
            .error_code(SPAWN_FAILURE_CODE)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.error_code, None | Some(0))
    }

    /// Returns stdout of a successful command, or the failure as an error.
    pub fn into_stdout(self) -> Result<String> {
        if self.is_success() {
            Ok(self.stdout.unwrap_or_default())
        } else {
            Err(Error::CommandFailed {
                command: self.command,
                code: self.error_code,
                stderr: self.stderr.unwrap_or_default(),
            })
        }
    }

    /// Parses stdout of a successful command as JSON.
    pub fn parse_json<T: DeserializeOwned>(self) -> Result<T> {
        let command = self.command.clone();
        let stdout = self.into_stdout()?;
        serde_json::from_str(&stdout).map_err(|source| Error::ParseOutput { command, source })
    }
}

/// Output captured by a [`crate::CommandRunner`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}
