use std::sync::Arc;

use cmdbridge_domain::{ClientMessage, Error, MessageSink, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CommandBridge;

/// A JSON document persisted on the host and accessed only through shell
/// commands sent over the bridge. Requires a POSIX shell on the host.
pub struct JsonDocumentStore<S> {
    bridge: Arc<CommandBridge<S>>,
    path: String,
}

impl<S: MessageSink<ClientMessage>> JsonDocumentStore<S> {
    pub fn new(bridge: Arc<CommandBridge<S>>, path: impl Into<String>) -> Self {
        Self { bridge, path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn exists(&self) -> Result<bool> {
        let result = self
            .bridge
            .execute_command(format!("test -f {}", shell_quote(&self.path)))
            .await?;
        Ok(result.is_success())
    }

    pub async fn read<T: DeserializeOwned>(&self) -> Result<T> {
        self.bridge
            .execute_command(format!("cat {}", shell_quote(&self.path)))
            .await?
            .parse_json()
    }

    pub async fn write<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(Error::Encode)?;
        let command = format!(
            "printf '%s\\n' {} > {}",
            shell_quote(&json),
            shell_quote(&self.path)
        );

        self.bridge.execute_command(command).await?.into_stdout()?;
        Ok(())
    }
}

/// Wraps `value` in single quotes for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
