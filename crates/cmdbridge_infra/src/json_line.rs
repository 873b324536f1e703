use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use cmdbridge_domain::{Error, MessageSink};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

/// Writes one JSON document per line, e.g. to a host process' stdout.
pub struct JsonLineWriter<W> {
    writer: Arc<Mutex<W>>,
}

impl<W> Clone for JsonLineWriter<W> {
    fn clone(&self) -> Self {
        Self { writer: self.writer.clone() }
    }
}

impl<W: AsyncWrite + Unpin + Send> JsonLineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: Arc::new(Mutex::new(writer)) }
    }

    async fn write_line(&self, json: String) -> anyhow::Result<()> {
        let mut writer = self.writer.lock().await;

        debug!("Sending message: {}", json);

        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl<M, W> MessageSink<M> for JsonLineWriter<W>
where
    M: Serialize + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn post(&self, message: M) -> anyhow::Result<()> {
        let json = serde_json::to_string(&message).context("Failed to serialize message")?;
        self.write_line(json).await.context("Failed to write message")
    }
}

/// Reads newline-delimited JSON messages.
pub struct JsonLineReader<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> JsonLineReader<R> {
    pub fn new(reader: R) -> Self {
        Self { lines: reader.lines() }
    }

    /// Returns the next message, or `None` at end of input. Blank lines are
    /// skipped. A malformed line yields [`Error::Decode`] and leaves the
    /// reader positioned on the following line.
    pub async fn next_message<M: DeserializeOwned>(
        &mut self,
    ) -> cmdbridge_domain::Result<Option<M>> {
        loop {
            let Some(line) = self.lines.next_line().await.map_err(Error::Io)? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }

            debug!("Received message: {}", line);
            return serde_json::from_str(&line).map(Some).map_err(Error::Decode);
        }
    }

    /// Feeds every decodable message into `sender` until end of input or
    /// until the receiving side goes away.
    pub async fn forward<M: DeserializeOwned>(
        mut self,
        sender: mpsc::UnboundedSender<M>,
    ) -> anyhow::Result<()> {
        loop {
            match self.next_message::<M>().await {
                Ok(Some(message)) => {
                    if sender.send(message).is_err() {
                        debug!("Receiver dropped, stopping reader");
                        return Ok(());
                    }
                }
                Ok(None) => return Ok(()),
                Err(Error::Decode(error)) => warn!(%error, "Skipping malformed message"),
                Err(error) => return Err(error).context("Failed to read message"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use cmdbridge_domain::{ClientMessage, ExecutionResult, HostMessage};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::io::BufReader;

    use super::*;

    #[tokio::test]
    async fn test_writes_one_message_per_line() {
        let writer = JsonLineWriter::new(Vec::new());

        writer
            .post(HostMessage::Notify(json!({"kind": "refresh"})))
            .await
            .unwrap();
        writer
            .post(HostMessage::CommandResult(ExecutionResult::new("true")))
            .await
            .unwrap();

        let buffer = writer.writer.lock().await.clone();
        let content = String::from_utf8(buffer).unwrap();
        let actual: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        let expected = vec![
            json!({"type": "notify", "payload": {"kind": "refresh"}}),
            json!({"type": "commandResult", "payload": {"command": "true"}}),
        ];
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_reader_skips_blank_lines_and_reports_malformed() {
        let input = concat!(
            "\n",
            r#"{"type":"notify","payload":"openSettings"}"#,
            "\n",
            "{not json\n",
            "   \n",
            r#"{"type":"notify","payload":42}"#,
            "\n"
        );
        let mut reader = JsonLineReader::new(BufReader::new(input.as_bytes()));

        let first = reader.next_message::<ClientMessage>().await.unwrap();
        let second = reader.next_message::<ClientMessage>().await;
        let third = reader.next_message::<ClientMessage>().await.unwrap();
        let end = reader.next_message::<ClientMessage>().await.unwrap();

        assert_eq!(first, Some(ClientMessage::Notify(json!("openSettings"))));
        assert!(matches!(second, Err(Error::Decode(_))));
        assert_eq!(third, Some(ClientMessage::Notify(json!(42))));
        assert_eq!(end, None);
    }

    #[tokio::test]
    async fn test_forward_continues_past_malformed_lines() {
        let input = "garbage\n{\"type\":\"notify\",\"payload\":\"refresh\"}\n";
        let reader = JsonLineReader::new(BufReader::new(input.as_bytes()));
        let (sender, mut receiver) = mpsc::unbounded_channel::<ClientMessage>();

        reader.forward(sender).await.unwrap();

        assert_eq!(
            receiver.recv().await,
            Some(ClientMessage::Notify(json!("refresh")))
        );
        assert_eq!(receiver.recv().await, None);
    }
}
