use std::sync::Arc;

use anyhow::{Context, Result};
use cmdbridge_app::{CommandBridge, HostDispatcher, LoggingNotificationHandler};
use cmdbridge_config::BridgeConfig;
use cmdbridge_domain::{ClientMessage, ExecutionResult, HostMessage};
use cmdbridge_infra::{JsonLineReader, JsonLineWriter, MemoryChannel, ShellCommandRunner};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use crate::{Cli, TopLevelCommand};

pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.apply(BridgeConfig::from_env().context("Failed to load configuration")?);

    match cli.command {
        TopLevelCommand::Host => serve_stdio(&config).await,
        TopLevelCommand::Exec { command } => {
            let result = execute_once(&config, command).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

/// Serves the host side over stdin/stdout until stdin closes.
pub async fn serve_stdio(config: &BridgeConfig) -> Result<()> {
    info!("Starting cmdbridge host on stdio");
    serve(config, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    info!("cmdbridge host shutdown complete");
    Ok(())
}

/// Serves the host side over any line-oriented byte stream pair.
pub async fn serve<R, W>(config: &BridgeConfig, input: R, output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let reader = JsonLineReader::new(input);
    let writer = JsonLineWriter::new(output);
    let (sender, receiver) = mpsc::unbounded_channel::<ClientMessage>();

    let dispatcher = HostDispatcher::new(
        Arc::new(ShellCommandRunner::from_config(config)),
        Arc::new(writer),
        Arc::new(LoggingNotificationHandler),
    );

    let reading = tokio::spawn(reader.forward(sender));
    dispatcher.run(receiver).await?;
    reading.await.context("Reader task failed")??;
    Ok(())
}

/// Connects a bridge to a shell-backed host running on the current runtime.
pub fn connect_in_process(
    config: &BridgeConfig,
) -> Arc<CommandBridge<MemoryChannel<ClientMessage>>> {
    let (client_sink, client_receiver) = MemoryChannel::<ClientMessage>::pair();
    let (host_sink, host_receiver) = MemoryChannel::<HostMessage>::pair();

    let bridge = Arc::new(CommandBridge::from_config(client_sink, config));
    let dispatcher = HostDispatcher::new(
        Arc::new(ShellCommandRunner::from_config(config)),
        Arc::new(host_sink),
        Arc::new(LoggingNotificationHandler),
    );

    tokio::spawn(async move { dispatcher.run(client_receiver).await });
    let receiving = bridge.clone();
    tokio::spawn(async move { receiving.run_receiver(host_receiver).await });

    bridge
}

/// Runs one command through an in-process bridge.
pub async fn execute_once(config: &BridgeConfig, command: String) -> Result<ExecutionResult> {
    let bridge = connect_in_process(config);
    let result = bridge
        .execute_command(command)
        .await
        .context("Failed to execute command")?;
    Ok(result)
}

#[cfg(all(test, unix))]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_execute_once_reports_failure_in_result() {
        let config = BridgeConfig::default();

        let actual = execute_once(&config, "echo nope 1>&2; exit 2".to_string())
            .await
            .unwrap();

        assert_eq!(actual.stderr.as_deref(), Some("nope\n"));
        assert_eq!(actual.error_code, Some(2));
    }

    #[tokio::test]
    async fn test_connected_bridges_are_independent() {
        let config = BridgeConfig::default();
        let first = connect_in_process(&config);
        let second = connect_in_process(&config);

        let (a, b) = tokio::join!(
            first.execute_command("echo a"),
            second.execute_command("echo b")
        );

        assert_eq!(a.unwrap().stdout.as_deref(), Some("a\n"));
        assert_eq!(b.unwrap().stdout.as_deref(), Some("b\n"));
        assert_eq!(first.pending_count() + second.pending_count(), 0);
    }
}
