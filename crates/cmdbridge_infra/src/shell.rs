use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use cmdbridge_config::BridgeConfig;
use cmdbridge_domain::{CommandOutput, CommandRunner};
use derive_setters::Setters;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs command lines through the platform shell and captures their output.
#[derive(Debug, Clone, Setters)]
#[setters(into, strip_option)]
pub struct ShellCommandRunner {
    shell: String,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self { shell: default_shell().to_string(), cwd: None, env: Vec::new(), timeout: None }
    }
}

impl ShellCommandRunner {
    pub fn from_config(config: &BridgeConfig) -> Self {
        let env = config
            .env
            .iter()
            .filter_map(|entry| match entry.split_once('=') {
                Some((key, value)) if !key.is_empty() => Some((key.to_string(), value.to_string())),
                _ => {
                    warn!(entry = %entry, "Ignoring malformed environment entry");
                    None
                }
            })
            .collect();

        Self {
            shell: config
                .shell
                .clone()
                .unwrap_or_else(|| default_shell().to_string()),
            cwd: config.cwd.clone(),
            env,
            timeout: config.command_timeout(),
        }
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg(shell_flag(&self.shell)).arg(command);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(self.env.iter().map(|(key, value)| (key, value)));
        cmd
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &str) -> anyhow::Result<CommandOutput> {
        debug!(command, shell = %self.shell, "Running command");

        let child = self
            .command(command)
            .spawn()
            .with_context(|| format!("Failed to spawn shell '{}'", self.shell))?;

        // Dropping the pending wait kills the child
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| anyhow!("Command '{command}' timed out after {limit:?}"))?,
            None => child.wait_with_output().await,
        }
        .with_context(|| format!("Failed to collect output of '{command}'"))?;

        let output = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };
        debug!(command, exit_code = ?output.exit_code, "Command finished");

        Ok(output)
    }
}

fn default_shell() -> &'static str {
    if cfg!(windows) { "cmd" } else { "sh" }
}

fn shell_flag(shell: &str) -> &'static str {
    let name = shell.rsplit(['/', '\\']).next().unwrap_or(shell);
    if name.eq_ignore_ascii_case("cmd") || name.eq_ignore_ascii_case("cmd.exe") {
        "/C"
    } else {
        "-c"
    }
}
