use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cmdbridge_config::BridgeConfig;

#[derive(Parser, Debug)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Working directory for executed commands.
    ///
    /// Overrides the `cwd` configuration value.
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Kill a command on the host after this many milliseconds.
    #[arg(long, global = true)]
    pub command_timeout_ms: Option<u64>,

    /// Give up waiting for a result after this many milliseconds.
    ///
    /// By default a request waits until the host answers.
    #[arg(long, global = true)]
    pub request_timeout_ms: Option<u64>,

    /// Enable debug logging on stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: TopLevelCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TopLevelCommand {
    /// Serve the host side of the bridge over stdio.
    ///
    /// Reads one client message per line from stdin and writes one host
    /// message per line to stdout.
    Host,

    /// Run a single command through an in-process bridge and print the
    /// result as JSON.
    Exec {
        /// Shell command line to run
        command: String,
    },
}

impl Cli {
    /// Applies command line overrides on top of the loaded configuration.
    pub fn apply(&self, mut config: BridgeConfig) -> BridgeConfig {
        if let Some(cwd) = &self.cwd {
            config.cwd = Some(cwd.clone());
        }
        if let Some(timeout) = self.command_timeout_ms {
            config.command_timeout_ms = Some(timeout);
        }
        if let Some(timeout) = self.request_timeout_ms {
            config.request_timeout_ms = Some(timeout);
        }
        config
    }
}
