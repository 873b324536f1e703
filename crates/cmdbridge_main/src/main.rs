use anyhow::Result;
use clap::Parser;
use cmdbridge_main::{Cli, init_tracing, run};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Stdout carries protocol messages in host mode, so logs go to stderr
    init_tracing(cli.verbose);

    run(cli).await
}
