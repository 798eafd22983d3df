use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ws_chat::cancel::cancel_on_interrupt;
use ws_chat::cli::Cli;
use ws_chat::input::stdin_lines;
use ws_chat::{dial, CancellationSignal, Session, StdoutConsole};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = cli.config();
    let connection = dial(&config).await?;

    let signal = CancellationSignal::new();
    let interrupt = cancel_on_interrupt(signal.clone());
    let input = stdin_lines(config.input_buffer).context("failed to start input reader")?;

    let reason = Session::new(connection, Arc::new(StdoutConsole))
        .with_signal(signal)
        .run(input)
        .await;
    interrupt.abort();

    info!(%reason, failure = reason.is_failure(), "exiting");
    Ok(())
}
