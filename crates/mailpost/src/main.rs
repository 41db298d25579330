//! `mailpost` - compose one e-mail and send it over SMTP.
//!
//! Exit codes: `0` on success, `2` for unusable arguments, settings or
//! message, `1` when delivery fails.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use mailpost_core::{Mailer, SendReport};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(report) => {
            info!(local_addr = %report.local_addr, "E-mail sent successfully");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err:#}");
            exit_code(&err)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<SendReport> {
    let settings = cli.into_settings().context("Failed to load settings")?;
    let mailer = Mailer::new(settings);
    let mut message = mailer.build_message().context("Failed to compose message")?;

    mailer
        .check(&message)
        .map_err(mailpost_core::Error::Validation)?;

    let report = mailer.send(&mut message).await?;
    Ok(report)
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<mailpost_core::Error>() {
        Some(core) if core.is_usage() => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}
