//! courier - command-line HTTP client
//!
//! Main entry point for the `courier` binary.

use std::process::ExitCode;

use clap::Parser;

mod args;
mod cli;
mod error;
mod output;

use cli::{Cli, LogFormat};
use error::CliError;

/// Application exit codes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success = 0,
    ConfigError = 2,
    IoError = 3,
    NetworkError = 4,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(&cli);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return report(CliError::io("failed to create Tokio runtime", e, None)),
    };

    match runtime.block_on(cli.execute()) {
        Ok(()) => Exit::Success.into(),
        Err(e) => report(e),
    }
}

fn report(err: CliError) -> ExitCode {
    tracing::debug!(error = ?err, "request failed");
    eprintln!("{}", err.render());
    err.exit_code().into()
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Dumps are logged at info, so --debug needs that target let through.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.debug {
            EnvFilter::new(format!("{level},courier::dump=info"))
        } else {
            EnvFilter::new(level)
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(cli.verbose >= 2)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
