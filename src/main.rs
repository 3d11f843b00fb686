use std::{fs, io::Write as _, process};

use catalog_cache::{
    config::{self, LoadError},
    infra::{
        error::InfraError,
        replay::{self, ReplayOptions},
        telemetry,
    },
};
use thiserror::Error;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[derive(Debug, Error)]
enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to write report: {0}")]
    Report(String),
    #[error("{0} cached list(s) drifted from the catalog")]
    Drift(usize),
}

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Replay(args) => run_replay(settings, args),
    }
}

fn run_replay(settings: config::Settings, args: config::ReplayArgs) -> Result<(), AppError> {
    let options = ReplayOptions {
        fixture: args.fixture,
        events: args.events,
        verify: args.verify,
    };

    let report = replay::run(&options, settings.cache)?;
    let encoded = serde_json::to_string_pretty(&report)
        .map_err(|err| AppError::Report(err.to_string()))?;

    match args.output.as_ref() {
        Some(path) => {
            fs::write(path, encoded).map_err(|err| AppError::Report(err.to_string()))?;
            info!(path = %path.display(), "Report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{encoded}").map_err(|err| AppError::Report(err.to_string()))?;
        }
    }

    match report.drift.as_ref() {
        Some(drift) if !drift.is_empty() => Err(AppError::Drift(drift.len())),
        _ => Ok(()),
    }
}
