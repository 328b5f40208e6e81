//! ALT - AI Localization Tool
//!
//! Entry point: parses arguments, sets up logging and runs the selected
//! command. A termination signal during a translate run flushes whatever
//! has been translated so far before exiting.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use alt::cli::{Args, Commands, TranslateArgs};
use alt::config::{Config, RunOptions};
use alt::messages::Messages;
use alt::pipeline::Pipeline;
use alt::provider::{list_models, model_display_names};
use alt::state::AppState;

const EXIT_FAILURE: u8 = 1;
const EXIT_SETUP_ERROR: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = setup_logging(&args)?;

    let plain_output = args.verbose || args.debug || args.trace;
    let code = match args.into_command() {
        Commands::ListModels { provider } => run_list_models(&provider).await,
        Commands::Translate(translate) => run_translate(translate, plain_output).await,
    };

    Ok(code)
}

async fn run_list_models(provider: &str) -> ExitCode {
    match list_models(provider).await {
        Ok(models) => {
            for name in model_display_names(&models) {
                println!("{}", name);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(EXIT_SETUP_ERROR)
        }
    }
}

fn prepare_pipeline(args: &TranslateArgs, plain_output: bool) -> alt::error::Result<Pipeline> {
    let cwd = std::env::current_dir()?;
    let config = Config::discover(args.config_file.as_deref(), &cwd)?;
    let mut options = RunOptions::resolve(args, config)?;
    options.tty |= plain_output;
    debug!("options: {:?}", options);
    Pipeline::new(options)
}

async fn run_translate(args: TranslateArgs, plain_output: bool) -> ExitCode {
    let mut state = AppState::new(Messages::from_env());

    let pipeline = match prepare_pipeline(&args, plain_output) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("{}", e);
            state.shutdown(false);
            return ExitCode::from(EXIT_SETUP_ERROR);
        }
    };

    let outcome = tokio::select! {
        result = pipeline.run(&mut state) => Some(result),
        _ = shutdown_signal() => None,
    };

    match outcome {
        Some(Ok(summary)) => {
            state.shutdown(false);
            if summary.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_FAILURE)
            }
        }
        Some(Err(e)) => {
            error!("{}", e);
            state.shutdown(false);
            ExitCode::from(EXIT_SETUP_ERROR)
        }
        None => {
            state.shutdown(true);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for interrupt: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn setup_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug || args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let detailed = args.debug || args.trace;

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(detailed)
        .with_line_number(detailed);

    // Daily rotation, no ANSI colors in files
    let (file_layer, guard) = match &args.log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let (writer, guard) = non_blocking(rolling::daily(log_dir, "alt.log"));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match &args.log_dir {
        Some(dir) => info!("Logging initialized - console: {}, file: {}", log_level, dir.join("alt.log").display()),
        None => debug!("Logging initialized - console: {}", log_level),
    }

    Ok(guard)
}
