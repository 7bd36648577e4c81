//! lifedash CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use lifedash_core::{LogLevel, TracingConfig, init_tracing};
use tracing::Level;

use lifedash_cli::cli::{AuthAction, Cli, Command, ConfigAction};
use lifedash_cli::commands;
use lifedash_cli::config::AppConfig;
use lifedash_cli::error::{ClientError, ClientResult};
use lifedash_cli::runtime::Runtime;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(tracing_config(&cli, &config)) {
        eprintln!("warning: {}", e);
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.requires_reconnect() {
                eprintln!("hint: run `lifedash auth url` to connect Google Calendar again");
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> ClientResult<AppConfig> {
    let mut config = match cli.config {
        Some(ref path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .map_err(ClientError::Config)?;

    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.debug {
        config.logging.level = LogLevel::Debug.to_string();
    }
    Ok(config)
}

fn tracing_config(cli: &Cli, config: &AppConfig) -> TracingConfig {
    let level = match config.logging.min_level() {
        Ok(LogLevel::Error) => Level::ERROR,
        Ok(LogLevel::Warn) => Level::WARN,
        Ok(LogLevel::Info) => Level::INFO,
        Ok(LogLevel::Debug) => Level::DEBUG,
        Err(_) => Level::WARN,
    };
    TracingConfig::cli(cli.debug)
        .with_level(level)
        .with_format(config.logging.output_format().unwrap_or_default())
}

async fn run(cli: Cli, config: AppConfig) -> ClientResult<()> {
    let Cli {
        credentials,
        command,
        ..
    } = cli;
    let runtime = || Runtime::new(config.clone(), credentials.clone());

    match command {
        Command::Auth { action } => match action {
            AuthAction::Url { open } => commands::auth::url(&runtime()?, open),
            AuthAction::Callback {
                user,
                code,
                state,
                expected_state,
            } => {
                commands::auth::callback(
                    &runtime()?,
                    &user,
                    &code,
                    state.as_deref(),
                    expected_state.as_deref(),
                )
                .await
            }
        },
        Command::Token { user } => commands::token::show(&runtime()?, &user).await,
        Command::Calendar { user, json } => {
            commands::calendar::show(&runtime()?, &user, json).await
        }
        Command::Health { user } => commands::health::show(&runtime()?, user.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config, &credentials),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
