//! Configuration commands.

use crate::cli::CredentialArgs;
use crate::config::AppConfig;
use crate::error::{ClientError, ClientResult};
use crate::runtime::resolve_google_credentials;

/// Dump the configuration to stdout with literal secrets masked.
pub fn dump(config: &AppConfig) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(&config.redacted())
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", AppConfig::default_path().display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &AppConfig, credentials: &CredentialArgs) -> ClientResult<()> {
    check(config, credentials)?;
    println!("Configuration is valid.");
    Ok(())
}

fn check(config: &AppConfig, credentials: &CredentialArgs) -> ClientResult<()> {
    config.logging.min_level().map_err(ClientError::Config)?;
    config.logging.output_format().map_err(ClientError::Config)?;

    if config.google.calendar_id.trim().is_empty() {
        return Err(ClientError::Config(
            "[google] calendar_id must not be empty".to_string(),
        ));
    }

    let has_cli_credentials = credentials.client_id.is_some()
        || credentials.client_secret.is_some()
        || credentials.credentials_file.is_some();
    if has_cli_credentials || config.google.client_id.is_some() || config.google.client_secret.is_some() {
        let resolved = resolve_google_credentials(credentials, &config.google)?;
        config
            .google
            .to_google_config(resolved)
            .map_err(|e| ClientError::Config(format!("invalid Google settings: {}", e)))?;
    }
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> ClientResult<()> {
    println!("config: {}", AppConfig::default_path().display());
    Ok(())
}
