//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// lifedash - Google Calendar connection and token lifecycle
#[derive(Debug, Parser)]
#[command(name = "lifedash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "LIFEDASH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Minimum log level (error, warn, info, debug); overrides config.toml
    #[arg(long, env = "LIFEDASH_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// OAuth client credentials given on the command line.
///
/// When both are absent, `[google]` in config.toml is used.
#[derive(Debug, Clone, Default, Args)]
pub struct CredentialArgs {
    /// OAuth client ID (from Google Cloud Console)
    #[arg(long, env = "GOOGLE_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret (from Google Cloud Console)
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Path to a Google Cloud Console credentials JSON file
    #[arg(long, env = "GOOGLE_CREDENTIALS_FILE", global = true)]
    pub credentials_file: Option<PathBuf>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect Google Calendar
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Print a valid access token, refreshing it if needed
    Token {
        /// User whose token to use
        #[arg(long)]
        user: String,
    },

    /// List upcoming events
    Calendar {
        /// User whose calendar to list
        #[arg(long)]
        user: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report token store and calendar connection health
    Health {
        /// User whose calendar connection to check
        #[arg(long)]
        user: Option<String>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Steps of the authorization-code flow.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Print the Google consent URL
    Url {
        /// Open the URL in the default browser
        #[arg(long)]
        open: bool,
    },

    /// Exchange the code from the redirect and store the tokens
    Callback {
        /// User the tokens belong to
        #[arg(long)]
        user: String,

        /// `code` query parameter from the redirect
        #[arg(long)]
        code: String,

        /// `state` query parameter from the redirect
        #[arg(long, requires = "expected_state")]
        state: Option<String>,

        /// State printed by `lifedash auth url`
        #[arg(long, requires = "state")]
        expected_state: Option<String>,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration (secrets masked)
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
