//! CLI argument parsing with clap
//!
//! Defines the command-line interface structure, including all commands,
//! arguments, and their documentation.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

// Include shadow-rs generated build information
use shadow_rs::shadow;
shadow!(build);

/// Session notification scheduling and delivery tracking service
#[derive(Parser, Debug)]
#[command(name = "cadence-rs")]
#[command(about = "Session notification scheduling and delivery tracking service")]
#[command(long_about = "
Cadence-rs schedules time-triggered session notifications through a delayed
message queue and tracks every delivery in a durable job store.

EXAMPLES:
    # Start the server with default configuration
    cadence-rs serve

    # Start server on custom host and port
    cadence-rs serve --host 0.0.0.0 --port 8080

    # Use custom configuration file
    cadence-rs --config /path/to/config.toml serve

    # Check configuration without starting the server
    cadence-rs serve --dry-run

    # Run database migrations
    cadence-rs migrate

    # Preview pending migrations
    cadence-rs migrate --dry-run

For more information about configuration options, see the documentation.
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Use a single TOML file instead of the layered configuration
    /// directory. The file must exist and be readable.
    #[arg(short, long, value_name = "FILE", value_parser = validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    ///
    /// Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    ///
    /// Cannot be used with --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the web server (default)
    Serve {
        /// Host address to bind to
        ///
        /// Use 127.0.0.1 for localhost only, or 0.0.0.0 to accept
        /// connections from any interface.
        #[arg(long, value_name = "ADDRESS", value_parser = validate_host_address)]
        host: Option<String>,

        /// Port number to listen on (1-65535)
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,

        /// Log level override
        ///
        /// Overrides both configuration file settings and the global
        /// --verbose/--quiet flags.
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration and exit
        #[arg(long)]
        dry_run: bool,
    },
    /// Database migration operations
    Migrate {
        /// Show pending migrations without applying
        #[arg(long, conflicts_with = "rollback")]
        dry_run: bool,

        /// Number of migrations to rollback (1-100)
        #[arg(long, value_name = "STEPS", conflicts_with = "dry_run", value_parser = validate_rollback_steps)]
        rollback: Option<u32>,
    },
}

/// Log level options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => "error".to_string(),
            LogLevel::Warn => "warn".to_string(),
            LogLevel::Info => "info".to_string(),
            LogLevel::Debug => "debug".to_string(),
            LogLevel::Trace => "trace".to_string(),
        }
    }
}

fn validate_config_file_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if !path.exists() {
        return Err(format!("Configuration file does not exist: {}", value));
    }
    if !path.is_file() {
        return Err(format!("Configuration path is not a file: {}", value));
    }
    Ok(path)
}

fn validate_host_address(value: &str) -> Result<String, String> {
    if value.is_empty() {
        return Err("Host address must not be empty".to_string());
    }
    if value == "localhost" || value.parse::<std::net::IpAddr>().is_ok() {
        return Ok(value.to_string());
    }
    // Hostnames: letters, digits, dots and dashes
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        Ok(value.to_string())
    } else {
        Err(format!("Invalid host address: {}", value))
    }
}

fn validate_rollback_steps(value: &str) -> Result<u32, String> {
    let steps: u32 = value
        .parse()
        .map_err(|_| format!("Invalid rollback steps: {}", value))?;
    if !(1..=100).contains(&steps) {
        return Err("Rollback steps must be between 1 and 100".to_string());
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_behavior() {
        let cli = Cli::try_parse_from(["cadence-rs"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(!cli.quiet);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_serve_command() {
        let cli =
            Cli::try_parse_from(["cadence-rs", "serve", "--host", "0.0.0.0", "--port", "8080"])
                .unwrap();
        if let Some(Commands::Serve {
            host,
            port,
            log_level: _,
            dry_run,
        }) = cli.command
        {
            assert_eq!(host, Some("0.0.0.0".to_string()));
            assert_eq!(port, Some(8080));
            assert!(!dry_run);
        } else {
            panic!("Expected Serve command");
        }
    }

    #[test]
    fn test_migrate_command() {
        let cli = Cli::try_parse_from(["cadence-rs", "migrate", "--dry-run"]).unwrap();
        if let Some(Commands::Migrate { dry_run, rollback }) = cli.command {
            assert!(dry_run);
            assert!(rollback.is_none());
        } else {
            panic!("Expected Migrate command");
        }
    }

    #[test]
    fn test_conflicting_verbose_quiet() {
        let result = Cli::try_parse_from(["cadence-rs", "--verbose", "--quiet"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_migrate_dry_run_conflicts_with_rollback() {
        let result =
            Cli::try_parse_from(["cadence-rs", "migrate", "--dry-run", "--rollback", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rollback_steps_bounds() {
        assert!(validate_rollback_steps("1").is_ok());
        assert!(validate_rollback_steps("100").is_ok());
        assert!(validate_rollback_steps("0").is_err());
        assert!(validate_rollback_steps("101").is_err());
        assert!(validate_rollback_steps("abc").is_err());
    }

    #[test]
    fn test_host_validation() {
        assert!(validate_host_address("127.0.0.1").is_ok());
        assert!(validate_host_address("localhost").is_ok());
        assert!(validate_host_address("queue.internal").is_ok());
        assert!(validate_host_address("bad host!").is_err());
    }
}
