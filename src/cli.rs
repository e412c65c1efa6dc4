use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "hwp-tagger",
    version,
    about = "Tag and extract segments of a live heat pump log stream"
)]
pub struct Cli {
    /// Configuration file path (defaults to ./hwp-tagger.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Ingest device logs and accept tag commands (default)
    Run(RunArgs),

    /// List the available tag commands
    Tags,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Device log stream address (host:port)
    #[arg(short, long, conflicts_with = "replay")]
    pub device: Option<String>,

    /// Replay a captured log file instead of connecting to the device
    #[arg(short, long)]
    pub replay: Option<PathBuf>,

    /// Delay between replayed lines in milliseconds
    #[arg(long, default_value = "0")]
    pub replay_interval_ms: u64,

    /// Path and prefix for the log files, e.g. /path/to/logs/POOL
    #[arg(short, long)]
    pub log_prefix: Option<PathBuf>,

    /// Number of device lines kept for retrospective tags
    #[arg(short, long)]
    pub buffer_capacity: Option<usize>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display the effective configuration
    Show,

    /// Validate configuration file
    Validate,
}

impl Cli {
    /// Get the command to execute, defaulting to Run if none provided
    pub fn get_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli {
            config: None,
            command: None,
        };

        match cli.get_command() {
            Commands::Run(args) => {
                assert!(args.device.is_none());
                assert!(args.replay.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parsing_run_with_device() {
        let args = vec![
            "hwp-tagger",
            "run",
            "--device",
            "pool-heater.local:6053",
            "--log-prefix",
            "logs/POOL",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.get_command() {
            Commands::Run(run) => {
                assert_eq!(run.device.as_deref(), Some("pool-heater.local:6053"));
                assert_eq!(run.log_prefix, Some(PathBuf::from("logs/POOL")));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_device_conflicts_with_replay() {
        let args = vec!["hwp-tagger", "run", "--device", "a:1", "--replay", "x.log"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_parsing_config_validate() {
        let args = vec!["hwp-tagger", "--config", "custom.toml", "config", "validate"];
        let cli = Cli::try_parse_from(args).unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(
            cli.get_command(),
            Commands::Config {
                action: ConfigCommands::Validate
            }
        ));
    }
}
