use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// todosync - mirror scheduled Todoist tasks into a Google Calendar
#[derive(Debug, Parser)]
#[command(name = "todosync")]
#[command(about = "Mirror scheduled Todoist tasks into a Google Calendar", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Append log output to this file instead of stderr
    #[arg(long = "log-file", global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one sync pass
    Sync {
        /// Duration in minutes for tasks without one
        #[arg(long, value_name = "MINUTES")]
        duration: Option<u32>,

        /// Name of the target calendar
        #[arg(long, value_name = "NAME")]
        calendar: Option<String>,
    },

    /// View or initialise configuration
    Config {
        #[command(subcommand)]
        action: ConfigActions,
    },

    /// Show how a task title is read
    Parse {
        /// Task title, e.g. "Write report [1h30m]"
        #[arg(required = true)]
        title: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigActions {
    /// Print the active configuration
    Show,
    /// Print the config file location
    Path,
    /// Write a default config file and a .env template
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sync_with_overrides() {
        let cli = Cli::parse_from(["todosync", "--verbose", "sync", "--duration", "45", "--calendar", "Work"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Sync { duration, calendar } => {
                assert_eq!(duration, Some(45));
                assert_eq!(calendar.as_deref(), Some("Work"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["todosync", "config", "show", "--config", "/tmp/c.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::Config { action: ConfigActions::Show }));
    }

    #[test]
    fn parse_requires_title() {
        assert!(Cli::try_parse_from(["todosync", "parse"]).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
