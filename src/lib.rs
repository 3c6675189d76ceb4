pub mod cli;
pub mod config;
pub mod env_manager;
pub mod event_builder;
pub mod model;
pub mod parser;
pub mod reconcile;
pub mod services;
pub mod sync;

use anyhow::{Context, Result};
use cli::{Cli, Commands, ConfigActions};
use env_manager::Credentials;
use log::*;
use services::{GoogleAuth, GoogleCalendarClient, TodoistClient};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Install the global logger. Log lines go to stderr, or are appended to
/// `log_file` when one is given.
pub fn init_logger(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init().context("Logger already initialised")
}

/// Dispatch a parsed command line. `env_file` is the result of the `.env`
/// lookup done before the logger was installed.
pub async fn run(cli: Cli, env_file: env_manager::EnvFileResult) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::get_config_path()?,
    };

    match cli.command {
        Commands::Sync { duration, calendar } => {
            let config = config::Config::load_from(&config_path)?;
            let log_file = cli.log_file.clone().or_else(|| config.logging.file.clone());
            init_logger(cli.verbose, log_file.as_deref())?;
            env_manager::log_env_file(&env_file);
            info!("Starting sync with config {}", config_path.display());
            run_sync(&config, duration, calendar).await
        }
        Commands::Config { action } => {
            init_logger(cli.verbose, cli.log_file.as_deref())?;
            env_manager::log_env_file(&env_file);
            run_config(action, &config_path)
        }
        Commands::Parse { title } => {
            print_title_breakdown(&title);
            Ok(())
        }
    }
}

async fn run_sync(config: &config::Config, duration: Option<u32>, calendar: Option<String>) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let mut settings = config.sync_settings()?;
    if let Some(name) = calendar {
        settings.calendar_name = name;
    }
    let duration = duration.unwrap_or(settings.default_duration_minutes);

    let access_token = GoogleAuth::new(credentials.google)
        .access_token()
        .await
        .context("Failed to obtain a Google access token")?;

    let engine = sync::SyncEngine::new(
        TodoistClient::new(credentials.todoist_api_key),
        GoogleCalendarClient::new(access_token),
        settings,
    );
    let report = engine.sync_tasks_to_calendar(duration).await?;
    println!("✅ Sync finished: {}", report);
    Ok(())
}

fn run_config(action: ConfigActions, config_path: &Path) -> Result<()> {
    match action {
        ConfigActions::Show => {
            let config = config::Config::load_from(config_path)?;
            println!("# {}", config_path.display());
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigActions::Path => println!("{}", config_path.display()),
        ConfigActions::Init => {
            let existed = config_path.exists();
            config::Config::load_from(config_path)?;
            if existed {
                println!("Config already exists at {}", config_path.display());
            } else {
                println!("📝 Wrote default config to {}", config_path.display());
            }
            if env_manager::create_env_template(Path::new(".env"))? {
                println!("📝 Wrote .env template, fill in your credentials");
            }
        }
    }
    Ok(())
}

fn print_title_breakdown(title: &str) {
    let annotation = parser::DurationAnnotation::scan(title);
    match (parser::extract_duration(title), annotation.usable_minutes()) {
        (_, Some(minutes)) => println!("Duration: {} minutes", minutes),
        (Some(_), None) => println!("Duration: no usable annotation, default applies"),
        (None, None) => println!("Duration: none, default applies"),
    }
    if annotation.brackets > annotation.parsed {
        println!("Ignored brackets: {}", annotation.brackets - annotation.parsed);
    }
    println!("Match key: {}", parser::normalize_title(title));
}

// Re-export commonly used types
pub use config::Config;
pub use model::{Event, Task};
pub use sync::{SyncEngine, SyncError, SyncReport, SyncSettings};
