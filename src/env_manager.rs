use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use secrecy::SecretString;
use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const TODOIST_API_KEY: &str = "TODOIST_API_KEY";
pub const GOOGLE_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
pub const GOOGLE_CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
pub const GOOGLE_REFRESH_TOKEN: &str = "GOOGLE_REFRESH_TOKEN";

pub const REQUIRED_ENV_VARS: &[&str] =
    &[TODOIST_API_KEY, GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET, GOOGLE_REFRESH_TOKEN];

// Names of optional environment variables
pub const OPTIONAL_ENV_VARS: &[&str] = &["RUST_LOG", "TODOSYNC_CONFIG_PATH"];

/// Google OAuth client identity plus the long-lived refresh token
#[derive(Debug)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
}

/// Everything the sync needs to authenticate against both services
#[derive(Debug)]
pub struct Credentials {
    pub todoist_api_key: SecretString,
    pub google: GoogleCredentials,
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read credentials through `lookup`, reporting every missing variable at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let missing: Vec<&str> =
            REQUIRED_ENV_VARS.iter().copied().filter(|name| read(*name).is_none()).collect();
        if !missing.is_empty() {
            return Err(anyhow!("Missing required environment variables: {}", missing.join(", ")));
        }

        let secret = |name: &str| SecretString::from(read(name).unwrap_or_default());
        Ok(Self {
            todoist_api_key: secret(TODOIST_API_KEY),
            google: GoogleCredentials {
                client_id: read(GOOGLE_CLIENT_ID).unwrap_or_default(),
                client_secret: secret(GOOGLE_CLIENT_SECRET),
                refresh_token: secret(GOOGLE_REFRESH_TOKEN),
            },
        })
    }
}

/// Outcome of looking for a `.env` file
pub type EnvFileResult = std::result::Result<PathBuf, dotenvy::Error>;

/// Load `.env` from the working directory or one of its parents.
///
/// Runs before the logger exists so `RUST_LOG` can come from the file; report
/// the outcome with [`log_env_file`] once logging is up.
pub fn load_env_file() -> EnvFileResult {
    dotenvy::dotenv()
}

pub fn load_env_from(path: &Path) -> EnvFileResult {
    dotenvy::from_path(path).map(|()| path.to_path_buf())
}

pub fn log_env_file(loaded: &EnvFileResult) {
    match loaded {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    }
}

/// Write a `.env` skeleton listing the variables the tool reads.
pub fn create_env_template(path: &Path) -> io::Result<bool> {
    // Don't overwrite existing .env file
    if path.exists() {
        return Ok(false);
    }

    let mut file = File::create(path)?;

    for var in REQUIRED_ENV_VARS {
        writeln!(file, "{}=", var)?;
    }

    for var in OPTIONAL_ENV_VARS {
        writeln!(file, "# {}=", var)?;
    }

    Ok(true)
}
