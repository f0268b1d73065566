use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    /// Storage backend API key. Required at startup; absence is a fatal
    /// configuration error, not a silent no-op.
    pub storage_api_key: String,
    /// Identity platform application id. Required at startup.
    pub identity_app_id: String,
    /// Identity platform application secret. Required at startup.
    pub identity_app_secret: String,
    pub identity_api_url: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "WALTUBE video storage and streaming API")]
pub struct Args {
    /// Host to bind to (overrides WALTUBE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides WALTUBE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where record payloads are stored (overrides WALTUBE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides WALTUBE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Identity platform base URL (overrides PRIVY_API_URL)
    #[arg(long)]
    pub identity_api_url: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into an AppConfig.
    ///
    /// Credentials come from the environment only. Missing credentials fail
    /// here, before anything binds or connects.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::from_env(args)
    }

    fn from_env(args: Args) -> Result<Self> {
        let env_host = env::var("WALTUBE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("WALTUBE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing WALTUBE_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading WALTUBE_PORT"),
        };
        let env_storage =
            env::var("WALTUBE_STORAGE_DIR").unwrap_or_else(|_| "./data/records".into());
        let env_db = env::var("WALTUBE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/waltube.db".into());
        let env_identity_url =
            env::var("PRIVY_API_URL").unwrap_or_else(|_| "https://auth.privy.io".into());

        let storage_api_key = require_env("TUSKY_API_KEY", "the storage backend API key")?;
        let identity_app_id = require_env("PRIVY_APP_ID", "the identity platform app id")?;
        let identity_app_secret =
            require_env("PRIVY_APP_SECRET", "the identity platform app secret")?;

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            storage_api_key,
            identity_app_id,
            identity_app_secret,
            identity_api_url: args.identity_api_url.unwrap_or(env_identity_url),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn require_env(name: &str, what: &str) -> Result<String> {
    let value = env::var(name)
        .with_context(|| format!("{name} environment variable is not set ({what} is required)"))?;
    if value.trim().is_empty() {
        anyhow::bail!("{name} environment variable is empty ({what} is required)");
    }
    Ok(value)
}
