use crate::services::DEFAULT_CHUNK_SIZE;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, path::Path, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub chunk_size: usize,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Image gateway over a chunked object bucket")]
pub struct Args {
    /// Host to bind to (overrides IMAGE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides IMAGE_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Bytes per stored chunk (overrides IMAGE_STORE_CHUNK_SIZE)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Pool size (overrides IMAGE_STORE_MAX_CONNECTIONS)
    #[arg(long)]
    pub max_connections: Option<u32>,

    /// Seconds to wait for a database connection (overrides IMAGE_STORE_CONNECT_TIMEOUT_SECS)
    #[arg(long)]
    pub connect_timeout_secs: Option<u64>,

    /// Largest accepted upload body (overrides IMAGE_STORE_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("IMAGE_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_number("IMAGE_STORE_PORT", 3000u16)?;
        let env_db = env::var("IMAGE_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/go-fs.db".into());
        let env_chunk = env_number("IMAGE_STORE_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let env_max_conn = env_number("IMAGE_STORE_MAX_CONNECTIONS", 5u32)?;
        let env_timeout = env_number("IMAGE_STORE_CONNECT_TIMEOUT_SECS", 10u64)?;
        let env_max_upload = env_number("IMAGE_STORE_MAX_UPLOAD_BYTES", 16 * 1024 * 1024usize)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            chunk_size: args.chunk_size.unwrap_or(env_chunk),
            max_connections: args.max_connections.unwrap_or(env_max_conn),
            connect_timeout: Duration::from_secs(
                args.connect_timeout_secs.unwrap_or(env_timeout),
            ),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        };
        cfg.validate()?;

        Ok((cfg, args.migrate))
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk size must be greater than zero");
        }
        if self.max_connections == 0 {
            bail!("max connections must be greater than zero");
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Load `KEY=value` pairs from `path` into the process environment.
///
/// Variables already set are left untouched. Returns `Ok(false)` when the
/// file does not exist.
pub fn load_env_file(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => {
            tracing::info!("Loaded environment from {}", path.display());
            Ok(true)
        }
        Err(err) if err.not_found() => Ok(false),
        Err(err) => Err(err).with_context(|| format!("loading {}", path.display())),
    }
}

/// Read a numeric env var, falling back to `default` when unset.
fn env_number<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
