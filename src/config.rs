use anyhow::{Context, Result, ensure};
use clap::Parser;
use std::{env, fmt::Display, str::FromStr};

use crate::services::item_service::DEFAULT_PAGE_SIZE;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub page_size: u32,
}

/// What the process does once the database is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Serve,
    Migrate,
    Seed(u32),
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Inventory item catalog API")]
pub struct Args {
    /// Host to bind to (overrides ITEMS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides ITEMS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides ITEMS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Items per listing page (overrides ITEMS_PAGE_SIZE)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Run migrations and exit
    #[arg(long, conflicts_with = "seed")]
    pub migrate: bool,

    /// Insert COUNT sample items and exit
    #[arg(long, value_name = "COUNT", num_args = 0..=1, default_missing_value = "10")]
    pub seed: Option<u32>,
}

impl Args {
    pub fn run_mode(&self) -> RunMode {
        match (self.migrate, self.seed) {
            (true, _) => RunMode::Migrate,
            (false, Some(count)) => RunMode::Seed(count),
            (false, None) => RunMode::Serve,
        }
    }
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and run mode.
    pub fn from_env_and_args() -> Result<(Self, RunMode)> {
        let args = Args::parse();
        let mode = args.run_mode();
        Ok((Self::from_args(args)?, mode))
    }

    /// Merge parsed CLI args over the environment.
    pub fn from_args(args: Args) -> Result<Self> {
        let env_host = env::var("ITEMS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_or("ITEMS_PORT", 8000u16)?;
        let env_db = env::var("ITEMS_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/items.db".into());
        let env_page_size = env_or("ITEMS_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            page_size: args.page_size.unwrap_or(env_page_size),
        };
        ensure!(cfg.page_size >= 1, "page size must be at least 1");

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read and parse `key`, falling back to `default` when it is unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("{}", err))
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("items-service").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn flags_override_environment() {
        let cfg = AppConfig::from_args(args(&[
            "--host",
            "127.0.0.1",
            "--port",
            "9100",
            "--database-url",
            "sqlite::memory:",
            "--page-size",
            "25",
        ]))
        .unwrap();

        assert_eq!(cfg.addr(), "127.0.0.1:9100");
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.page_size, 25);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(AppConfig::from_args(args(&["--page-size", "0"])).is_err());
    }

    #[test]
    fn run_modes() {
        assert_eq!(args(&[]).run_mode(), RunMode::Serve);
        assert_eq!(args(&["--migrate"]).run_mode(), RunMode::Migrate);
        assert_eq!(args(&["--seed"]).run_mode(), RunMode::Seed(10));
        assert_eq!(args(&["--seed", "3"]).run_mode(), RunMode::Seed(3));
        assert!(
            Args::try_parse_from(["items-service", "--migrate", "--seed", "2"]).is_err()
        );
    }
}
