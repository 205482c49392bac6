//! Service configuration.
//!
//! Values come from the environment (a `.env` file is loaded first by
//! `main`) and can be overridden on the command line.

use std::time::Duration;

use clap::Parser;

use crate::error::AppError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://gas_fees.db";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 10;
pub const DEFAULT_RPC_TIMEOUT_SECONDS: u64 = 15;
pub const DEFAULT_RPC_MAX_ATTEMPTS: u32 = 3;

/// Command-line overrides. Anything left unset falls back to the
/// environment.
#[derive(Debug, Default, Parser)]
#[command(name = "gas-fee-oracle", about = "Multi-chain base fee history and validity oracle")]
pub struct Cli {
    /// HTTP port to listen on.
    #[arg(long)]
    pub port: Option<u16>,

    /// SQLite connection string.
    #[arg(long)]
    pub database_url: Option<String>,

    /// Unix timestamp to start syncing from on the first poll round.
    #[arg(long)]
    pub sync_start_timestamp: Option<i64>,

    /// Seconds to sleep between poll rounds.
    #[arg(long)]
    pub poll_interval_seconds: Option<u64>,

    /// Serve queries only; do not run the poller.
    #[arg(long, conflicts_with = "no_server")]
    pub no_poller: bool,

    /// Run the poller only; do not start the HTTP server.
    #[arg(long)]
    pub no_server: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEndpoint {
    pub slug: String,
    pub rpc_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub poll_interval_seconds: u64,
    pub sync_start_timestamp: Option<i64>,
    pub rpc_timeout_seconds: u64,
    pub rpc_max_attempts: u32,
    pub chains: Vec<ChainEndpoint>,
    pub run_poller: bool,
    pub run_server: bool,
}

impl Config {
    /// Builds the config from process environment variables and CLI flags.
    pub fn load(cli: &Cli) -> Result<Self, AppError> {
        Self::from_lookup(cli, |key| std::env::var(key).ok())
    }

    /// Builds the config reading variables through `lookup`.
    pub fn from_lookup(
        cli: &Cli,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let database_url = cli
            .database_url
            .clone()
            .or_else(|| lookup("DATABASE_URL"))
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let port = match cli.port {
            Some(port) => port,
            None => parse_var(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT),
        };

        let poll_interval_seconds = match cli.poll_interval_seconds {
            Some(secs) => secs,
            None => parse_var(&lookup, "POLL_INTERVAL_SECONDS")?
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS),
        };
        if poll_interval_seconds == 0 {
            return Err(AppError::Config(
                "POLL_INTERVAL_SECONDS must be greater than zero".into(),
            ));
        }

        let sync_start_timestamp = match cli.sync_start_timestamp {
            Some(ts) => Some(ts),
            None => parse_var(&lookup, "SYNC_START_TIMESTAMP")?,
        };

        let rpc_timeout_seconds =
            parse_var(&lookup, "RPC_TIMEOUT_SECONDS")?.unwrap_or(DEFAULT_RPC_TIMEOUT_SECONDS);

        let rpc_max_attempts =
            parse_var(&lookup, "RPC_MAX_ATTEMPTS")?.unwrap_or(DEFAULT_RPC_MAX_ATTEMPTS);
        if rpc_max_attempts == 0 {
            return Err(AppError::Config(
                "RPC_MAX_ATTEMPTS must be greater than zero".into(),
            ));
        }

        let chains = match lookup("CHAIN_RPC_URLS") {
            Some(raw) => parse_chain_endpoints(&raw)?,
            None => {
                return Err(AppError::Config(
                    "CHAIN_RPC_URLS is required (format: slug=url,slug=url)".into(),
                ))
            }
        };

        Ok(Self {
            database_url,
            port,
            poll_interval_seconds,
            sync_start_timestamp,
            rpc_timeout_seconds,
            rpc_max_attempts,
            chains,
            run_poller: !cli.no_poller,
            run_server: !cli.no_server,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_seconds)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, AppError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{} has invalid value {:?}", key, raw))),
    }
}

/// Parses `slug=url,slug=url`. Slugs must be unique and non-empty.
pub fn parse_chain_endpoints(raw: &str) -> Result<Vec<ChainEndpoint>, AppError> {
    let mut endpoints: Vec<ChainEndpoint> = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (slug, url) = entry.split_once('=').ok_or_else(|| {
            AppError::Config(format!("chain entry {:?} is not slug=url", entry))
        })?;
        let (slug, url) = (slug.trim(), url.trim());

        if slug.is_empty() || url.is_empty() {
            return Err(AppError::Config(format!(
                "chain entry {:?} is not slug=url",
                entry
            )));
        }
        if endpoints.iter().any(|e| e.slug == slug) {
            return Err(AppError::Config(format!("chain {} configured twice", slug)));
        }

        endpoints.push(ChainEndpoint {
            slug: slug.to_string(),
            rpc_url: url.to_string(),
        });
    }

    if endpoints.is_empty() {
        return Err(AppError::Config("no chains configured".into()));
    }
    Ok(endpoints)
}
