mod api;
mod chain;
mod config;
mod controller;
mod db;
mod error;
mod poller;
mod resolver;
mod services;
mod store;
mod types;

use std::future::Future;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::chain::retry::RetryPolicy;
use crate::chain::{ChainRegistry, RpcChainClient};
use crate::config::{Cli, Config};
use crate::controller::Controller;
use crate::error::{AppError, StoreError};
use crate::poller::{Poller, PollerConfig};
use crate::resolver::TimestampSearchResolver;
use crate::store::SqliteFeeStore;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gas_fee_oracle=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    let pool = db::create_pool(&config.database_url)
        .await
        .map_err(StoreError::from)?;
    let store = Arc::new(SqliteFeeStore::new(pool));

    let mut chains = ChainRegistry::new();
    for endpoint in &config.chains {
        let client = RpcChainClient::new(
            endpoint.slug.clone(),
            endpoint.rpc_url.clone(),
            config.rpc_timeout(),
        )?
        .with_retry_policy(RetryPolicy {
            max_attempts: config.rpc_max_attempts,
            ..RetryPolicy::default()
        });
        chains.insert(endpoint.slug.clone(), Arc::new(client));
        tracing::info!("Configured chain {}", endpoint.slug);
    }

    let resolver = Arc::new(TimestampSearchResolver::new(chains.clone()));
    let controller = Controller::new(chains, store, resolver);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(forward_shutdown(tokio::signal::ctrl_c(), shutdown_tx));

    let poller = if config.run_poller {
        let poller = Poller::new(
            controller.clone(),
            PollerConfig {
                sync_start_timestamp: config.sync_start_timestamp,
                poll_interval: config.poll_interval(),
            },
        );
        Some(tokio::spawn(poller.run(shutdown_rx.clone())))
    } else {
        None
    };

    if config.run_server {
        let addr = format!("0.0.0.0:{}", config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::Config(format!("cannot bind {}: {}", addr, e)))?;
        tracing::info!("Listening on {}", addr);

        let mut server_shutdown = shutdown_rx.clone();
        axum::serve(listener, api::router(controller))
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
            .map_err(|e| AppError::Server(e.to_string()))?;
    }

    if let Some(handle) = poller {
        if let Err(err) = handle.await {
            tracing::error!("Poller task failed: {}", err);
        }
    }

    tracing::info!("Shut down cleanly");
    Ok(())
}

/// Flips `shutdown` once `signal` fires. If the signal handler cannot be
/// installed the sender is held open forever, so nothing shuts down.
async fn forward_shutdown<F>(signal: F, shutdown: watch::Sender<bool>)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            tracing::info!("Shutdown signal received");
            let _ = shutdown.send(true);
        }
        Err(err) => {
            tracing::error!("Cannot listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    }
}
