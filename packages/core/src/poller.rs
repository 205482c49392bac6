use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{error, info, warn};

use crate::controller::Controller;
use crate::error::AppError;

// ============================================================
// CONFIG & OUTCOMES
// ============================================================

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Where to start syncing, overriding any stored cursor. Applied to
    /// each chain until that chain completes one sync.
    pub sync_start_timestamp: Option<i64>,
    pub poll_interval: Duration,
}

/// What one round did for one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainSyncOutcome {
    Synced { from: u64, to: u64 },
    UpToDate,
    Failed(String),
}

// ============================================================
// POLLING LOOP
// ============================================================

/// Advances every configured chain's cursor to one block behind its head.
///
/// Chains are visited one after another and each owns its own cursor, so no
/// two writers ever race on the same chain.
pub struct Poller {
    controller: Controller,
    config: PollerConfig,
    /// Chains that have not yet synced from `sync_start_timestamp`.
    override_pending: BTreeSet<String>,
}

impl Poller {
    pub fn new(controller: Controller, config: PollerConfig) -> Self {
        let override_pending = match config.sync_start_timestamp {
            Some(_) => controller.chains().slugs().map(String::from).collect(),
            None => BTreeSet::new(),
        };
        Self {
            controller,
            config,
            override_pending,
        }
    }

    /// Runs rounds until `shutdown` flips to `true` (or its sender is dropped).
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Fee polling started for {} chains (interval: {}s)",
            self.controller.chains().len(),
            self.config.poll_interval.as_secs()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.run_round().await;

            tokio::select! {
                _ = time::sleep(self.config.poll_interval) => {}
                _ = shutdown.changed() => {
                    info!("Shutdown signal received. Stopping polling.");
                    break;
                }
            }
        }

        info!("Fee polling stopped cleanly");
    }

    /// One pass over every chain. Failures are logged and reported per chain;
    /// they never stop the round.
    pub async fn run_round(&mut self) -> Vec<(String, ChainSyncOutcome)> {
        let slugs: Vec<String> = self.controller.chains().slugs().map(String::from).collect();
        let mut outcomes = Vec::with_capacity(slugs.len());

        for chain in slugs {
            let pending = self.override_pending.contains(&chain);
            let sync_start = self.config.sync_start_timestamp.filter(|_| pending);

            let outcome = match self.sync_chain(&chain, sync_start).await {
                Ok(outcome) => {
                    self.override_pending.remove(&chain);
                    outcome
                }
                Err(err) => {
                    error!("Fee polling error on {}: {}", chain, err);
                    if pending {
                        warn!("Sync start override kept for {} until it syncs", chain);
                    }
                    ChainSyncOutcome::Failed(err.to_string())
                }
            };
            outcomes.push((chain, outcome));
        }

        outcomes
    }

    async fn sync_chain(
        &self,
        chain: &str,
        sync_start: Option<i64>,
    ) -> Result<ChainSyncOutcome, AppError> {
        let client = self.controller.client(chain)?;

        // One block of lag keeps us off a tip that may still reorg.
        let end = client.current_height().await?.saturating_sub(1);

        let start = match sync_start {
            Some(timestamp) => self.controller.resolver().resolve(chain, timestamp).await?,
            None => match self.controller.store().get_cursor(chain).await? {
                Some(cursor) => cursor,
                None => end.saturating_sub(1),
            },
        };

        if start >= end {
            return Ok(ChainSyncOutcome::UpToDate);
        }

        let summary = self.controller.backfill_range(chain, start, end).await?;
        self.controller.store().put_cursor(chain, end).await?;

        info!(
            "Synced {} blocks {}..={} ({} fetched, {} already stored)",
            chain, start, end, summary.fetched, summary.existing
        );
        Ok(ChainSyncOutcome::Synced {
            from: start,
            to: end,
        })
    }
}
