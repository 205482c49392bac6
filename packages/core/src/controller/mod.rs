//! Fee history orchestration.
//!
//! [`Controller`] ties the chain clients, the store, and the date resolver
//! together. Every operation reads and writes through the store; the
//! controller itself holds no fee state between calls.
//!
//! - [`backfill`]: sequential block-range sync with per-height dedup
//! - [`query`]: nearest-record and window queries, backfilling on miss
//! - [`validity`]: candidate fee check against the window's history

use std::sync::Arc;

use crate::chain::{ChainClient, ChainRegistry};
use crate::error::AppError;
use crate::resolver::BlockResolver;
use crate::store::FeeStore;
use crate::types::{QUOTE_VALIDITY_SECS, WINDOW_HALF_WIDTH_SECS};

pub mod backfill;
pub mod query;
pub mod validity;

#[derive(Clone)]
pub struct Controller {
    chains: ChainRegistry,
    store: Arc<dyn FeeStore>,
    resolver: Arc<dyn BlockResolver>,
}

impl Controller {
    pub fn new(
        chains: ChainRegistry,
        store: Arc<dyn FeeStore>,
        resolver: Arc<dyn BlockResolver>,
    ) -> Self {
        Self {
            chains,
            store,
            resolver,
        }
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    pub fn store(&self) -> &Arc<dyn FeeStore> {
        &self.store
    }

    pub fn resolver(&self) -> &Arc<dyn BlockResolver> {
        &self.resolver
    }

    /// Looks up the client for `chain`, rejecting unconfigured slugs as
    /// invalid input.
    pub(crate) fn client(&self, chain: &str) -> Result<&Arc<dyn ChainClient>, AppError> {
        if chain.trim().is_empty() {
            return Err(AppError::InvalidInput("chain is required".into()));
        }
        Ok(self.chains.get(chain)?)
    }
}

pub(crate) fn validate_timestamp(timestamp: i64) -> Result<(), AppError> {
    if timestamp <= 0 {
        return Err(AppError::InvalidInput(format!(
            "timestamp must be positive Unix seconds, got {}",
            timestamp
        )));
    }
    let reach = WINDOW_HALF_WIDTH_SECS.max(QUOTE_VALIDITY_SECS);
    if timestamp.checked_add(reach).is_none() {
        return Err(AppError::InvalidInput(format!(
            "timestamp {} is out of range",
            timestamp
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::services::mock_chain::{MockChainClient, MockResolver};
    use crate::store::InMemoryFeeStore;

    pub struct Harness {
        pub controller: Controller,
        pub chain: Arc<MockChainClient>,
        pub store: Arc<InMemoryFeeStore>,
        pub resolver: Arc<MockResolver>,
    }

    /// A controller over a single mock `ethereum` chain and an empty store.
    pub fn harness(chain: MockChainClient) -> Harness {
        let chain = Arc::new(chain);
        let store = Arc::new(InMemoryFeeStore::new());
        let resolver = Arc::new(MockResolver::new());
        let controller = Controller::new(
            ChainRegistry::new().with_chain("ethereum", chain.clone()),
            store.clone(),
            resolver.clone(),
        );
        Harness {
            controller,
            chain,
            store,
            resolver,
        }
    }
}
