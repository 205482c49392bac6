//! Per-chain RPC access.
//!
//! The controller only needs two things from a chain: its current head
//! height and the fee snapshot of a given block. [`ChainClient`] is that
//! seam; [`RpcChainClient`] is the JSON-RPC implementation used in
//! production.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ChainError;
use crate::types::BlockFee;

pub mod retry;
pub mod rpc;

pub use rpc::RpcChainClient;

/// Read access to one chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current head block height.
    async fn current_height(&self) -> Result<u64, ChainError>;

    /// Timestamp and fee data of the block at `height`.
    async fn fee_at(&self, height: u64) -> Result<BlockFee, ChainError>;

    /// Timestamp of the block at `height`. Blocks older than the fee market
    /// have no base fee, so implementations should override this when they
    /// can read a timestamp without one.
    async fn block_timestamp(&self, height: u64) -> Result<i64, ChainError> {
        self.fee_at(height).await.map(|block| block.timestamp)
    }
}

/// Configured chains, keyed by slug. Iteration order is the slug order and
/// is the order the poller visits chains in.
#[derive(Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<String, Arc<dyn ChainClient>>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, slug: impl Into<String>, client: Arc<dyn ChainClient>) -> Self {
        self.insert(slug, client);
        self
    }

    pub fn insert(&mut self, slug: impl Into<String>, client: Arc<dyn ChainClient>) {
        self.chains.insert(slug.into(), client);
    }

    pub fn get(&self, slug: &str) -> Result<&Arc<dyn ChainClient>, ChainError> {
        self.chains
            .get(slug)
            .ok_or_else(|| ChainError::UnknownChain(slug.to_string()))
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }
}
