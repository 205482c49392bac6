//! Date to block-height resolution.

use async_trait::async_trait;
use tracing::debug;

use crate::chain::{ChainClient, ChainRegistry};
use crate::error::ChainError;

/// Translates a Unix timestamp into a block height on a given chain.
#[async_trait]
pub trait BlockResolver: Send + Sync {
    async fn resolve(&self, chain: &str, unix_seconds: i64) -> Result<u64, ChainError>;
}

/// Resolves timestamps by binary search over block timestamps.
///
/// The result is the highest block whose timestamp is `<=` the target.
/// Targets before genesis resolve to 0; targets past the head resolve to
/// the head.
#[derive(Clone)]
pub struct TimestampSearchResolver {
    chains: ChainRegistry,
}

impl TimestampSearchResolver {
    pub fn new(chains: ChainRegistry) -> Self {
        Self { chains }
    }
}

async fn search(client: &dyn ChainClient, target: i64) -> Result<u64, ChainError> {
    let head = client.current_height().await?;
    if client.block_timestamp(head).await? <= target {
        return Ok(head);
    }
    if head == 0 || client.block_timestamp(0).await? > target {
        return Ok(0);
    }

    // ts(lo) <= target < ts(hi)
    let (mut lo, mut hi) = (0u64, head);
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if client.block_timestamp(mid).await? <= target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

#[async_trait]
impl BlockResolver for TimestampSearchResolver {
    async fn resolve(&self, chain: &str, unix_seconds: i64) -> Result<u64, ChainError> {
        let client = self.chains.get(chain)?;
        let height = search(client.as_ref(), unix_seconds).await?;
        debug!("Resolved {} timestamp {} to block {}", chain, unix_seconds, height);
        Ok(height)
    }
}
