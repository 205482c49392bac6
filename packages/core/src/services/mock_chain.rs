//! Mock chain client for testing
//!
//! Implements `ChainClient` and `BlockResolver` with configurable responses
//! so tests can exercise the backfiller, poller, and query paths without a
//! live RPC node.
//!
//! Gated behind `#[cfg(test)]`, never compiled into production builds.

use async_trait::async_trait;
use num_bigint::BigUint;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::chain::ChainClient;
use crate::error::ChainError;
use crate::resolver::BlockResolver;
use crate::types::{BlockFee, FeeData};

/// Timestamp of block 0 on every mock chain.
pub const MOCK_GENESIS_TIMESTAMP: i64 = 1_699_990_000;
/// Seconds between consecutive mock blocks.
pub const MOCK_BLOCK_TIME: i64 = 12;

/// A configurable mock implementation of `ChainClient`.
///
/// Block `h` has timestamp `MOCK_GENESIS_TIMESTAMP + h * MOCK_BLOCK_TIME`
/// and, unless overridden, a base fee of `1 gwei + h` wei.
pub struct MockChainClient {
    head: AtomicU64,
    fees: Mutex<HashMap<u64, BigUint>>,
    failing_heights: Mutex<HashSet<u64>>,
    unavailable: AtomicBool,
    /// Heights passed to `fee_at`, in call order.
    fetched: Mutex<Vec<u64>>,
    /// Tracks total number of `current_height` calls.
    pub head_calls: AtomicUsize,
}

impl MockChainClient {
    /// Create a healthy mock whose head is at `head`.
    pub fn new(head: u64) -> Self {
        Self {
            head: AtomicU64::new(head),
            fees: Mutex::new(HashMap::new()),
            failing_heights: Mutex::new(HashSet::new()),
            unavailable: AtomicBool::new(false),
            fetched: Mutex::new(Vec::new()),
            head_calls: AtomicUsize::new(0),
        }
    }

    /// Override the base fee reported for `height`.
    pub fn with_fee(self, height: u64, fee: impl Into<BigUint>) -> Self {
        self.fees.lock().unwrap().insert(height, fee.into());
        self
    }

    /// Make `fee_at(height)` fail with `ChainError::Unavailable`.
    pub fn with_failing_height(self, height: u64) -> Self {
        self.failing_heights.lock().unwrap().insert(height);
        self
    }

    /// Make every call fail with `ChainError::Unavailable`.
    pub fn with_unavailable(self, unavailable: bool) -> Self {
        self.set_unavailable(unavailable);
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    /// Heights fetched through `fee_at` so far, in call order.
    pub fn fetched(&self) -> Vec<u64> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn fee_calls(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }

    pub fn timestamp_of(height: u64) -> i64 {
        MOCK_GENESIS_TIMESTAMP + height as i64 * MOCK_BLOCK_TIME
    }

    fn down(&self) -> ChainError {
        ChainError::Unavailable {
            chain: "mock".into(),
            message: "simulated outage".into(),
        }
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn current_height(&self) -> Result<u64, ChainError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(self.down());
        }
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn fee_at(&self, height: u64) -> Result<BlockFee, ChainError> {
        self.fetched.lock().unwrap().push(height);
        if self.unavailable.load(Ordering::SeqCst)
            || self.failing_heights.lock().unwrap().contains(&height)
        {
            return Err(self.down());
        }

        let fee = self
            .fees
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .unwrap_or_else(|| BigUint::from(1_000_000_000u64 + height));

        Ok(BlockFee {
            timestamp: Self::timestamp_of(height),
            fee_data: FeeData::new(fee),
        })
    }
}

/// A `BlockResolver` that maps timestamps onto the mock chain's block
/// schedule and records every request.
#[derive(Default)]
pub struct MockResolver {
    requests: Mutex<Vec<(String, i64)>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(chain, timestamp)` pairs resolved so far, in call order.
    pub fn requests(&self) -> Vec<(String, i64)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlockResolver for MockResolver {
    async fn resolve(&self, chain: &str, unix_seconds: i64) -> Result<u64, ChainError> {
        self.requests
            .lock()
            .unwrap()
            .push((chain.to_string(), unix_seconds));
        let offset = (unix_seconds - MOCK_GENESIS_TIMESTAMP).max(0);
        Ok((offset / MOCK_BLOCK_TIME) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_configured_head() {
        let mock = MockChainClient::new(105);
        assert_eq!(mock.current_height().await.unwrap(), 105);

        mock.set_head(110);
        assert_eq!(mock.current_height().await.unwrap(), 110);
        assert_eq!(mock.head_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn default_fee_and_timestamp_follow_height() {
        let mock = MockChainClient::new(10);
        let block = mock.fee_at(3).await.unwrap();
        assert_eq!(block.timestamp, MOCK_GENESIS_TIMESTAMP + 36);
        assert_eq!(block.fee_data.base_fee_per_gas, BigUint::from(1_000_000_003u64));
    }

    #[tokio::test]
    async fn overridden_fee_is_returned() {
        let mock = MockChainClient::new(10).with_fee(4, 7u32);
        let block = mock.fee_at(4).await.unwrap();
        assert_eq!(block.fee_data.base_fee_per_gas, BigUint::from(7u32));
    }

    #[tokio::test]
    async fn failing_height_errors_but_is_recorded() {
        let mock = MockChainClient::new(10).with_failing_height(2);
        assert!(matches!(
            mock.fee_at(2).await,
            Err(ChainError::Unavailable { .. })
        ));
        assert!(mock.fee_at(3).await.is_ok());
        assert_eq!(mock.fetched(), vec![2, 3]);
    }

    #[tokio::test]
    async fn unavailable_mock_fails_every_call() {
        let mock = MockChainClient::new(10).with_unavailable(true);
        assert!(mock.current_height().await.is_err());
        assert!(mock.fee_at(1).await.is_err());
    }

    #[tokio::test]
    async fn resolver_maps_timestamps_onto_schedule() {
        let resolver = MockResolver::new();
        let height = resolver
            .resolve("ethereum", MockChainClient::timestamp_of(500) + 5)
            .await
            .unwrap();
        assert_eq!(height, 500);
        assert_eq!(resolver.resolve("ethereum", 0).await.unwrap(), 0);
        assert_eq!(resolver.requests().len(), 2);
    }
}
