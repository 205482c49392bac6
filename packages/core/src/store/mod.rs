//! Durable storage for fee observations and per-chain sync cursors.
//!
//! The store is the single source of truth: the controller and poller keep
//! no copies of records or cursors between calls.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::FeeRecord;

#[cfg(test)]
pub mod memory;
pub mod sqlite;

#[cfg(test)]
pub use memory::InMemoryFeeStore;
pub use sqlite::SqliteFeeStore;

pub type Result<T> = core::result::Result<T, StoreError>;

/// Storage API for fee records and sync cursors.
#[async_trait]
pub trait FeeStore: Send + Sync {
    /// Reads the record stored for `block_number` on `chain`.
    async fn get_by_height(&self, chain: &str, block_number: u64) -> Result<Option<FeeRecord>>;

    /// Persists a record. A record already stored for the same height is kept.
    async fn put(&self, record: &FeeRecord) -> Result<()>;

    /// Reads the record closest in time to `timestamp`, if one lies within
    /// the query window.
    async fn get_nearest(&self, chain: &str, timestamp: i64) -> Result<Option<FeeRecord>>;

    /// Reads every record within the query window around `timestamp`,
    /// ordered by timestamp ascending.
    async fn get_window(&self, chain: &str, timestamp: i64) -> Result<Vec<FeeRecord>>;

    /// Reads the highest block height synced for `chain`.
    async fn get_cursor(&self, chain: &str) -> Result<Option<u64>>;

    /// Writes the highest block height synced for `chain`.
    async fn put_cursor(&self, chain: &str, block_number: u64) -> Result<()>;
}
