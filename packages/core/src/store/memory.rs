//! [`FeeStore`] kept in memory. For testing only.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{FeeStore, Result};
use crate::error::StoreError;
use crate::types::{window_bounds, FeeRecord};

#[derive(Debug, Default)]
pub struct InMemoryFeeStore {
    records: Mutex<BTreeMap<(String, u64), FeeRecord>>,
    cursors: Mutex<HashMap<String, u64>>,
    /// Number of `put` calls, including ones that hit an existing height.
    pub puts: AtomicUsize,
    /// Number of `put_cursor` calls.
    pub cursor_puts: AtomicUsize,
    /// When set, every call fails as if the database were unreachable.
    unavailable: AtomicBool,
}

impl InMemoryFeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn heights(&self, chain: &str) -> Vec<u64> {
        self.records
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == chain)
            .map(|(_, h)| *h)
            .collect()
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn in_window(&self, chain: &str, timestamp: i64) -> Vec<FeeRecord> {
        let (start, end) = window_bounds(timestamp);
        let mut records: Vec<FeeRecord> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.chain_slug == chain && r.timestamp >= start && r.timestamp <= end)
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.timestamp, r.block_number));
        records
    }
}

#[async_trait]
impl FeeStore for InMemoryFeeStore {
    async fn get_by_height(&self, chain: &str, block_number: u64) -> Result<Option<FeeRecord>> {
        self.check()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(chain.to_string(), block_number))
            .cloned())
    }

    async fn put(&self, record: &FeeRecord) -> Result<()> {
        self.check()?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .entry((record.chain_slug.clone(), record.block_number))
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn get_nearest(&self, chain: &str, timestamp: i64) -> Result<Option<FeeRecord>> {
        self.check()?;
        Ok(self
            .in_window(chain, timestamp)
            .into_iter()
            .min_by_key(|r| ((r.timestamp - timestamp).abs(), r.block_number)))
    }

    async fn get_window(&self, chain: &str, timestamp: i64) -> Result<Vec<FeeRecord>> {
        self.check()?;
        Ok(self.in_window(chain, timestamp))
    }

    async fn get_cursor(&self, chain: &str) -> Result<Option<u64>> {
        self.check()?;
        Ok(self.cursors.lock().unwrap().get(chain).copied())
    }

    async fn put_cursor(&self, chain: &str, block_number: u64) -> Result<()> {
        self.check()?;
        self.cursor_puts.fetch_add(1, Ordering::SeqCst);
        self.cursors
            .lock()
            .unwrap()
            .insert(chain.to_string(), block_number);
        Ok(())
    }
}
