//! [`FeeStore`] backed by SQLite.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use num_bigint::BigUint;
use sqlx::SqlitePool;
use tracing::instrument;

use super::{FeeStore, Result};
use crate::error::StoreError;
use crate::types::{window_bounds, FeeData, FeeRecord};

/// SQLite storage implementation.
#[derive(Debug, Clone)]
pub struct SqliteFeeStore {
    pool: SqlitePool,
}

impl SqliteFeeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FeeRecordRow {
    chain_slug: String,
    block_number: i64,
    timestamp: i64,
    base_fee_per_gas: String,
    fee_data: String,
}

impl TryFrom<FeeRecordRow> for FeeRecord {
    type Error = StoreError;

    fn try_from(row: FeeRecordRow) -> Result<Self> {
        let block_number = u64::try_from(row.block_number)
            .map_err(|_| StoreError::Corrupt(format!("negative block number {}", row.block_number)))?;
        let base_fee_per_gas = BigUint::from_str(&row.base_fee_per_gas).map_err(|e| {
            StoreError::Corrupt(format!("base fee {:?}: {}", row.base_fee_per_gas, e))
        })?;
        let extra: BTreeMap<String, serde_json::Value> = serde_json::from_str(&row.fee_data)
            .map_err(|e| StoreError::Corrupt(format!("fee data: {}", e)))?;

        Ok(FeeRecord {
            chain_slug: row.chain_slug,
            block_number,
            timestamp: row.timestamp,
            fee_data: FeeData {
                base_fee_per_gas,
                extra,
            },
        })
    }
}

fn height_param(block_number: u64) -> Result<i64> {
    i64::try_from(block_number)
        .map_err(|_| StoreError::Corrupt(format!("block number {} out of range", block_number)))
}

#[async_trait]
impl FeeStore for SqliteFeeStore {
    #[instrument(skip(self))]
    async fn get_by_height(&self, chain: &str, block_number: u64) -> Result<Option<FeeRecord>> {
        let row = sqlx::query_as::<_, FeeRecordRow>(
            "SELECT chain_slug, block_number, timestamp, base_fee_per_gas, fee_data
             FROM fee_records
             WHERE chain_slug = ? AND block_number = ?",
        )
        .bind(chain)
        .bind(height_param(block_number)?)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FeeRecord::try_from).transpose()
    }

    #[instrument(skip_all, fields(chain = %record.chain_slug, block = record.block_number))]
    async fn put(&self, record: &FeeRecord) -> Result<()> {
        let extra = serde_json::to_string(&record.fee_data.extra)
            .map_err(|e| StoreError::Corrupt(format!("fee data: {}", e)))?;

        sqlx::query(
            "INSERT INTO fee_records
             (chain_slug, block_number, timestamp, base_fee_per_gas, fee_data)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (chain_slug, block_number) DO NOTHING",
        )
        .bind(&record.chain_slug)
        .bind(height_param(record.block_number)?)
        .bind(record.timestamp)
        .bind(record.fee_data.base_fee_per_gas.to_string())
        .bind(extra)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_nearest(&self, chain: &str, timestamp: i64) -> Result<Option<FeeRecord>> {
        let (start, end) = window_bounds(timestamp);
        let row = sqlx::query_as::<_, FeeRecordRow>(
            "SELECT chain_slug, block_number, timestamp, base_fee_per_gas, fee_data
             FROM fee_records
             WHERE chain_slug = ? AND timestamp BETWEEN ? AND ?
             ORDER BY ABS(timestamp - ?) ASC, block_number ASC
             LIMIT 1",
        )
        .bind(chain)
        .bind(start)
        .bind(end)
        .bind(timestamp)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FeeRecord::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn get_window(&self, chain: &str, timestamp: i64) -> Result<Vec<FeeRecord>> {
        let (start, end) = window_bounds(timestamp);
        let rows = sqlx::query_as::<_, FeeRecordRow>(
            "SELECT chain_slug, block_number, timestamp, base_fee_per_gas, fee_data
             FROM fee_records
             WHERE chain_slug = ? AND timestamp BETWEEN ? AND ?
             ORDER BY timestamp ASC, block_number ASC",
        )
        .bind(chain)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FeeRecord::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn get_cursor(&self, chain: &str) -> Result<Option<u64>> {
        let cursor: Option<i64> = sqlx::query_scalar(
            "SELECT last_synced_block_number FROM sync_cursors WHERE chain_slug = ?",
        )
        .bind(chain)
        .fetch_optional(&self.pool)
        .await?;

        cursor
            .map(|c| {
                u64::try_from(c).map_err(|_| StoreError::Corrupt(format!("negative cursor {}", c)))
            })
            .transpose()
    }

    #[instrument(skip(self))]
    async fn put_cursor(&self, chain: &str, block_number: u64) -> Result<()> {
        sqlx::query(
            "INSERT INTO sync_cursors (chain_slug, last_synced_block_number)
             VALUES (?, ?)
             ON CONFLICT (chain_slug) DO UPDATE
             SET last_synced_block_number = excluded.last_synced_block_number",
        )
        .bind(chain)
        .bind(height_param(block_number)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
