use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use tracing::{debug, info};

use super::Controller;
use crate::error::AppError;
use crate::types::FeeRecord;

/// What a single `backfill_range` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    /// Heights fetched from the chain and persisted.
    pub fetched: u64,
    /// Heights already present in the store.
    pub existing: u64,
}

impl Controller {
    /// Syncs every height in `[start, end]` on `chain`, in ascending order.
    ///
    /// Heights already stored are skipped without an RPC call. A failure
    /// stops the range; heights persisted before it stay persisted, so the
    /// same range can simply be run again.
    pub async fn backfill_range(
        &self,
        chain: &str,
        start: u64,
        end: u64,
    ) -> Result<BackfillSummary, AppError> {
        let mut summary = BackfillSummary::default();
        if start > end {
            return Ok(summary);
        }

        info!(
            "Backfilling {} blocks {}..={} ({} blocks)",
            chain,
            start,
            end,
            end - start + 1
        );

        for height in start..=end {
            if self.sync_block(chain, height).await? {
                summary.fetched += 1;
            } else {
                summary.existing += 1;
            }
        }

        Ok(summary)
    }

    /// Direct point lookup. Never touches the chain.
    pub async fn fee_record_by_height(
        &self,
        chain: &str,
        block_number: u64,
    ) -> Result<Option<FeeRecord>, AppError> {
        Ok(self.store.get_by_height(chain, block_number).await?)
    }

    /// Ensures `height` is stored. Returns whether it had to be fetched.
    async fn sync_block(&self, chain: &str, height: u64) -> Result<bool, AppError> {
        if self.fee_record_by_height(chain, height).await?.is_some() {
            debug!("{} block {} already stored", chain, height);
            return Ok(false);
        }

        let client = self.client(chain)?;
        let block = client.fee_at(height).await?;
        let record = FeeRecord::from_block(chain, height, block);

        info!(
            "Storing {} block {}: base fee {} gwei, {}",
            chain,
            height,
            format_gwei(record.base_fee_per_gas()),
            describe_age(record.timestamp)
        );

        self.store.put(&record).await?;
        Ok(true)
    }
}

/// Renders a wei amount in gwei without going through floating point.
fn format_gwei(wei: &BigUint) -> String {
    let digits = wei.to_string();
    let padded = format!("{:0>10}", digits);
    let (whole, frac) = padded.split_at(padded.len() - 9);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    }
}

fn describe_age(timestamp: i64) -> String {
    match DateTime::<Utc>::from_timestamp(timestamp, 0) {
        Some(at) => {
            let age = Utc::now().signed_duration_since(at);
            format!("{} ({}s ago)", at.to_rfc3339(), age.num_seconds())
        }
        None => format!("timestamp {}", timestamp),
    }
}
