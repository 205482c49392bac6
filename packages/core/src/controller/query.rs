use tracing::info;

use super::{validate_timestamp, Controller};
use crate::error::AppError;
use crate::types::{window_bounds, FeeRecord, QuotedFee};

impl Controller {
    /// Returns the stored observation nearest to `timestamp`, with an
    /// expiration ten minutes after its block.
    ///
    /// On a miss the surrounding window is backfilled once and the store is
    /// asked again. A second miss is `NotFound`.
    pub async fn fee_near(&self, chain: &str, timestamp: i64) -> Result<QuotedFee, AppError> {
        self.client(chain)?;
        validate_timestamp(timestamp)?;

        if let Some(record) = self.store.get_nearest(chain, timestamp).await? {
            return Ok(record.into());
        }

        let (start_time, end_time) = window_bounds(timestamp);
        let start_block = self.resolver.resolve(chain, start_time).await?;
        let end_block = self.resolver.resolve(chain, end_time).await?;
        info!(
            "No {} fee near {}, backfilling blocks {}..={}",
            chain, timestamp, start_block, end_block
        );
        self.backfill_range(chain, start_block, end_block).await?;

        self.store
            .get_nearest(chain, timestamp)
            .await?
            .map(QuotedFee::from)
            .ok_or_else(|| {
                AppError::NotFound(format!("no {} fee data near timestamp {}", chain, timestamp))
            })
    }

    /// Every stored record in the window around `timestamp`, oldest first.
    /// Relies on the poller having synced the window already.
    pub async fn fee_records_in_window(
        &self,
        chain: &str,
        timestamp: i64,
    ) -> Result<Vec<FeeRecord>, AppError> {
        self.client(chain)?;
        validate_timestamp(timestamp)?;
        Ok(self.store.get_window(chain, timestamp).await?)
    }
}
