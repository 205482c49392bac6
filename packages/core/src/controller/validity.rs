use num_bigint::BigUint;

use super::Controller;
use crate::error::AppError;
use crate::types::{FeeRecord, FeeValidity};

impl Controller {
    /// Checks `base_fee_per_gas` against the fees observed around `timestamp`.
    ///
    /// `valid` is true when the candidate covers the base fee of at least one
    /// block in the window. The window minimum is returned alongside so the
    /// caller can apply a stricter check.
    pub async fn is_fee_valid(
        &self,
        chain: &str,
        timestamp: i64,
        base_fee_per_gas: BigUint,
    ) -> Result<FeeValidity, AppError> {
        let records = self.fee_records_in_window(chain, timestamp).await?;
        Ok(evaluate(&records, timestamp, base_fee_per_gas))
    }
}

/// Scans every record; on equal fees the later record wins the minimum.
fn evaluate(records: &[FeeRecord], timestamp: i64, candidate: BigUint) -> FeeValidity {
    let mut valid = false;
    let mut min: Option<&FeeRecord> = None;

    for record in records {
        let fee = record.base_fee_per_gas();
        if min.map_or(true, |m| fee <= m.base_fee_per_gas()) {
            min = Some(record);
        }
        if candidate >= *fee {
            valid = true;
        }
    }

    FeeValidity {
        valid,
        timestamp,
        base_fee_per_gas: candidate,
        min_fee: min.map(|m| m.base_fee_per_gas().clone()).unwrap_or_default(),
        min_fee_block_number: min.map_or(0, |m| m.block_number),
        min_fee_timestamp: min.map_or(0, |m| m.timestamp),
    }
}
