//! Core data types shared by the store, chain clients, and controller.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Half-width of the query window around a reference timestamp, in seconds.
pub const WINDOW_HALF_WIDTH_SECS: i64 = 10 * 60;

/// How long a quoted fee stays usable after its block timestamp, in seconds.
pub const QUOTE_VALIDITY_SECS: i64 = 10 * 60;

/// Fee snapshot for one block.
///
/// Only `base_fee_per_gas` is interpreted; every other field the chain
/// reported is carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeData {
    #[serde(with = "decimal")]
    pub base_fee_per_gas: BigUint,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FeeData {
    pub fn new(base_fee_per_gas: BigUint) -> Self {
        Self {
            base_fee_per_gas,
            extra: BTreeMap::new(),
        }
    }
}

/// What a chain client reports for a single block height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFee {
    /// Block timestamp in Unix seconds.
    pub timestamp: i64,
    pub fee_data: FeeData,
}

/// One persisted fee observation. At most one exists per `(chain_slug, block_number)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRecord {
    pub chain_slug: String,
    pub block_number: u64,
    pub timestamp: i64,
    pub fee_data: FeeData,
}

impl FeeRecord {
    pub fn from_block(chain_slug: &str, block_number: u64, block: BlockFee) -> Self {
        Self {
            chain_slug: chain_slug.to_string(),
            block_number,
            timestamp: block.timestamp,
            fee_data: block.fee_data,
        }
    }

    pub fn base_fee_per_gas(&self) -> &BigUint {
        &self.fee_data.base_fee_per_gas
    }
}

/// A fee record handed to callers together with its staleness bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotedFee {
    pub expiration: i64,
    #[serde(flatten)]
    pub record: FeeRecord,
}

impl From<FeeRecord> for QuotedFee {
    fn from(record: FeeRecord) -> Self {
        Self {
            expiration: record.timestamp.saturating_add(QUOTE_VALIDITY_SECS),
            record,
        }
    }
}

/// Result of checking a candidate base fee against recent history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeValidity {
    pub valid: bool,
    pub timestamp: i64,
    #[serde(with = "decimal")]
    pub base_fee_per_gas: BigUint,
    #[serde(with = "decimal")]
    pub min_fee: BigUint,
    pub min_fee_block_number: u64,
    pub min_fee_timestamp: i64,
}

/// Inclusive `[start, end]` bounds of the window around `timestamp`,
/// clamped to the `i64` range.
pub fn window_bounds(timestamp: i64) -> (i64, i64) {
    (
        timestamp.saturating_sub(WINDOW_HALF_WIDTH_SECS),
        timestamp.saturating_add(WINDOW_HALF_WIDTH_SECS),
    )
}

/// Serialises `BigUint` as a base-10 string so JSON consumers never see a
/// lossy number.
pub mod decimal {
    use std::str::FromStr;

    use num_bigint::BigUint;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let raw = String::deserialize(deserializer)?;
        BigUint::from_str(raw.trim()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> FeeRecord {
        let mut fee_data = FeeData::new(BigUint::from(9_007_199_254_740_993u64));
        fee_data
            .extra
            .insert("gasUsed".into(), json!("0x1c9c380"));
        FeeRecord {
            chain_slug: "ethereum".into(),
            block_number: 18_000_000,
            timestamp: 1_700_000_000,
            fee_data,
        }
    }

    #[test]
    fn quoted_fee_expires_ten_minutes_after_block() {
        let quoted = QuotedFee::from(sample_record());
        assert_eq!(quoted.expiration, 1_700_000_600);
    }

    #[test]
    fn quoted_fee_serialises_flat_with_string_fee() {
        let value = serde_json::to_value(QuotedFee::from(sample_record())).unwrap();
        assert_eq!(value["chainSlug"], "ethereum");
        assert_eq!(value["blockNumber"], 18_000_000);
        assert_eq!(value["expiration"], 1_700_000_600);
        assert_eq!(value["feeData"]["baseFeePerGas"], "9007199254740993");
        assert_eq!(value["feeData"]["gasUsed"], "0x1c9c380");
    }

    #[test]
    fn fee_data_keeps_unknown_fields() {
        let raw = json!({
            "baseFeePerGas": "123456789012345678901234567890",
            "gasLimit": "0x1c9c380",
        });
        let fee_data: FeeData = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(
            fee_data.base_fee_per_gas.to_string(),
            "123456789012345678901234567890"
        );
        assert_eq!(serde_json::to_value(&fee_data).unwrap(), raw);
    }

    #[test]
    fn fee_data_rejects_non_numeric_fee() {
        let raw = json!({ "baseFeePerGas": "twelve" });
        assert!(serde_json::from_value::<FeeData>(raw).is_err());
    }

    #[test]
    fn window_is_symmetric() {
        assert_eq!(window_bounds(1_700_000_000), (1_699_999_400, 1_700_000_600));
    }

    #[test]
    fn window_and_expiration_clamp_at_the_edges() {
        assert_eq!(window_bounds(i64::MAX), (i64::MAX - 600, i64::MAX));
        assert_eq!(window_bounds(i64::MIN), (i64::MIN, i64::MIN + 600));

        let mut record = sample_record();
        record.timestamp = i64::MAX - 1;
        assert_eq!(QuotedFee::from(record).expiration, i64::MAX);
    }
}
