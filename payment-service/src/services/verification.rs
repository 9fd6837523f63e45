//! Payment verification against the chain oracle.
//!
//! Oracle access sits behind [`ChainOracle`] and transfer matching behind
//! [`TransferMatcher`], so tests can substitute fakes and the best-effort
//! event-log scan can later be replaced by a strict decoder without touching
//! callers.

use crate::models::RecordVerification;
use crate::services::database::Database;
use crate::services::metrics;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use service_core::error::AppError;
use std::sync::Arc;

/// Negative outcome for a transaction the chain has no successful record of.
pub const REASON_NOT_FOUND_OR_FAILED: &str = "Transaction not found or failed on chain.";

/// Negative outcome for a successful transaction with no usable transfer.
pub const REASON_NO_MATCHING_TRANSFER: &str =
    "No matching transfer to the platform address was found.";

/// Default decimal exponent for TRC20 USDT when the oracle omits it.
const DEFAULT_TOKEN_DECIMALS: u32 = 6;

/// Fixed comparison tolerance absorbing decimal drift from the oracle's
/// token-decimal conversion.
pub fn amount_tolerance() -> Decimal {
    Decimal::new(1, 4) // 0.0001
}

/// Chain-data source queried for transaction status and contents.
#[async_trait]
pub trait ChainOracle: Send + Sync {
    /// Fetch a transaction by id. `None` means the chain has no record of it.
    async fn transaction_by_id(&self, txid: &str) -> Result<Option<Value>, AppError>;
}

/// A transfer event matched against the platform address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedTransfer {
    pub to: String,
    pub amount: Decimal,
}

/// Finds a transfer to `destination` inside an oracle transaction document.
pub trait TransferMatcher: Send + Sync {
    fn find_matching_transfer(
        &self,
        tx: &Value,
        destination: &str,
        expected_amount: Option<Decimal>,
    ) -> Option<MatchedTransfer>;
}

/// Best-effort scan over the oracle's untyped event-log representation.
///
/// Provider payloads disagree on field names and nesting, so this walks the
/// whole document looking for transfer-shaped objects instead of parsing a
/// strict schema. A heuristic, not a guarantee.
#[derive(Debug, Clone, Default)]
pub struct HeuristicMatcher;

const DESTINATION_KEYS: &[&str] = &["to", "to_address", "toAddress", "transferToAddress"];
const AMOUNT_KEYS: &[&str] = &["value", "amount", "amount_str", "quant"];
const DECIMAL_KEYS: &[&str] = &["token_decimal", "tokenDecimal", "decimals", "tokenDecimals"];

impl HeuristicMatcher {
    fn transfer_from_object(
        obj: &serde_json::Map<String, Value>,
        destination: &str,
    ) -> Option<MatchedTransfer> {
        let to = DESTINATION_KEYS
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))?;
        if to != destination {
            return None;
        }

        let raw_amount = AMOUNT_KEYS.iter().find_map(|k| parse_raw_amount(obj.get(*k)?))?;
        let decimals = DECIMAL_KEYS
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_u64))
            .map(|d| d as u32)
            .unwrap_or(DEFAULT_TOKEN_DECIMALS);

        // Both fields come from untrusted oracle JSON; an exponent beyond
        // Decimal's scale or an amount past its mantissa is a non-match,
        // not a panic.
        let amount = Decimal::try_from_i128_with_scale(raw_amount, decimals).ok()?;

        Some(MatchedTransfer {
            to: to.to_string(),
            amount,
        })
    }

    fn scan(value: &Value, destination: &str, out: &mut Vec<MatchedTransfer>) {
        match value {
            Value::Object(obj) => {
                if let Some(transfer) = Self::transfer_from_object(obj, destination) {
                    out.push(transfer);
                }
                for child in obj.values() {
                    Self::scan(child, destination, out);
                }
            }
            Value::Array(items) => {
                for item in items {
                    Self::scan(item, destination, out);
                }
            }
            _ => {}
        }
    }
}

/// Parse a raw integer token amount from either a JSON number or a decimal
/// string, as providers emit both.
fn parse_raw_amount(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n.as_u64().map(i128::from),
        Value::String(s) => s.parse::<i128>().ok(),
        _ => None,
    }
}

impl TransferMatcher for HeuristicMatcher {
    fn find_matching_transfer(
        &self,
        tx: &Value,
        destination: &str,
        expected_amount: Option<Decimal>,
    ) -> Option<MatchedTransfer> {
        let mut candidates = Vec::new();
        Self::scan(tx, destination, &mut candidates);

        candidates.into_iter().find(|transfer| match expected_amount {
            None => true,
            Some(expected) => (transfer.amount - expected).abs() < amount_tolerance(),
        })
    }
}

/// Result of a verification call. A negative result is a business outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Verified { amount: Decimal },
    NotVerified { reason: String },
}

impl VerificationOutcome {
    pub fn verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified { .. })
    }

    pub fn amount(&self) -> Option<Decimal> {
        match self {
            VerificationOutcome::Verified { amount } => Some(*amount),
            VerificationOutcome::NotVerified { .. } => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            VerificationOutcome::Verified { amount } => {
                format!("Payment of {} USDT verified.", amount)
            }
            VerificationOutcome::NotVerified { reason } => reason.clone(),
        }
    }
}

/// Whether the transaction executed successfully on chain.
fn execution_succeeded(tx: &Value) -> bool {
    tx.get("ret")
        .and_then(Value::as_array)
        .and_then(|ret| ret.first())
        .and_then(|entry| entry.get("contractRet"))
        .and_then(Value::as_str)
        .map(|status| status == "SUCCESS")
        .unwrap_or(false)
}

/// Decide the verification outcome for an oracle response. Pure; the caller
/// persists the audit record.
pub fn evaluate_transaction(
    tx: Option<&Value>,
    matcher: &dyn TransferMatcher,
    destination: &str,
    expected_amount: Option<Decimal>,
) -> VerificationOutcome {
    let tx = match tx {
        Some(tx) if execution_succeeded(tx) => tx,
        _ => {
            return VerificationOutcome::NotVerified {
                reason: REASON_NOT_FOUND_OR_FAILED.to_string(),
            }
        }
    };

    match matcher.find_matching_transfer(tx, destination, expected_amount) {
        Some(transfer) => VerificationOutcome::Verified {
            amount: transfer.amount,
        },
        None => VerificationOutcome::NotVerified {
            reason: REASON_NO_MATCHING_TRANSFER.to_string(),
        },
    }
}

/// Verification workflow: query the oracle, decide, and append the audit row.
#[derive(Clone)]
pub struct VerificationService {
    oracle: Arc<dyn ChainOracle>,
    matcher: Arc<dyn TransferMatcher>,
    db: Database,
    platform_address: String,
}

impl VerificationService {
    pub fn new(
        oracle: Arc<dyn ChainOracle>,
        matcher: Arc<dyn TransferMatcher>,
        db: Database,
        platform_address: String,
    ) -> Self {
        Self {
            oracle,
            matcher,
            db,
            platform_address,
        }
    }

    pub fn platform_address(&self) -> &str {
        &self.platform_address
    }

    /// Verify a claimed on-chain payment.
    ///
    /// Every oracle query is recorded in `tx_verifications`, successful or
    /// not. Oracle transport failures propagate as errors and are the one
    /// path that skips the audit row.
    pub async fn verify(
        &self,
        txid: &str,
        expected_amount: Option<Decimal>,
    ) -> Result<VerificationOutcome, AppError> {
        let tx = self.oracle.transaction_by_id(txid).await?;

        let outcome = evaluate_transaction(
            tx.as_ref(),
            self.matcher.as_ref(),
            &self.platform_address,
            expected_amount,
        );

        let record = RecordVerification {
            txid: txid.to_string(),
            platform_address: self.platform_address.clone(),
            amount_usdt: outcome.amount(),
            verified: outcome.verified(),
            raw_response: tx.unwrap_or(Value::Null),
        };
        self.db.record_verification_attempt(&record).await?;

        metrics::record_verification(outcome.verified());
        tracing::info!(
            txid = %txid,
            verified = outcome.verified(),
            amount = ?outcome.amount(),
            "Verification attempt recorded"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PLATFORM: &str = "TPlatformAddressXXXXXXXXXXXXXXXXXX";

    fn successful_tx(transfers: Value) -> Value {
        json!({
            "txID": "abc123",
            "ret": [{ "contractRet": "SUCCESS" }],
            "trc20TransferInfo": transfers
        })
    }

    #[test]
    fn matching_transfer_within_tolerance_verifies() {
        let tx = successful_tx(json!([
            { "to_address": PLATFORM, "amount_str": "10000000", "decimals": 6 }
        ]));

        let outcome = evaluate_transaction(
            Some(&tx),
            &HeuristicMatcher,
            PLATFORM,
            Some(Decimal::new(10, 0)),
        );

        assert_eq!(
            outcome,
            VerificationOutcome::Verified {
                amount: Decimal::from_i128_with_scale(10_000_000, 6)
            }
        );
    }

    #[test]
    fn numeric_value_with_token_decimal_verifies() {
        let tx = successful_tx(json!([
            { "to": PLATFORM, "value": 10_000_000u64, "token_decimal": 6 }
        ]));

        let outcome = evaluate_transaction(
            Some(&tx),
            &HeuristicMatcher,
            PLATFORM,
            Some(Decimal::new(10, 0)),
        );

        assert!(outcome.verified());
        assert_eq!(outcome.amount(), Some(Decimal::new(10, 0)));
    }

    #[test]
    fn missing_token_decimal_defaults_to_six() {
        let tx = successful_tx(json!([
            { "to": PLATFORM, "value": 50_000_000u64 }
        ]));

        let outcome =
            evaluate_transaction(Some(&tx), &HeuristicMatcher, PLATFORM, Some(Decimal::new(50, 0)));

        assert_eq!(outcome.amount(), Some(Decimal::new(50, 0)));
    }

    #[test]
    fn failed_on_chain_is_not_verified() {
        let tx = json!({
            "txID": "bad1",
            "ret": [{ "contractRet": "FAILED" }]
        });

        let outcome = evaluate_transaction(Some(&tx), &HeuristicMatcher, PLATFORM, None);

        assert_eq!(
            outcome,
            VerificationOutcome::NotVerified {
                reason: REASON_NOT_FOUND_OR_FAILED.to_string()
            }
        );
    }

    #[test]
    fn missing_transaction_is_not_verified() {
        let outcome = evaluate_transaction(None, &HeuristicMatcher, PLATFORM, None);

        assert_eq!(
            outcome,
            VerificationOutcome::NotVerified {
                reason: REASON_NOT_FOUND_OR_FAILED.to_string()
            }
        );
    }

    #[test]
    fn transfer_to_other_address_does_not_match() {
        let tx = successful_tx(json!([
            { "to": "TSomeoneElseYYYYYYYYYYYYYYYYYYYYYY", "value": 10_000_000u64 }
        ]));

        let outcome =
            evaluate_transaction(Some(&tx), &HeuristicMatcher, PLATFORM, Some(Decimal::new(10, 0)));

        assert_eq!(
            outcome,
            VerificationOutcome::NotVerified {
                reason: REASON_NO_MATCHING_TRANSFER.to_string()
            }
        );
    }

    #[test]
    fn amount_outside_tolerance_does_not_match() {
        // 10.0001 against an expected 10: the difference equals the tolerance
        // and must not match.
        let tx = successful_tx(json!([
            { "to": PLATFORM, "value": 10_000_100u64 }
        ]));

        let outcome =
            evaluate_transaction(Some(&tx), &HeuristicMatcher, PLATFORM, Some(Decimal::new(10, 0)));

        assert!(!outcome.verified());
    }

    #[test]
    fn amount_just_inside_tolerance_matches() {
        // 10.000099 against an expected 10.
        let tx = successful_tx(json!([
            { "to": PLATFORM, "value": 10_000_099u64 }
        ]));

        let outcome =
            evaluate_transaction(Some(&tx), &HeuristicMatcher, PLATFORM, Some(Decimal::new(10, 0)));

        assert!(outcome.verified());
    }

    #[test]
    fn no_expected_amount_accepts_any_transfer_to_platform() {
        let tx = successful_tx(json!([
            { "to": PLATFORM, "value": 123_456u64 }
        ]));

        let outcome = evaluate_transaction(Some(&tx), &HeuristicMatcher, PLATFORM, None);

        assert!(outcome.verified());
    }

    #[test]
    fn nested_transfer_events_are_found() {
        // Some providers bury transfer events under contract parameters.
        let tx = json!({
            "ret": [{ "contractRet": "SUCCESS" }],
            "raw_data": {
                "contract": [{
                    "parameter": {
                        "value": {
                            "data": { "to": PLATFORM, "amount": "25000000" }
                        }
                    }
                }]
            }
        });

        let outcome =
            evaluate_transaction(Some(&tx), &HeuristicMatcher, PLATFORM, Some(Decimal::new(25, 0)));

        assert!(outcome.verified());
    }

    #[test]
    fn unrepresentable_token_decimal_is_skipped() {
        // An exponent beyond Decimal's max scale must not take the task down.
        let tx = successful_tx(json!([
            { "to": PLATFORM, "value": 10_000_000u64, "token_decimal": 99 }
        ]));

        let outcome =
            evaluate_transaction(Some(&tx), &HeuristicMatcher, PLATFORM, Some(Decimal::new(10, 0)));

        assert_eq!(
            outcome,
            VerificationOutcome::NotVerified {
                reason: REASON_NO_MATCHING_TRANSFER.to_string()
            }
        );
    }

    #[test]
    fn amount_overflowing_decimal_mantissa_is_skipped() {
        // 35 digits: parses as i128 but does not fit Decimal's 96-bit mantissa.
        let tx = successful_tx(json!([
            { "to": PLATFORM, "amount_str": "99999999999999999999999999999999999" }
        ]));

        let outcome = evaluate_transaction(Some(&tx), &HeuristicMatcher, PLATFORM, None);

        assert!(!outcome.verified());
    }

    #[test]
    fn wrong_amount_skipped_in_favor_of_matching_one() {
        let tx = successful_tx(json!([
            { "to": PLATFORM, "value": 1_000_000u64 },
            { "to": PLATFORM, "value": 10_000_000u64 }
        ]));

        let outcome =
            evaluate_transaction(Some(&tx), &HeuristicMatcher, PLATFORM, Some(Decimal::new(10, 0)));

        assert_eq!(outcome.amount(), Some(Decimal::new(10, 0)));
    }
}
