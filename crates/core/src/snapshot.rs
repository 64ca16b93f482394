//! Trial balance snapshots with tamper-evident content hashes.
//!
//! A snapshot certifies the balance state of a ledger at a point in time:
//! per-account balances, debit/credit totals, and a SHA-256 hash over a
//! deterministic serialization of the balance set. The hash stored at period
//! close makes any later rewrite of history detectable.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::ledger::balance::LedgerBalance;
use crate::ledger::types::AccountType;
use quill_shared::types::AccountId;

/// One account's balance within a trial balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// The account.
    pub account_id: AccountId,
    /// Account type, carried for auditability of the snapshot.
    pub account_type: AccountType,
    /// Owning entity, if the account is per-creator.
    pub entity_id: Option<Uuid>,
    /// Total debits against the account.
    pub debit_total: Decimal,
    /// Total credits against the account.
    pub credit_total: Decimal,
    /// Signed balance per the account class convention.
    pub balance: Decimal,
}

/// An immutable record of all account balances at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct TrialBalance {
    /// Per-account rows, sorted by account id.
    pub rows: Vec<TrialBalanceRow>,
    /// Total debits across all rows.
    pub total_debits: Decimal,
    /// Total credits across all rows.
    pub total_credits: Decimal,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

impl TrialBalance {
    /// Builds a trial balance from per-account rows.
    ///
    /// Rows are sorted by account id so the serialization, and therefore
    /// the content hash, is deterministic regardless of query order.
    #[must_use]
    pub fn new(mut rows: Vec<TrialBalanceRow>, taken_at: DateTime<Utc>) -> Self {
        rows.sort_by_key(|r| r.account_id.into_inner());

        let total_debits: Decimal = rows.iter().map(|r| r.debit_total).sum();
        let total_credits: Decimal = rows.iter().map(|r| r.credit_total).sum();

        Self {
            rows,
            total_debits,
            total_credits,
            taken_at,
        }
    }

    /// Ledger-wide totals as a balance value.
    #[must_use]
    pub const fn totals(&self) -> LedgerBalance {
        LedgerBalance::new(self.total_debits, self.total_credits)
    }

    /// Signed difference (debits - credits).
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.totals().difference()
    }

    /// Returns true if total debits equal total credits within `tolerance`.
    #[must_use]
    pub fn is_balanced_within(&self, tolerance: Decimal) -> bool {
        self.totals().is_balanced_within(tolerance)
    }

    /// Deterministic serialization of the balance set.
    ///
    /// One line per account in id order, then the totals. All amounts are
    /// rendered with exactly two decimal places; the field order never
    /// changes. Any change to the format invalidates existing hashes, so
    /// this format is append-only.
    #[must_use]
    pub fn canonical_serialization(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let entity = row
                .entity_id
                .map_or_else(|| "-".to_string(), |id| id.to_string());
            out.push_str(&format!(
                "{}|{}|{}|{:.2}|{:.2}|{:.2}\n",
                row.account_id,
                row.account_type,
                entity,
                row.debit_total,
                row.credit_total,
                row.balance,
            ));
        }
        out.push_str(&format!(
            "totals|{:.2}|{:.2}\n",
            self.total_debits, self.total_credits
        ));
        out
    }

    /// SHA-256 hex hash of the canonical serialization.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_serialization().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(account_id: AccountId, account_type: AccountType, balance: Decimal) -> TrialBalanceRow {
        let (debit_total, credit_total) = if balance >= Decimal::ZERO {
            (balance, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -balance)
        };
        TrialBalanceRow {
            account_id,
            account_type,
            entity_id: None,
            debit_total,
            credit_total,
            balance,
        }
    }

    #[test]
    fn test_rows_sorted_by_account_id() {
        let a = AccountId::from_uuid(Uuid::from_u128(2));
        let b = AccountId::from_uuid(Uuid::from_u128(1));
        let tb = TrialBalance::new(
            vec![
                row(a, AccountType::Cash, dec!(100)),
                row(b, AccountType::PlatformRevenue, dec!(-100)),
            ],
            Utc::now(),
        );
        assert_eq!(tb.rows[0].account_id, b);
        assert_eq!(tb.rows[1].account_id, a);
    }

    #[test]
    fn test_hash_is_order_independent() {
        let a = row(
            AccountId::from_uuid(Uuid::from_u128(1)),
            AccountType::Cash,
            dec!(100),
        );
        let b = row(
            AccountId::from_uuid(Uuid::from_u128(2)),
            AccountType::CreatorBalance,
            dec!(-100),
        );

        let now = Utc::now();
        let forward = TrialBalance::new(vec![a.clone(), b.clone()], now);
        let reversed = TrialBalance::new(vec![b, a], now);

        assert_eq!(forward.content_hash(), reversed.content_hash());
    }

    #[test]
    fn test_hash_detects_tampering() {
        let now = Utc::now();
        let original = TrialBalance::new(
            vec![row(
                AccountId::from_uuid(Uuid::from_u128(1)),
                AccountType::Cash,
                dec!(100),
            )],
            now,
        );
        let tampered = TrialBalance::new(
            vec![row(
                AccountId::from_uuid(Uuid::from_u128(1)),
                AccountType::Cash,
                dec!(100.01),
            )],
            now,
        );

        assert_ne!(original.content_hash(), tampered.content_hash());
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let tb = TrialBalance::new(vec![], Utc::now());
        let hash = tb.content_hash();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_totals_and_balance_check() {
        let tb = TrialBalance::new(
            vec![
                row(
                    AccountId::from_uuid(Uuid::from_u128(1)),
                    AccountType::Cash,
                    dec!(100),
                ),
                row(
                    AccountId::from_uuid(Uuid::from_u128(2)),
                    AccountType::PlatformRevenue,
                    dec!(-20),
                ),
                row(
                    AccountId::from_uuid(Uuid::from_u128(3)),
                    AccountType::CreatorBalance,
                    dec!(-80),
                ),
            ],
            Utc::now(),
        );

        assert_eq!(tb.total_debits, dec!(100));
        assert_eq!(tb.total_credits, dec!(100));
        assert!(tb.is_balanced_within(dec!(0.01)));
    }

    #[test]
    fn test_canonical_serialization_shape() {
        let tb = TrialBalance::new(
            vec![row(
                AccountId::from_uuid(Uuid::from_u128(1)),
                AccountType::Cash,
                dec!(42.5),
            )],
            Utc::now(),
        );
        let text = tb.canonical_serialization();
        assert!(text.contains("|cash|-|42.50|0.00|42.50\n"));
        assert!(text.ends_with("totals|42.50|0.00\n"));
    }
}
