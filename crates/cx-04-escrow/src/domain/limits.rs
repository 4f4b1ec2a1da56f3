//! Spend limits.

use chrono::{DateTime, Utc};
use shared_types::{Transaction, TransactionKind, UserId};

use crate::error::{EscrowError, EscrowResult};

/// Entry fees paid by `user` at or after `since`, as a positive amount.
pub fn daily_entry_spend(transactions: &[Transaction], user: &UserId, since: DateTime<Utc>) -> i64 {
    transactions
        .iter()
        .filter(|t| {
            t.user == *user
                && t.kind == TransactionKind::EntryFee
                && t.is_completed()
                && t.created_at >= since
        })
        .map(|t| t.amount.abs())
        .sum()
}

/// Validate an entry-fee debit. Checks run cap, then funds, then the 24h limit.
pub fn check_debit(
    fee: i64,
    balance: i64,
    spent_in_window: i64,
    max_entry_fee: i64,
    max_daily_transfer: i64,
) -> EscrowResult<()> {
    if fee > max_entry_fee {
        return Err(EscrowError::FeeCapExceeded {
            fee,
            cap: max_entry_fee,
        });
    }
    if balance < fee {
        return Err(EscrowError::InsufficientFunds {
            balance,
            required: fee,
        });
    }
    if spent_in_window + fee > max_daily_transfer {
        return Err(EscrowError::DailyLimitExceeded {
            spent: spent_in_window,
            fee,
            cap: max_daily_transfer,
        });
    }
    Ok(())
}

/// Clamp a prize pool to the payout cap. Returns `(payout, capped)`.
pub fn cap_payout(pool: i64, max_prize_payout: i64) -> (i64, bool) {
    if pool > max_prize_payout {
        (max_prize_payout, true)
    } else {
        (pool, false)
    }
}
