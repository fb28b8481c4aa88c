//! Shared fixtures for storage tests.

use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::models::{Category, Transaction, TransactionStatus, TransactionType};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Build a completed, non-recurring transaction with a unique id and a
/// fixed base date, suitable as a starting point for repository tests.
pub fn sample_transaction(
    user_id: &str,
    amount: f64,
    transaction_type: TransactionType,
) -> Transaction {
    let n = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let category = match transaction_type {
        TransactionType::Income => Category::Salary,
        TransactionType::Expense => Category::Food,
    };

    Transaction {
        id: format!("tx-{}", n),
        user_id: user_id.to_string(),
        amount,
        currency: "USD".to_string(),
        converted_amount: Some(amount),
        transaction_type,
        category,
        tags: Vec::new(),
        date: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        recurring: false,
        recurrence_pattern: None,
        end_date: None,
        status: TransactionStatus::Completed,
    }
}
