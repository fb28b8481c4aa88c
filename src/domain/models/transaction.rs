//! Domain model for a transaction.
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::category::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrencePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrencePattern::Daily => "daily",
            RecurrencePattern::Weekly => "weekly",
            RecurrencePattern::Monthly => "monthly",
            RecurrencePattern::Yearly => "yearly",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(RecurrencePattern::Daily),
            "weekly" => Ok(RecurrencePattern::Weekly),
            "monthly" => Ok(RecurrencePattern::Monthly),
            "yearly" => Ok(RecurrencePattern::Yearly),
            _ => Err(format!("Invalid recurrence pattern: {}", s)),
        }
    }

    /// Advance a date by one unit of this pattern.
    ///
    /// Month and year advances clamp to the last valid day of the target
    /// month (Jan 31 + 1 month = Feb 28/29), matching calendar arithmetic.
    pub fn advance(&self, date: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            RecurrencePattern::Daily => date + chrono::Duration::days(1),
            RecurrencePattern::Weekly => date + chrono::Duration::weeks(1),
            RecurrencePattern::Monthly => date
                .checked_add_months(Months::new(1))
                .unwrap_or(date),
            RecurrencePattern::Yearly => date
                .checked_add_months(Months::new(12))
                .unwrap_or(date),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Missed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Missed => "missed",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "missed" => Ok(TransactionStatus::Missed),
            _ => Err(format!("Invalid transaction status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    /// Amount as entered by the user, in `currency`.
    pub amount: f64,
    /// ISO currency code of the entered amount.
    pub currency: String,
    /// Normalized USD amount; `None` only for records predating conversion.
    pub converted_amount: Option<f64>,
    pub transaction_type: TransactionType,
    pub category: Category,
    pub tags: Vec<String>,
    pub date: DateTime<Utc>,
    pub recurring: bool,
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: TransactionStatus,
}

impl Transaction {
    /// Generate a unique transaction ID based on type and current timestamp.
    /// Format: <type>-<timestamp_ms>-<random_suffix>
    /// Example: in-1625846400123-af3c
    pub fn generate_id(transaction_type: TransactionType, timestamp_ms: u64) -> String {
        let prefix = match transaction_type {
            TransactionType::Income => "in",
            TransactionType::Expense => "ex",
        };
        let random_suffix = Self::generate_random_suffix(4);
        format!("{}-{}-{}", prefix, timestamp_ms, random_suffix)
    }

    pub fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// The USD value of this transaction, falling back to the entered
    /// amount for records that were never normalized.
    pub fn usd_amount(&self) -> f64 {
        self.converted_amount.unwrap_or(self.amount)
    }

    /// Generate a random hex suffix for transaction IDs.
    fn generate_random_suffix(len: usize) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        format!("{:x}", now % (16_u128.pow(len as u32)))
            .chars()
            .take(len)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_id_prefixes() {
        let income_id = Transaction::generate_id(TransactionType::Income, 1625846400123);
        let expense_id = Transaction::generate_id(TransactionType::Expense, 1625846400123);
        assert!(income_id.starts_with("in-1625846400123-"));
        assert!(expense_id.starts_with("ex-1625846400123-"));
    }

    #[test]
    fn test_pattern_advance_daily_weekly() {
        let date = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(
            RecurrencePattern::Daily.advance(date),
            Utc.with_ymd_and_hms(2025, 1, 16, 12, 0, 0).unwrap()
        );
        assert_eq!(
            RecurrencePattern::Weekly.advance(date),
            Utc.with_ymd_and_hms(2025, 1, 22, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_pattern_advance_monthly_clamps_to_month_end() {
        let date = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(
            RecurrencePattern::Monthly.advance(date),
            Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_pattern_advance_yearly() {
        let date = Utc.with_ymd_and_hms(2024, 3, 10, 6, 30, 0).unwrap();
        assert_eq!(
            RecurrencePattern::Yearly.advance(date),
            Utc.with_ymd_and_hms(2025, 3, 10, 6, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Completed,
            TransactionStatus::Missed,
        ] {
            assert_eq!(
                TransactionStatus::from_string(status.as_str()).unwrap(),
                status
            );
        }
        assert!(TransactionStatus::from_string("cancelled").is_err());
    }
}
