//! # CSV Transaction Repository
//!
//! File-based transaction storage, one `transactions.csv` per user
//! directory. Records are rewritten as a whole on every mutation with an
//! atomic temp-file-then-rename, so readers never observe a partial file.
//!
//! ## CSV Format
//!
//! ```csv
//! id,user_id,amount,currency,converted_amount,transaction_type,category,tags,date,recurring,recurrence_pattern,end_date,status
//! ex-1736899200000-af3c,u-1,25.0,USD,25.0,expense,Food,groceries;weekly,2025-01-15T10:30:00Z,false,,,completed
//! ```

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::connection::CsvConnection;
use crate::domain::models::{
    Category, RecurrencePattern, Transaction, TransactionStatus, TransactionType,
};
use crate::storage::traits::TransactionStorage;

const TRANSACTIONS_HEADER: &str = "id,user_id,amount,currency,converted_amount,transaction_type,category,tags,date,recurring,recurrence_pattern,end_date,status";

/// CSV record structure for transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TransactionRecord {
    id: String,
    user_id: String,
    amount: f64,
    currency: String,
    converted_amount: Option<f64>,
    transaction_type: String,
    category: String,
    tags: String,
    date: DateTime<Utc>,
    recurring: bool,
    recurrence_pattern: Option<String>,
    end_date: Option<DateTime<Utc>>,
    status: String,
}

impl From<&Transaction> for TransactionRecord {
    fn from(transaction: &Transaction) -> Self {
        TransactionRecord {
            id: transaction.id.clone(),
            user_id: transaction.user_id.clone(),
            amount: transaction.amount,
            currency: transaction.currency.clone(),
            converted_amount: transaction.converted_amount,
            transaction_type: transaction.transaction_type.as_str().to_string(),
            category: transaction.category.as_str().to_string(),
            tags: transaction.tags.join(";"),
            date: transaction.date,
            recurring: transaction.recurring,
            recurrence_pattern: transaction
                .recurrence_pattern
                .map(|p| p.as_str().to_string()),
            end_date: transaction.end_date,
            status: transaction.status.as_str().to_string(),
        }
    }
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = anyhow::Error;

    fn try_from(record: TransactionRecord) -> Result<Self> {
        let transaction_type = TransactionType::from_string(&record.transaction_type)
            .map_err(|e| anyhow::anyhow!("Failed to parse transaction type: {}", e))?;
        let category = Category::from_string(&record.category)
            .map_err(|e| anyhow::anyhow!("Failed to parse category: {}", e))?;
        let status = TransactionStatus::from_string(&record.status)
            .map_err(|e| anyhow::anyhow!("Failed to parse status: {}", e))?;
        let recurrence_pattern = match record.recurrence_pattern.as_deref() {
            Some(s) if !s.is_empty() => Some(
                RecurrencePattern::from_string(s)
                    .map_err(|e| anyhow::anyhow!("Failed to parse recurrence pattern: {}", e))?,
            ),
            _ => None,
        };
        let tags = record
            .tags
            .split(';')
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect();

        Ok(Transaction {
            id: record.id,
            user_id: record.user_id,
            amount: record.amount,
            currency: record.currency,
            converted_amount: record.converted_amount,
            transaction_type,
            category,
            tags,
            date: record.date,
            recurring: record.recurring,
            recurrence_pattern,
            end_date: record.end_date,
            status,
        })
    }
}

/// CSV-based transaction repository
#[derive(Clone)]
pub struct TransactionRepository {
    connection: CsvConnection,
}

impl TransactionRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn file_path(&self, user_id: &str) -> Result<std::path::PathBuf> {
        Ok(self.connection.user_directory(user_id)?.join("transactions.csv"))
    }

    fn read_transactions(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let path = self.file_path(user_id)?;
        self.connection
            .ensure_file_exists(&path, TRANSACTIONS_HEADER)?;

        let mut reader = Reader::from_path(&path)?;
        let mut transactions = Vec::new();

        for result in reader.deserialize::<TransactionRecord>() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Failed to read transaction record: {}. Skipping.", e);
                    continue;
                }
            };
            match Transaction::try_from(record) {
                Ok(transaction) => transactions.push(transaction),
                Err(e) => warn!("Failed to parse transaction record: {}. Skipping.", e),
            }
        }

        Ok(transactions)
    }

    fn write_transactions(&self, user_id: &str, transactions: &[Transaction]) -> Result<()> {
        let mut writer = Writer::from_writer(Vec::new());
        for transaction in transactions {
            writer.serialize(TransactionRecord::from(transaction))?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush transactions CSV: {}", e))?;

        self.connection.write_atomic(&self.file_path(user_id)?, &data)
    }
}

impl TransactionStorage for TransactionRepository {
    fn store_transaction(&self, transaction: &Transaction) -> Result<()> {
        let mut transactions = self.read_transactions(&transaction.user_id)?;
        transactions.push(transaction.clone());
        self.write_transactions(&transaction.user_id, &transactions)
    }

    fn get_transaction(&self, user_id: &str, transaction_id: &str) -> Result<Option<Transaction>> {
        Ok(self
            .read_transactions(user_id)?
            .into_iter()
            .find(|t| t.id == transaction_id))
    }

    fn list_transactions(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let mut transactions = self.read_transactions(user_id)?;
        transactions.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(transactions)
    }

    fn list_all_transactions(&self) -> Result<Vec<Transaction>> {
        let mut all = Vec::new();
        for user_id in self.connection.list_user_directories()? {
            all.extend(self.read_transactions(&user_id)?);
        }
        Ok(all)
    }

    fn list_expenses_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        Ok(self
            .read_transactions(user_id)?
            .into_iter()
            .filter(|t| t.transaction_type == TransactionType::Expense && t.date >= since)
            .collect())
    }

    fn list_open_recurring(&self, now: DateTime<Utc>) -> Result<Vec<Transaction>> {
        Ok(self
            .list_all_transactions()?
            .into_iter()
            .filter(|t| t.recurring && t.end_date.map(|end| end >= now).unwrap_or(false))
            .collect())
    }

    fn update_transaction(&self, transaction: &Transaction) -> Result<()> {
        let mut transactions = self.read_transactions(&transaction.user_id)?;
        let found = transactions.iter_mut().find(|t| t.id == transaction.id);
        match found {
            Some(existing) => {
                *existing = transaction.clone();
                self.write_transactions(&transaction.user_id, &transactions)
            }
            None => Err(anyhow::anyhow!(
                "Transaction not found for update: {}",
                transaction.id
            )),
        }
    }

    fn delete_transaction(&self, user_id: &str, transaction_id: &str) -> Result<bool> {
        let mut transactions = self.read_transactions(user_id)?;
        let before = transactions.len();
        transactions.retain(|t| t.id != transaction_id);
        if transactions.len() == before {
            return Ok(false);
        }
        self.write_transactions(user_id, &transactions)?;
        Ok(true)
    }

    fn sum_amount_by_type(
        &self,
        user_id: Option<&str>,
        transaction_type: TransactionType,
    ) -> Result<f64> {
        let transactions = match user_id {
            Some(id) => self.read_transactions(id)?,
            None => self.list_all_transactions()?,
        };
        Ok(transactions
            .iter()
            .filter(|t| t.transaction_type == transaction_type)
            .map(|t| t.amount)
            .sum())
    }

    fn count_transactions(&self) -> Result<usize> {
        Ok(self.list_all_transactions()?.len())
    }
}
