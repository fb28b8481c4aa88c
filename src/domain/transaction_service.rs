//! Transaction service domain logic.
//!
//! Owns the transaction creation flow: validation, currency normalization,
//! allocator dispatch and recurrence expansion all happen inside the one
//! call that creates the transaction. Also owns the periodic sweep that
//! notifies about upcoming recurring transactions and flags missed ones.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::budget_service::BudgetService;
use crate::domain::commands::transactions::{
    AllTransactionsQuery, CreateTransactionCommand, CreateTransactionResult, SortField,
    TransactionListQuery, UpdateTransactionCommand,
};
use crate::domain::currency_service::CurrencyService;
use crate::domain::email_service::Notifier;
use crate::domain::errors::{Error, Result};
use crate::domain::goal_service::GoalService;
use crate::domain::models::{
    Role, Transaction, TransactionStatus, TransactionType,
};
use crate::storage::csv::{CsvConnection, TransactionRepository, UserRepository};
use crate::storage::traits::{TransactionStorage, UserStorage};

/// Hard cap on eagerly materialized recurrence instances. A daily
/// recurrence with a far end date would otherwise create unbounded rows
/// inside the creating request.
pub const MAX_RECURRENCE_INSTANCES: usize = 500;

/// Recurring transactions due within this many days trigger an
/// "upcoming" notification.
const UPCOMING_WINDOW_DAYS: i64 = 3;

/// Outcome of the recurring-transaction sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurringSweepOutcome {
    pub upcoming_notifications: usize,
    pub missed_marked: usize,
}

#[derive(Clone)]
pub struct TransactionService {
    transaction_repository: TransactionRepository,
    user_repository: UserRepository,
    budget_service: BudgetService,
    goal_service: GoalService,
    currency_service: CurrencyService,
    notifier: Arc<dyn Notifier>,
}

impl TransactionService {
    pub fn new(
        connection: Arc<CsvConnection>,
        budget_service: BudgetService,
        goal_service: GoalService,
        currency_service: CurrencyService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            transaction_repository: TransactionRepository::new((*connection).clone()),
            user_repository: UserRepository::new((*connection).clone()),
            budget_service,
            goal_service,
            currency_service,
            notifier,
        }
    }

    /// Create a transaction: normalize the amount to USD, persist, run the
    /// matching allocator and expand the recurrence if there is one.
    ///
    /// A failed currency lookup aborts the whole flow before anything is
    /// persisted. Allocator failures never do; they are logged inside the
    /// allocators and the flow continues.
    pub async fn create_transaction(
        &self,
        command: CreateTransactionCommand,
    ) -> Result<CreateTransactionResult> {
        info!("Creating transaction: {:?}", command);

        if command.amount <= 0.0 {
            return Err(Error::Validation(
                "Transaction amount must be positive".to_string(),
            ));
        }
        if self.user_repository.get_user(&command.user_id)?.is_none() {
            return Err(Error::NotFound(format!("User {}", command.user_id)));
        }
        if command.recurring
            && (command.recurrence_pattern.is_none() || command.end_date.is_none())
        {
            return Err(Error::Validation(
                "Recurring transactions require a recurrence pattern and an end date".to_string(),
            ));
        }

        let date = command.date.unwrap_or_else(Utc::now);
        if command.recurring {
            if let Some(end_date) = command.end_date {
                if end_date <= date {
                    return Err(Error::Validation(
                        "End date must be after the transaction date".to_string(),
                    ));
                }
            }
        }

        let currency = command.currency.unwrap_or_else(|| "USD".to_string());
        let converted_amount = self
            .currency_service
            .to_usd(command.amount, &currency)
            .await?;

        let transaction = Transaction {
            id: Transaction::generate_id(command.transaction_type, Transaction::now_millis()),
            user_id: command.user_id,
            amount: command.amount,
            currency,
            converted_amount: Some(converted_amount),
            transaction_type: command.transaction_type,
            category: command.category,
            tags: command.tags,
            date,
            recurring: command.recurring,
            recurrence_pattern: command.recurrence_pattern,
            end_date: command.end_date,
            status: TransactionStatus::Pending,
        };
        self.transaction_repository.store_transaction(&transaction)?;

        self.dispatch_allocation(&transaction);

        let instances_created = if transaction.recurring {
            self.expand_recurrence(&transaction)?
        } else {
            0
        };

        info!(
            "Successfully created transaction: {} ({} recurrence instances)",
            transaction.id, instances_created
        );
        Ok(CreateTransactionResult {
            transaction,
            instances_created,
            success_message: "Transaction added successfully".to_string(),
        })
    }

    /// Route the normalized amount to the budget or goal allocator.
    fn dispatch_allocation(&self, transaction: &Transaction) {
        let usd_amount = transaction.usd_amount();
        match transaction.transaction_type {
            TransactionType::Expense => self.budget_service.apply_expense(
                &transaction.user_id,
                usd_amount,
                transaction.category,
            ),
            TransactionType::Income => self
                .goal_service
                .apply_income(&transaction.user_id, usd_amount),
        }
    }

    /// Materialize instances of a recurring template, advancing one
    /// pattern unit at a time while strictly before the end date. Each
    /// instance runs through the allocators exactly like a manual
    /// transaction. Expansion is capped at `MAX_RECURRENCE_INSTANCES`.
    fn expand_recurrence(&self, template: &Transaction) -> Result<usize> {
        let (pattern, end_date) = match (template.recurrence_pattern, template.end_date) {
            (Some(pattern), Some(end_date)) => (pattern, end_date),
            _ => return Ok(0),
        };

        let mut next_date = pattern.advance(template.date);
        let mut created = 0;

        while next_date < end_date {
            if created >= MAX_RECURRENCE_INSTANCES {
                warn!(
                    "Recurrence expansion for {} stopped at the {}-instance cap (next date would have been {})",
                    template.id, MAX_RECURRENCE_INSTANCES, next_date
                );
                break;
            }

            let instance = Transaction {
                id: format!("{}::{}", template.id, next_date.format("%Y-%m-%d")),
                date: next_date,
                status: TransactionStatus::Pending,
                ..template.clone()
            };
            self.transaction_repository.store_transaction(&instance)?;
            self.dispatch_allocation(&instance);

            created += 1;
            next_date = pattern.advance(next_date);
        }

        Ok(created)
    }

    pub fn get_transaction(&self, user_id: &str, transaction_id: &str) -> Result<Transaction> {
        self.transaction_repository
            .get_transaction(user_id, transaction_id)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", transaction_id)))
    }

    /// List a user's transactions with optional tag filter and sorting.
    pub fn list_transactions(&self, query: TransactionListQuery) -> Result<Vec<Transaction>> {
        if self.user_repository.get_user(&query.user_id)?.is_none() {
            return Err(Error::NotFound(format!("User {}", query.user_id)));
        }
        let transactions = self.transaction_repository.list_transactions(&query.user_id)?;
        Ok(Self::filter_and_sort(
            transactions,
            query.tags.as_deref(),
            query.sort_by,
            query.descending,
        ))
    }

    /// List transactions across all users. Admins only.
    pub fn list_all_transactions(&self, query: AllTransactionsQuery) -> Result<Vec<Transaction>> {
        let acting_user = self
            .user_repository
            .get_user(&query.acting_user_id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", query.acting_user_id)))?;
        if acting_user.role != Role::Admin {
            return Err(Error::Authorization("Admins only".to_string()));
        }

        let transactions = self.transaction_repository.list_all_transactions()?;
        Ok(Self::filter_and_sort(
            transactions,
            query.tags.as_deref(),
            query.sort_by,
            query.descending,
        ))
    }

    fn filter_and_sort(
        mut transactions: Vec<Transaction>,
        tags: Option<&[String]>,
        sort_by: Option<SortField>,
        descending: bool,
    ) -> Vec<Transaction> {
        if let Some(tags) = tags {
            transactions.retain(|t| t.tags.iter().any(|tag| tags.contains(tag)));
        }
        if let Some(field) = sort_by {
            match field {
                SortField::Date => transactions.sort_by(|a, b| a.date.cmp(&b.date)),
                SortField::Amount => transactions.sort_by(|a, b| {
                    a.amount
                        .partial_cmp(&b.amount)
                        .unwrap_or(std::cmp::Ordering::Equal)
                }),
            }
            if descending {
                transactions.reverse();
            }
        }
        transactions
    }

    /// Flip a pending or missed transaction to completed.
    pub fn mark_completed(&self, user_id: &str, transaction_id: &str) -> Result<Transaction> {
        let mut transaction = self.get_transaction(user_id, transaction_id)?;
        if transaction.status == TransactionStatus::Completed {
            return Err(Error::Validation(
                "Transaction is already marked as completed".to_string(),
            ));
        }
        transaction.status = TransactionStatus::Completed;
        self.transaction_repository.update_transaction(&transaction)?;
        Ok(transaction)
    }

    /// Edit a transaction's category, tags or date. Amounts are immutable
    /// once posted; allocations are never re-run.
    pub fn update_transaction(&self, command: UpdateTransactionCommand) -> Result<Transaction> {
        let mut transaction = self.get_transaction(&command.user_id, &command.transaction_id)?;
        if let Some(category) = command.category {
            transaction.category = category;
        }
        if let Some(tags) = command.tags {
            transaction.tags = tags;
        }
        if let Some(date) = command.date {
            transaction.date = date;
        }
        self.transaction_repository.update_transaction(&transaction)?;
        Ok(transaction)
    }

    pub fn delete_transaction(&self, user_id: &str, transaction_id: &str) -> Result<()> {
        if !self
            .transaction_repository
            .delete_transaction(user_id, transaction_id)?
        {
            return Err(Error::NotFound(format!("Transaction {}", transaction_id)));
        }
        info!("Deleted transaction: {}", transaction_id);
        Ok(())
    }

    /// Periodic sweep over still-open recurring transactions.
    ///
    /// For each one the next occurrence after the stored date is computed
    /// with the same pattern-advance rule as expansion: an occurrence
    /// within the next three days produces an "upcoming" notification; one
    /// that already passed while the row is still pending flips it to
    /// missed and produces a "missed" alert. The sweep never creates rows.
    pub fn send_upcoming_transaction_notifications(
        &self,
        now: DateTime<Utc>,
    ) -> Result<RecurringSweepOutcome> {
        let open = self.transaction_repository.list_open_recurring(now)?;
        let today = now.date_naive();
        let window_end = today + chrono::Duration::days(UPCOMING_WINDOW_DAYS);
        let mut outcome = RecurringSweepOutcome::default();

        for mut transaction in open {
            let pattern = match transaction.recurrence_pattern {
                Some(pattern) => pattern,
                None => continue,
            };
            let next_execution = pattern.advance(transaction.date).date_naive();

            let user = match self.user_repository.get_user(&transaction.user_id) {
                Ok(Some(user)) => user,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        "Failed to load user {} during recurring sweep: {:#}",
                        transaction.user_id, e
                    );
                    continue;
                }
            };

            if next_execution >= today && next_execution <= window_end {
                let body = format!(
                    "Reminder: Your {} transaction of ${:.2} is due on {}.",
                    transaction.transaction_type.as_str(),
                    transaction.amount,
                    next_execution.format("%Y-%m-%d")
                );
                match self.notifier.send(
                    &user.email,
                    "Upcoming Recurring Transaction Reminder",
                    &body,
                    None,
                ) {
                    Ok(()) => {
                        info!("Upcoming notification sent to {}", user.email);
                        outcome.upcoming_notifications += 1;
                    }
                    Err(e) => warn!("Failed to send upcoming notification: {:#}", e),
                }
            }

            if next_execution < today && transaction.status == TransactionStatus::Pending {
                transaction.status = TransactionStatus::Missed;
                if let Err(e) = self.transaction_repository.update_transaction(&transaction) {
                    warn!("Failed to mark transaction {} missed: {:#}", transaction.id, e);
                    continue;
                }
                outcome.missed_marked += 1;

                let body = format!(
                    "ALERT: You missed a scheduled {} transaction of ${:.2} on {}. Please take action.",
                    transaction.transaction_type.as_str(),
                    transaction.amount,
                    next_execution.format("%Y-%m-%d")
                );
                if let Err(e) = self.notifier.send(
                    &user.email,
                    "Missed Recurring Transaction Alert",
                    &body,
                    None,
                ) {
                    warn!("Failed to send missed-transaction alert: {:#}", e);
                }
            }
        }

        Ok(outcome)
    }
}
