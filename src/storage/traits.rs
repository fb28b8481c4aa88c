//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::models::{
    Budget, Category, Goal, Report, Transaction, TransactionType, User,
};

/// Trait defining the interface for user storage operations
pub trait UserStorage: Send + Sync {
    /// Store a new user
    fn store_user(&self, user: &User) -> Result<()>;

    /// Retrieve a specific user by ID
    fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Retrieve a user by their unique username
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// List all users ordered by username
    fn list_users(&self) -> Result<Vec<User>>;
}

/// Trait defining the interface for transaction storage operations
///
/// This trait abstracts away the specific storage implementation details,
/// allowing the domain layer to work with different storage backends
/// without modification.
pub trait TransactionStorage: Send + Sync {
    /// Store a new transaction
    fn store_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Retrieve a specific transaction by ID
    fn get_transaction(&self, user_id: &str, transaction_id: &str) -> Result<Option<Transaction>>;

    /// List all transactions for a user ordered by date descending
    fn list_transactions(&self, user_id: &str) -> Result<Vec<Transaction>>;

    /// List transactions across all users (admin views and sweeps)
    fn list_all_transactions(&self) -> Result<Vec<Transaction>>;

    /// List a user's expense transactions dated on or after `since`
    fn list_expenses_since(&self, user_id: &str, since: DateTime<Utc>)
        -> Result<Vec<Transaction>>;

    /// List recurring transactions across all users whose end date is
    /// after `now` (still-open recurrence templates)
    fn list_open_recurring(&self, now: DateTime<Utc>) -> Result<Vec<Transaction>>;

    /// Update an existing transaction
    fn update_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Delete a single transaction
    /// Returns true if the transaction was found and deleted, false otherwise
    fn delete_transaction(&self, user_id: &str, transaction_id: &str) -> Result<bool>;

    /// Sum entered amounts by transaction type, for one user or store-wide
    fn sum_amount_by_type(
        &self,
        user_id: Option<&str>,
        transaction_type: TransactionType,
    ) -> Result<f64>;

    /// Count transactions across all users
    fn count_transactions(&self) -> Result<usize>;
}

/// Trait defining the interface for budget storage operations
pub trait BudgetStorage: Send + Sync {
    /// Store a new budget
    fn store_budget(&self, budget: &Budget) -> Result<()>;

    /// Retrieve a specific budget by ID
    fn get_budget(&self, user_id: &str, budget_id: &str) -> Result<Option<Budget>>;

    /// List all budgets for a user
    fn list_budgets(&self, user_id: &str) -> Result<Vec<Budget>>;

    /// List budgets across all users (admin aggregates)
    fn list_all_budgets(&self) -> Result<Vec<Budget>>;

    /// Find the user's monthly budget for a given month/year, if any
    fn find_monthly_budget(&self, user_id: &str, month: &str, year: i32)
        -> Result<Option<Budget>>;

    /// Find the user's category budget for a given category, if any
    fn find_category_budget(&self, user_id: &str, category: Category)
        -> Result<Option<Budget>>;

    /// Update an existing budget
    fn update_budget(&self, budget: &Budget) -> Result<()>;

    /// Delete a budget by ID
    /// Returns true if the budget was found and deleted, false otherwise
    fn delete_budget(&self, user_id: &str, budget_id: &str) -> Result<bool>;
}

/// Trait defining the interface for goal storage operations
pub trait GoalStorage: Send + Sync {
    /// Store a new goal
    fn store_goal(&self, goal: &Goal) -> Result<()>;

    /// Retrieve a specific goal by ID
    fn get_goal(&self, user_id: &str, goal_id: &str) -> Result<Option<Goal>>;

    /// List all goals for a user
    fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>>;

    /// List goals across all users (reminder sweep)
    fn list_all_goals(&self) -> Result<Vec<Goal>>;

    /// Update an existing goal
    fn update_goal(&self, goal: &Goal) -> Result<()>;

    /// Delete a goal by ID
    /// Returns true if the goal was found and deleted, false otherwise
    fn delete_goal(&self, user_id: &str, goal_id: &str) -> Result<bool>;
}

/// Trait defining the interface for report record storage operations
pub trait ReportStorage: Send + Sync {
    /// Store a new report record
    fn store_report(&self, report: &Report) -> Result<()>;

    /// Retrieve a specific report record by ID
    fn get_report(&self, user_id: &str, report_id: &str) -> Result<Option<Report>>;

    /// List all report records for a user ordered by generation time descending
    fn list_reports(&self, user_id: &str) -> Result<Vec<Report>>;

    /// Delete a report record by ID
    /// Returns true if the record was found and deleted, false otherwise
    fn delete_report(&self, user_id: &str, report_id: &str) -> Result<bool>;
}
