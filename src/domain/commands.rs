//! Domain-level command and query types
//! These structs are used by services inside the domain layer and are **not**
//! exposed over the public API. An outer transport layer (HTTP handlers,
//! scheduled jobs) is responsible for mapping its inputs to these types.

pub mod users {
    use crate::domain::models::{Role, User};

    /// Input for creating a new user.
    #[derive(Debug, Clone)]
    pub struct CreateUserCommand {
        pub username: String,
        pub email: String,
        pub role: Role,
    }

    /// Result of creating a user.
    #[derive(Debug, Clone)]
    pub struct CreateUserResult {
        pub user: User,
        pub success_message: String,
    }
}

pub mod transactions {
    use chrono::{DateTime, Utc};

    use crate::domain::models::{
        Category, RecurrencePattern, Transaction, TransactionType,
    };

    /// Input for creating a new transaction.
    #[derive(Debug, Clone)]
    pub struct CreateTransactionCommand {
        pub user_id: String,
        /// Amount as entered, in `currency`.
        pub amount: f64,
        /// ISO currency code; `None` defaults to USD.
        pub currency: Option<String>,
        pub transaction_type: TransactionType,
        pub category: Category,
        pub tags: Vec<String>,
        /// Transaction date; `None` defaults to now.
        pub date: Option<DateTime<Utc>>,
        pub recurring: bool,
        pub recurrence_pattern: Option<RecurrencePattern>,
        pub end_date: Option<DateTime<Utc>>,
    }

    /// Result of creating a transaction.
    #[derive(Debug, Clone)]
    pub struct CreateTransactionResult {
        pub transaction: Transaction,
        /// Instances materialized by recurrence expansion.
        pub instances_created: usize,
        pub success_message: String,
    }

    /// Sort field accepted by transaction list queries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SortField {
        Date,
        Amount,
    }

    /// Query parameters for listing a user's transactions.
    #[derive(Debug, Clone, Default)]
    pub struct TransactionListQuery {
        pub user_id: String,
        /// Keep only transactions carrying at least one of these tags.
        pub tags: Option<Vec<String>>,
        pub sort_by: Option<SortField>,
        pub descending: bool,
    }

    impl TransactionListQuery {
        pub fn for_user(user_id: &str) -> Self {
            Self {
                user_id: user_id.to_string(),
                ..Default::default()
            }
        }
    }

    /// Query parameters for the admin-only all-users listing.
    #[derive(Debug, Clone)]
    pub struct AllTransactionsQuery {
        /// User performing the query; must hold the admin role.
        pub acting_user_id: String,
        pub tags: Option<Vec<String>>,
        pub sort_by: Option<SortField>,
        pub descending: bool,
    }

    /// Input for editing an existing transaction.
    #[derive(Debug, Clone)]
    pub struct UpdateTransactionCommand {
        pub user_id: String,
        pub transaction_id: String,
        pub category: Option<Category>,
        pub tags: Option<Vec<String>>,
        pub date: Option<DateTime<Utc>>,
    }
}

pub mod budgets {
    use crate::domain::models::{Budget, BudgetType, Category};

    /// Input for creating a new budget.
    #[derive(Debug, Clone)]
    pub struct CreateBudgetCommand {
        pub user_id: String,
        pub budget_type: BudgetType,
        /// Required iff `budget_type` is `Category`.
        pub category: Option<Category>,
        pub amount: f64,
    }

    /// Result of creating a budget.
    #[derive(Debug, Clone)]
    pub struct CreateBudgetResult {
        pub budget: Budget,
        pub success_message: String,
    }

    /// Input for changing a budget's target amount.
    #[derive(Debug, Clone)]
    pub struct UpdateBudgetCommand {
        pub user_id: String,
        pub budget_id: String,
        pub amount: f64,
    }

    /// Result of updating a budget.
    #[derive(Debug, Clone)]
    pub struct UpdateBudgetResult {
        pub budget: Budget,
        pub success_message: String,
    }
}

pub mod goals {
    use chrono::{DateTime, Utc};

    use crate::domain::models::Goal;

    /// Input for creating a new goal.
    #[derive(Debug, Clone)]
    pub struct CreateGoalCommand {
        pub user_id: String,
        pub name: String,
        pub target_amount: f64,
        pub deadline: DateTime<Utc>,
        pub allocation_percentage: f64,
    }

    /// Result of creating a goal.
    #[derive(Debug, Clone)]
    pub struct CreateGoalResult {
        pub goal: Goal,
        pub success_message: String,
    }

    /// Input for updating a goal. Absent fields are left unchanged.
    #[derive(Debug, Clone, Default)]
    pub struct UpdateGoalCommand {
        pub user_id: String,
        pub goal_id: String,
        pub target_amount: Option<f64>,
        pub current_amount: Option<f64>,
        pub deadline: Option<DateTime<Utc>>,
        pub allocation_percentage: Option<f64>,
    }

    /// Result of updating a goal.
    #[derive(Debug, Clone)]
    pub struct UpdateGoalResult {
        pub goal: Goal,
        pub success_message: String,
    }
}

pub mod reports {
    use chrono::{DateTime, Utc};

    use crate::domain::models::{Category, Report};

    /// Input for generating a financial report.
    #[derive(Debug, Clone, Default)]
    pub struct GenerateReportCommand {
        pub user_id: String,
        /// Start of the reporting period; `None` defaults to one month ago.
        pub start_date: Option<DateTime<Utc>>,
        /// End of the reporting period; `None` defaults to now.
        pub end_date: Option<DateTime<Utc>>,
        pub categories: Option<Vec<Category>>,
        pub tags: Option<Vec<String>>,
    }

    /// Result of generating a report.
    #[derive(Debug, Clone)]
    pub struct GenerateReportResult {
        pub report: Report,
        pub success_message: String,
    }
}
