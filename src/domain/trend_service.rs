//! Spending trend analysis.
//!
//! Aggregates the last three months of expenses by calendar month and by
//! category, compares the current month against the user's budgets and
//! turns the differences into recommendation messages. Used both by the
//! daily sweep over all users and on demand.

use chrono::{DateTime, Datelike, Months, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::email_service::Notifier;
use crate::domain::errors::{Error, Result};
use crate::domain::models::{Budget, Category, Transaction};
use crate::storage::csv::{BudgetRepository, CsvConnection, TransactionRepository, UserRepository};
use crate::storage::traits::{BudgetStorage, TransactionStorage, UserStorage};

/// Spend below this fraction of a budget counts as underspending.
const UNDERSPEND_RATIO: f64 = 0.5;

/// Spend totals keyed by "Month-Year" and by category.
#[derive(Debug, Clone, Default)]
pub struct SpendingAggregates {
    pub by_month: HashMap<String, f64>,
    pub by_category: HashMap<Category, f64>,
}

/// A budget adjustment recommendation addressed to one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    /// "Monthly Budget" or the category name.
    pub category: String,
    pub message: String,
}

/// Month key used in the aggregates, e.g. "January-2025".
pub fn month_key(date: DateTime<Utc>) -> String {
    format!("{}-{}", date.format("%B"), date.year())
}

/// Fold expense transactions into per-month and per-category USD totals.
/// Pure function so the aggregation is testable without a store.
pub fn aggregate_spending(transactions: &[Transaction]) -> SpendingAggregates {
    let mut aggregates = SpendingAggregates::default();
    for transaction in transactions {
        let usd = transaction.usd_amount();
        *aggregates
            .by_month
            .entry(month_key(transaction.date))
            .or_insert(0.0) += usd;
        *aggregates
            .by_category
            .entry(transaction.category)
            .or_insert(0.0) += usd;
    }
    aggregates
}

#[derive(Clone)]
pub struct TrendService {
    transaction_repository: TransactionRepository,
    budget_repository: BudgetRepository,
    user_repository: UserRepository,
    notifier: Arc<dyn Notifier>,
}

impl TrendService {
    pub fn new(connection: Arc<CsvConnection>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            transaction_repository: TransactionRepository::new((*connection).clone()),
            budget_repository: BudgetRepository::new((*connection).clone()),
            user_repository: UserRepository::new((*connection).clone()),
            notifier,
        }
    }

    /// Analyze one user's spending trends over the last three months and
    /// send one notification per recommendation. Returns the full list.
    pub fn analyze_spending(&self, user_id: &str) -> Result<Vec<Recommendation>> {
        let user = self
            .user_repository
            .get_user(user_id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", user_id)))?;

        let now = Utc::now();
        let since = now.checked_sub_months(Months::new(3)).unwrap_or(now);
        let expenses = self
            .transaction_repository
            .list_expenses_since(user_id, since)?;
        let aggregates = aggregate_spending(&expenses);

        let mut recommendations = Vec::new();

        let current_month_spending = aggregates
            .by_month
            .get(&month_key(now))
            .copied()
            .unwrap_or(0.0);
        if let Some(monthly_budget) = self.budget_repository.find_monthly_budget(
            user_id,
            &Budget::month_name(now),
            Budget::year_of(now),
        )? {
            if current_month_spending > monthly_budget.amount {
                recommendations.push(Recommendation {
                    category: "Monthly Budget".to_string(),
                    message: format!(
                        "You have exceeded your monthly budget of ${:.2}. You've spent ${:.2} this month. We recommend increasing your monthly budget.",
                        monthly_budget.amount, current_month_spending
                    ),
                });
            }
            if current_month_spending < monthly_budget.amount * UNDERSPEND_RATIO {
                recommendations.push(Recommendation {
                    category: "Monthly Budget".to_string(),
                    message: format!(
                        "You have underspent your monthly budget of ${:.2}. You've spent ${:.2} this month. Consider reallocating some of this budget to other categories.",
                        monthly_budget.amount, current_month_spending
                    ),
                });
            }
        }

        for (category, spending) in &aggregates.by_category {
            let category_budget = match self
                .budget_repository
                .find_category_budget(user_id, *category)?
            {
                Some(budget) => budget,
                None => continue,
            };

            if *spending > category_budget.amount {
                recommendations.push(Recommendation {
                    category: category.as_str().to_string(),
                    message: format!(
                        "You have exceeded your {} budget of ${:.2}. You've spent ${:.2} in this category. We recommend increasing your {} budget.",
                        category, category_budget.amount, spending, category
                    ),
                });
            }
            if *spending < category_budget.amount * UNDERSPEND_RATIO {
                recommendations.push(Recommendation {
                    category: category.as_str().to_string(),
                    message: format!(
                        "You have underspent your {} budget of ${:.2}. You've spent ${:.2} in this category. Consider reallocating some of this budget to other categories.",
                        category, category_budget.amount, spending
                    ),
                });
            }
        }

        for recommendation in &recommendations {
            let subject = format!(
                "Budget Adjustment Recommendation for {}",
                recommendation.category
            );
            if let Err(e) = self
                .notifier
                .send(&user.email, &subject, &recommendation.message, None)
            {
                warn!("Failed to send recommendation notification: {:#}", e);
            }
        }

        Ok(recommendations)
    }

    /// Daily sweep: run the analysis for every user, logging and skipping
    /// per-user failures. Returns the number of users analyzed.
    pub fn analyze_all_users(&self) -> Result<usize> {
        let users = self.user_repository.list_users()?;
        let mut analyzed = 0;
        for user in users {
            info!("Analyzing spending trends for user: {}", user.username);
            match self.analyze_spending(&user.id) {
                Ok(recommendations) => {
                    analyzed += 1;
                    if !recommendations.is_empty() {
                        info!(
                            "Produced {} recommendations for {}",
                            recommendations.len(),
                            user.username
                        );
                    }
                }
                Err(e) => warn!("Trend analysis failed for {}: {:#}", user.username, e),
            }
        }
        Ok(analyzed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Role, TransactionStatus, TransactionType, User};
    use crate::domain::test_support::RecordingNotifier;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn expense(user_id: &str, id: &str, amount: f64, category: Category, date: DateTime<Utc>) -> Transaction {
        Transaction {
            id: id.to_string(),
            user_id: user_id.to_string(),
            amount,
            currency: "USD".to_string(),
            converted_amount: Some(amount),
            transaction_type: TransactionType::Expense,
            category,
            tags: Vec::new(),
            date,
            recurring: false,
            recurrence_pattern: None,
            end_date: None,
            status: TransactionStatus::Completed,
        }
    }

    #[test]
    fn test_aggregate_spending_by_month_and_category() {
        let jan = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap();
        let transactions = vec![
            expense("u", "t1", 100.0, Category::Food, jan),
            expense("u", "t2", 50.0, Category::Food, feb),
            expense("u", "t3", 25.0, Category::Entertainment, feb),
        ];

        let aggregates = aggregate_spending(&transactions);
        assert_eq!(aggregates.by_month["January-2025"], 100.0);
        assert_eq!(aggregates.by_month["February-2025"], 75.0);
        assert_eq!(aggregates.by_category[&Category::Food], 150.0);
        assert_eq!(aggregates.by_category[&Category::Entertainment], 25.0);
    }

    struct Fixture {
        _temp: tempfile::TempDir,
        service: TrendService,
        notifier: Arc<RecordingNotifier>,
        transactions: TransactionRepository,
        budgets: BudgetRepository,
        user: User,
    }

    fn setup() -> Fixture {
        let temp = tempdir().unwrap();
        let conn = Arc::new(CsvConnection::new(temp.path()).unwrap());
        let notifier = Arc::new(RecordingNotifier::new());
        let service = TrendService::new(conn.clone(), notifier.clone());

        let user = User {
            id: "u-1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role: Role::User,
        };
        UserRepository::new((*conn).clone()).store_user(&user).unwrap();

        Fixture {
            _temp: temp,
            service,
            notifier,
            transactions: TransactionRepository::new((*conn).clone()),
            budgets: BudgetRepository::new((*conn).clone()),
            user,
        }
    }

    fn monthly_budget(user_id: &str, amount: f64) -> Budget {
        let now = Utc::now();
        Budget {
            id: Budget::generate_id(user_id, 1),
            user_id: user_id.to_string(),
            budget_type: crate::domain::models::BudgetType::Monthly,
            category: None,
            amount,
            current_amount: 0.0,
            month: Budget::month_name(now),
            year: Budget::year_of(now),
        }
    }

    #[test]
    fn test_exceeded_monthly_budget_recommendation() {
        let f = setup();
        f.budgets.store_budget(&monthly_budget(&f.user.id, 500.0)).unwrap();
        f.transactions
            .store_transaction(&expense(&f.user.id, "t1", 600.0, Category::Other, Utc::now()))
            .unwrap();

        let recommendations = f.service.analyze_spending(&f.user.id).unwrap();
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].category, "Monthly Budget");
        assert!(recommendations[0].message.contains("500.00"));
        assert!(recommendations[0].message.contains("600.00"));
        assert!(recommendations[0].message.contains("exceeded"));

        let sent = f.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@example.com");
        assert_eq!(sent[0].subject, "Budget Adjustment Recommendation for Monthly Budget");
    }

    #[test]
    fn test_underspent_monthly_budget_recommendation() {
        let f = setup();
        f.budgets.store_budget(&monthly_budget(&f.user.id, 500.0)).unwrap();
        f.transactions
            .store_transaction(&expense(&f.user.id, "t1", 200.0, Category::Other, Utc::now()))
            .unwrap();

        let recommendations = f.service.analyze_spending(&f.user.id).unwrap();
        assert_eq!(recommendations.len(), 1);
        assert!(recommendations[0].message.contains("underspent"));
        assert!(recommendations[0].message.contains("200.00"));
    }

    #[test]
    fn test_spend_between_half_and_full_budget_is_quiet() {
        let f = setup();
        f.budgets.store_budget(&monthly_budget(&f.user.id, 500.0)).unwrap();
        f.transactions
            .store_transaction(&expense(&f.user.id, "t1", 300.0, Category::Other, Utc::now()))
            .unwrap();

        let recommendations = f.service.analyze_spending(&f.user.id).unwrap();
        assert!(recommendations.is_empty());
        assert!(f.notifier.sent().is_empty());
    }

    #[test]
    fn test_category_budget_comparison_skips_unbudgeted() {
        let f = setup();
        let now = Utc::now();
        f.budgets
            .store_budget(&Budget {
                id: Budget::generate_id(&f.user.id, 2),
                user_id: f.user.id.clone(),
                budget_type: crate::domain::models::BudgetType::Category,
                category: Some(Category::Food),
                amount: 100.0,
                current_amount: 0.0,
                month: Budget::month_name(now),
                year: Budget::year_of(now),
            })
            .unwrap();

        f.transactions
            .store_transaction(&expense(&f.user.id, "t1", 150.0, Category::Food, now))
            .unwrap();
        // Entertainment has no budget, so it must not produce anything.
        f.transactions
            .store_transaction(&expense(&f.user.id, "t2", 999.0, Category::Entertainment, now))
            .unwrap();

        let recommendations = f.service.analyze_spending(&f.user.id).unwrap();
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].category, "Food");
        assert!(recommendations[0].message.contains("exceeded"));
    }

    #[test]
    fn test_old_expenses_outside_window_ignored() {
        let f = setup();
        f.budgets.store_budget(&monthly_budget(&f.user.id, 500.0)).unwrap();
        let old_date = Utc::now().checked_sub_months(Months::new(5)).unwrap();
        f.transactions
            .store_transaction(&expense(&f.user.id, "t1", 600.0, Category::Other, old_date))
            .unwrap();

        let recommendations = f.service.analyze_spending(&f.user.id).unwrap();
        // Spend of 0 this month against a 500 budget reads as underspending.
        assert_eq!(recommendations.len(), 1);
        assert!(recommendations[0].message.contains("underspent"));
    }

    #[test]
    fn test_analyze_all_users() {
        let f = setup();
        f.budgets.store_budget(&monthly_budget(&f.user.id, 500.0)).unwrap();
        f.transactions
            .store_transaction(&expense(&f.user.id, "t1", 600.0, Category::Other, Utc::now()))
            .unwrap();

        let analyzed = f.service.analyze_all_users().unwrap();
        assert_eq!(analyzed, 1);
        assert_eq!(f.notifier.sent().len(), 1);
    }
}
