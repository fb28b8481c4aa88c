//! Dashboard summary aggregates for users and admins.

use crate::domain::errors::{Error, Result};
use crate::domain::models::{Role, TransactionType};
use crate::storage::csv::{
    BudgetRepository, CsvConnection, GoalRepository, TransactionRepository, UserRepository,
};
use crate::storage::traits::{BudgetStorage, GoalStorage, TransactionStorage, UserStorage};
use std::sync::Arc;

/// Per-user totals shown on the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDashboard {
    pub total_income: f64,
    pub total_expense: f64,
    pub net_amount: f64,
    pub total_budgets: usize,
    pub total_budget_amount: f64,
    pub total_goals: usize,
    pub total_goal_target_amount: f64,
    pub total_goal_current_amount: f64,
}

/// System-wide totals, admins only.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminDashboard {
    pub total_users: usize,
    pub total_admins: usize,
    pub total_regular_users: usize,
    pub total_transactions: usize,
    pub total_income: f64,
    pub total_expenses: f64,
    pub total_budget_amount: f64,
    pub total_budgets: usize,
    pub total_goals: usize,
}

#[derive(Clone)]
pub struct DashboardService {
    transaction_repository: TransactionRepository,
    budget_repository: BudgetRepository,
    goal_repository: GoalRepository,
    user_repository: UserRepository,
}

impl DashboardService {
    pub fn new(connection: Arc<CsvConnection>) -> Self {
        Self {
            transaction_repository: TransactionRepository::new((*connection).clone()),
            budget_repository: BudgetRepository::new((*connection).clone()),
            goal_repository: GoalRepository::new((*connection).clone()),
            user_repository: UserRepository::new((*connection).clone()),
        }
    }

    pub fn user_dashboard(&self, user_id: &str) -> Result<UserDashboard> {
        if self.user_repository.get_user(user_id)?.is_none() {
            return Err(Error::NotFound(format!("User {}", user_id)));
        }

        let total_income = self
            .transaction_repository
            .sum_amount_by_type(Some(user_id), TransactionType::Income)?;
        let total_expense = self
            .transaction_repository
            .sum_amount_by_type(Some(user_id), TransactionType::Expense)?;

        let budgets = self.budget_repository.list_budgets(user_id)?;
        let goals = self.goal_repository.list_goals(user_id)?;

        Ok(UserDashboard {
            total_income,
            total_expense,
            net_amount: total_income - total_expense,
            total_budgets: budgets.len(),
            total_budget_amount: budgets.iter().map(|b| b.amount).sum(),
            total_goals: goals.len(),
            total_goal_target_amount: goals.iter().map(|g| g.target_amount).sum(),
            total_goal_current_amount: goals.iter().map(|g| g.current_amount).sum(),
        })
    }

    pub fn admin_dashboard(&self, acting_user_id: &str) -> Result<AdminDashboard> {
        let acting_user = self
            .user_repository
            .get_user(acting_user_id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", acting_user_id)))?;
        if acting_user.role != Role::Admin {
            return Err(Error::Authorization("Admins only".to_string()));
        }

        let users = self.user_repository.list_users()?;
        let total_admins = users.iter().filter(|u| u.role == Role::Admin).count();
        let budgets = self.budget_repository.list_all_budgets()?;
        let goals = self.goal_repository.list_all_goals()?;

        Ok(AdminDashboard {
            total_users: users.len(),
            total_admins,
            total_regular_users: users.len() - total_admins,
            total_transactions: self.transaction_repository.count_transactions()?,
            total_income: self
                .transaction_repository
                .sum_amount_by_type(None, TransactionType::Income)?,
            total_expenses: self
                .transaction_repository
                .sum_amount_by_type(None, TransactionType::Expense)?,
            total_budget_amount: budgets.iter().map(|b| b.amount).sum(),
            total_budgets: budgets.len(),
            total_goals: goals.len(),
        })
    }
}
