//! Budget service domain logic.
//!
//! Owns budget CRUD and the expense allocator that accumulates spend into
//! the matching monthly and category budgets.
//!
//! ## Business Rules
//!
//! - At most one monthly budget per (user, month, year), enforced when the
//!   budget is written, not assumed at query time
//! - At most one category budget per (user, category)
//! - `current_amount` only ever grows through the allocator
//! - The allocator's monthly and category legs are independent; a failure
//!   on one leg is logged and the other leg still runs

use chrono::Utc;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

use crate::domain::commands::budgets::{
    CreateBudgetCommand, CreateBudgetResult, UpdateBudgetCommand, UpdateBudgetResult,
};
use crate::domain::email_service::Notifier;
use crate::domain::errors::{Error, Result};
use crate::domain::models::{Budget, BudgetType, Category, User};
use crate::storage::csv::{BudgetRepository, CsvConnection, UserRepository};
use crate::storage::traits::{BudgetStorage, UserStorage};

#[derive(Clone)]
pub struct BudgetService {
    budget_repository: BudgetRepository,
    user_repository: UserRepository,
    notifier: Arc<dyn Notifier>,
}

impl BudgetService {
    pub fn new(connection: Arc<CsvConnection>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            budget_repository: BudgetRepository::new((*connection).clone()),
            user_repository: UserRepository::new((*connection).clone()),
            notifier,
        }
    }

    /// Create a new budget (monthly or category-specific) for the current
    /// month/year, rejecting duplicates at write time.
    pub fn create_budget(&self, command: CreateBudgetCommand) -> Result<CreateBudgetResult> {
        info!("Creating budget: {:?}", command);

        if command.amount < 1.0 {
            return Err(Error::Validation(
                "Budget amount must be at least 1".to_string(),
            ));
        }
        if self.user_repository.get_user(&command.user_id)?.is_none() {
            return Err(Error::NotFound(format!("User {}", command.user_id)));
        }

        let now = Utc::now();
        let month = Budget::month_name(now);
        let year = Budget::year_of(now);

        match command.budget_type {
            BudgetType::Monthly => {
                if command.category.is_some() {
                    return Err(Error::Validation(
                        "Monthly budgets cannot have a category".to_string(),
                    ));
                }
                if self
                    .budget_repository
                    .find_monthly_budget(&command.user_id, &month, year)?
                    .is_some()
                {
                    return Err(Error::Validation(
                        "You can only have one monthly budget for the current month".to_string(),
                    ));
                }
            }
            BudgetType::Category => {
                let category = command.category.ok_or_else(|| {
                    Error::Validation("Category is required for category budgets".to_string())
                })?;
                if self
                    .budget_repository
                    .find_category_budget(&command.user_id, category)?
                    .is_some()
                {
                    return Err(Error::Validation(format!(
                        "A budget for the category '{}' already exists",
                        category
                    )));
                }
            }
        }

        let now_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let budget = Budget {
            id: Budget::generate_id(&command.user_id, now_millis),
            user_id: command.user_id,
            budget_type: command.budget_type,
            category: command.category,
            amount: command.amount,
            current_amount: 0.0,
            month,
            year,
        };
        self.budget_repository.store_budget(&budget)?;

        info!("Successfully created budget: {}", budget.id);
        Ok(CreateBudgetResult {
            budget,
            success_message: "Budget created successfully".to_string(),
        })
    }

    pub fn get_budget(&self, user_id: &str, budget_id: &str) -> Result<Budget> {
        self.budget_repository
            .get_budget(user_id, budget_id)?
            .ok_or_else(|| Error::NotFound(format!("Budget {}", budget_id)))
    }

    pub fn list_budgets(&self, user_id: &str) -> Result<Vec<Budget>> {
        Ok(self.budget_repository.list_budgets(user_id)?)
    }

    /// Change a budget's target amount. The accumulated spend is left
    /// untouched; it never decreases automatically.
    pub fn update_budget(&self, command: UpdateBudgetCommand) -> Result<UpdateBudgetResult> {
        info!("Updating budget: {:?}", command);

        if command.amount < 1.0 {
            return Err(Error::Validation(
                "Budget amount must be at least 1".to_string(),
            ));
        }

        let mut budget = self.get_budget(&command.user_id, &command.budget_id)?;
        budget.amount = command.amount;
        self.budget_repository.update_budget(&budget)?;

        Ok(UpdateBudgetResult {
            budget,
            success_message: "Budget updated successfully".to_string(),
        })
    }

    pub fn delete_budget(&self, user_id: &str, budget_id: &str) -> Result<()> {
        if !self.budget_repository.delete_budget(user_id, budget_id)? {
            return Err(Error::NotFound(format!("Budget {}", budget_id)));
        }
        info!("Deleted budget: {}", budget_id);
        Ok(())
    }

    /// Accumulate a posted expense into the user's budgets.
    ///
    /// The monthly and category legs run independently; an expense can
    /// trigger zero, one, or two over-budget notifications. Failures on
    /// either leg are logged and never propagate to the caller.
    pub fn apply_expense(&self, user_id: &str, usd_amount: f64, category: Category) {
        let user = match self.user_repository.get_user(user_id) {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!("Skipping budget allocation for unknown user: {}", user_id);
                return;
            }
            Err(e) => {
                warn!("Failed to load user {} for budget allocation: {:#}", user_id, e);
                return;
            }
        };

        if let Err(e) = self.apply_to_monthly_budget(&user, usd_amount) {
            warn!("Failed to update monthly budget for {}: {:#}", user_id, e);
        }
        if let Err(e) = self.apply_to_category_budget(&user, usd_amount, category) {
            warn!(
                "Failed to update {} budget for {}: {:#}",
                category, user_id, e
            );
        }
    }

    fn apply_to_monthly_budget(&self, user: &User, usd_amount: f64) -> anyhow::Result<()> {
        let now = Utc::now();
        let month = Budget::month_name(now);
        let year = Budget::year_of(now);

        let mut budget = match self
            .budget_repository
            .find_monthly_budget(&user.id, &month, year)?
        {
            Some(budget) => budget,
            None => return Ok(()),
        };

        budget.current_amount += usd_amount;
        self.budget_repository.update_budget(&budget)?;

        if budget.current_amount > budget.amount {
            let body = format!(
                "You have exceeded your monthly budget of ${:.2}. You've spent ${:.2} this month.",
                budget.amount, budget.current_amount
            );
            if let Err(e) = self
                .notifier
                .send(&user.email, "Monthly Budget Exceeded", &body, None)
            {
                warn!("Failed to send over-budget notification: {:#}", e);
            }
        }
        Ok(())
    }

    fn apply_to_category_budget(
        &self,
        user: &User,
        usd_amount: f64,
        category: Category,
    ) -> anyhow::Result<()> {
        let mut budget = match self
            .budget_repository
            .find_category_budget(&user.id, category)?
        {
            Some(budget) => budget,
            None => return Ok(()),
        };

        budget.current_amount += usd_amount;
        self.budget_repository.update_budget(&budget)?;

        if budget.current_amount > budget.amount {
            let subject = format!("Category Budget Exceeded - {}", category);
            let body = format!(
                "You have exceeded your {} budget of ${:.2}. You've spent ${:.2} this month.",
                category, budget.amount, budget.current_amount
            );
            if let Err(e) = self.notifier.send(&user.email, &subject, &body, None) {
                warn!("Failed to send over-budget notification: {:#}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Role;
    use crate::domain::test_support::RecordingNotifier;
    use tempfile::tempdir;

    struct Fixture {
        _temp: tempfile::TempDir,
        service: BudgetService,
        notifier: Arc<RecordingNotifier>,
        user: User,
    }

    fn setup() -> Fixture {
        let temp = tempdir().unwrap();
        let conn = Arc::new(CsvConnection::new(temp.path()).unwrap());
        let notifier = Arc::new(RecordingNotifier::new());
        let service = BudgetService::new(conn.clone(), notifier.clone());

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
            user,
        }
    }

    fn monthly_command(user_id: &str, amount: f64) -> CreateBudgetCommand {
        CreateBudgetCommand {
            user_id: user_id.to_string(),
            budget_type: BudgetType::Monthly,
            category: None,
            amount,
        }
    }

    fn category_command(user_id: &str, category: Category, amount: f64) -> CreateBudgetCommand {
        CreateBudgetCommand {
            user_id: user_id.to_string(),
            budget_type: BudgetType::Category,
            category: Some(category),
            amount,
        }
    }

    #[test]
    fn test_create_monthly_budget() {
        let f = setup();
        let result = f.service.create_budget(monthly_command(&f.user.id, 500.0)).unwrap();

        assert_eq!(result.budget.amount, 500.0);
        assert_eq!(result.budget.current_amount, 0.0);
        assert_eq!(result.budget.budget_type, BudgetType::Monthly);
    }

    #[test]
    fn test_second_monthly_budget_rejected() {
        let f = setup();
        f.service.create_budget(monthly_command(&f.user.id, 500.0)).unwrap();

        let err = f
            .service
            .create_budget(monthly_command(&f.user.id, 700.0))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_monthly_budget_with_category_rejected() {
        let f = setup();
        let mut cmd = monthly_command(&f.user.id, 500.0);
        cmd.category = Some(Category::Food);

        let err = f.service.create_budget(cmd).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_category_budget_requires_category() {
        let f = setup();
        let mut cmd = category_command(&f.user.id, Category::Food, 200.0);
        cmd.category = None;

        let err = f.service.create_budget(cmd).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_duplicate_category_budget_rejected() {
        let f = setup();
        f.service
            .create_budget(category_command(&f.user.id, Category::Food, 200.0))
            .unwrap();

        let err = f
            .service
            .create_budget(category_command(&f.user.id, Category::Food, 300.0))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // A different category is still fine.
        f.service
            .create_budget(category_command(&f.user.id, Category::Entertainment, 100.0))
            .unwrap();
    }

    #[test]
    fn test_amount_below_one_rejected() {
        let f = setup();
        let err = f
            .service
            .create_budget(monthly_command(&f.user.id, 0.5))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_create_budget_for_unknown_user_rejected() {
        let f = setup();
        let err = f
            .service
            .create_budget(monthly_command("missing", 500.0))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_apply_expense_updates_both_budgets_independently() {
        let f = setup();
        let monthly = f
            .service
            .create_budget(monthly_command(&f.user.id, 500.0))
            .unwrap()
            .budget;
        let food = f
            .service
            .create_budget(category_command(&f.user.id, Category::Food, 200.0))
            .unwrap()
            .budget;

        f.service.apply_expense(&f.user.id, 50.0, Category::Food);

        assert_eq!(
            f.service.get_budget(&f.user.id, &monthly.id).unwrap().current_amount,
            50.0
        );
        assert_eq!(
            f.service.get_budget(&f.user.id, &food.id).unwrap().current_amount,
            50.0
        );
        assert!(f.notifier.sent().is_empty());

        // A different category still hits the monthly budget only.
        f.service
            .apply_expense(&f.user.id, 25.0, Category::Entertainment);
        assert_eq!(
            f.service.get_budget(&f.user.id, &monthly.id).unwrap().current_amount,
            75.0
        );
        assert_eq!(
            f.service.get_budget(&f.user.id, &food.id).unwrap().current_amount,
            50.0
        );
    }

    #[test]
    fn test_apply_expense_emits_over_budget_notifications() {
        let f = setup();
        f.service.create_budget(monthly_command(&f.user.id, 100.0)).unwrap();
        f.service
            .create_budget(category_command(&f.user.id, Category::Food, 40.0))
            .unwrap();

        f.service.apply_expense(&f.user.id, 60.0, Category::Food);
        // Category budget exceeded (60 > 40), monthly not (60 < 100).
        let sent = f.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Category Budget Exceeded - Food");
        assert!(sent[0].body.contains("40.00"));
        assert!(sent[0].body.contains("60.00"));

        f.service.apply_expense(&f.user.id, 60.0, Category::Food);
        // Now both exceeded: monthly at 120 > 100, category at 120 > 40.
        let subjects = f.notifier.subjects();
        assert_eq!(subjects.len(), 3);
        assert!(subjects.contains(&"Monthly Budget Exceeded".to_string()));
    }

    #[test]
    fn test_current_amount_never_decreases() {
        let f = setup();
        let monthly = f
            .service
            .create_budget(monthly_command(&f.user.id, 500.0))
            .unwrap()
            .budget;

        let mut last = 0.0;
        for amount in [10.0, 0.5, 200.0, 33.25] {
            f.service.apply_expense(&f.user.id, amount, Category::Other);
            let current = f
                .service
                .get_budget(&f.user.id, &monthly.id)
                .unwrap()
                .current_amount;
            assert!(current >= last);
            last = current;
        }
    }

    #[test]
    fn test_apply_expense_without_budgets_is_noop() {
        let f = setup();
        f.service.apply_expense(&f.user.id, 50.0, Category::Food);
        assert!(f.notifier.sent().is_empty());
    }

    #[test]
    fn test_update_budget_amount_keeps_spend() {
        let f = setup();
        let budget = f
            .service
            .create_budget(monthly_command(&f.user.id, 500.0))
            .unwrap()
            .budget;
        f.service.apply_expense(&f.user.id, 80.0, Category::Other);

        let updated = f
            .service
            .update_budget(UpdateBudgetCommand {
                user_id: f.user.id.clone(),
                budget_id: budget.id.clone(),
                amount: 800.0,
            })
            .unwrap();
        assert_eq!(updated.budget.amount, 800.0);
        assert_eq!(updated.budget.current_amount, 80.0);
    }

    #[test]
    fn test_delete_missing_budget_is_not_found() {
        let f = setup();
        let err = f.service.delete_budget(&f.user.id, "missing").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
