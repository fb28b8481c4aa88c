//! Goal service domain logic.
//!
//! This module contains the core business logic for savings goals: CRUD,
//! the income allocator that distributes a share of every income across
//! active goals, and the deadline reminder sweep.
//!
//! ## Business Rules
//!
//! - The allocation percentages of a user's goals may never sum above 100
//!   at create/update time (exactly 100 is accepted); the allocator itself
//!   does not re-validate
//! - `current_amount` grows monotonically and is clamped at the target
//! - A goal-completion notification fires exactly once, at the transition
//! - Name length 3-50 characters; deadlines may not lie in the past

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

use crate::domain::commands::goals::{
    CreateGoalCommand, CreateGoalResult, UpdateGoalCommand, UpdateGoalResult,
};
use crate::domain::email_service::Notifier;
use crate::domain::errors::{Error, Result};
use crate::domain::models::Goal;
use crate::storage::csv::{CsvConnection, GoalRepository, UserRepository};
use crate::storage::traits::{GoalStorage, UserStorage};

/// Goal deadlines within this many days trigger a reminder.
const DEADLINE_REMINDER_DAYS: i64 = 7;

#[derive(Clone)]
pub struct GoalService {
    goal_repository: GoalRepository,
    user_repository: UserRepository,
    notifier: Arc<dyn Notifier>,
}

impl GoalService {
    pub fn new(connection: Arc<CsvConnection>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            goal_repository: GoalRepository::new((*connection).clone()),
            user_repository: UserRepository::new((*connection).clone()),
            notifier,
        }
    }

    /// Create a new goal
    pub fn create_goal(&self, command: CreateGoalCommand) -> Result<CreateGoalResult> {
        info!("Creating goal: {:?}", command);

        let name = command.name.trim();
        if name.len() < 3 || name.len() > 50 {
            return Err(Error::Validation(
                "Goal name must be between 3 and 50 characters".to_string(),
            ));
        }
        if command.target_amount < 0.0 {
            return Err(Error::Validation(
                "Target amount cannot be negative".to_string(),
            ));
        }
        if command.deadline < Utc::now() {
            return Err(Error::Validation("Deadline cannot be in the past".to_string()));
        }
        Self::validate_percentage(command.allocation_percentage)?;
        if self.user_repository.get_user(&command.user_id)?.is_none() {
            return Err(Error::NotFound(format!("User {}", command.user_id)));
        }

        // The total allocation across all of the user's goals must stay
        // within 100%.
        let existing: f64 = self
            .goal_repository
            .list_goals(&command.user_id)?
            .iter()
            .map(|g| g.allocation_percentage)
            .sum();
        if existing + command.allocation_percentage > 100.0 {
            return Err(Error::Validation(
                "Total allocation percentage cannot exceed 100%".to_string(),
            ));
        }

        let now_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let goal = Goal {
            id: Goal::generate_id(&command.user_id, now_millis),
            user_id: command.user_id,
            name: name.to_string(),
            target_amount: command.target_amount,
            current_amount: 0.0,
            deadline: command.deadline,
            allocation_percentage: command.allocation_percentage,
        };
        self.goal_repository.store_goal(&goal)?;

        info!("Successfully created goal: {}", goal.id);
        Ok(CreateGoalResult {
            goal,
            success_message: "Goal created successfully".to_string(),
        })
    }

    pub fn get_goal(&self, user_id: &str, goal_id: &str) -> Result<Goal> {
        self.goal_repository
            .get_goal(user_id, goal_id)?
            .ok_or_else(|| Error::NotFound(format!("Goal {}", goal_id)))
    }

    pub fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        Ok(self.goal_repository.list_goals(user_id)?)
    }

    /// Update a goal. The allocation-sum check excludes the goal being
    /// updated from the prior total, so re-submitting a goal's own
    /// percentage is not double-counted.
    pub fn update_goal(&self, command: UpdateGoalCommand) -> Result<UpdateGoalResult> {
        info!("Updating goal: {:?}", command);

        let mut goal = self.get_goal(&command.user_id, &command.goal_id)?;

        if let Some(percentage) = command.allocation_percentage {
            Self::validate_percentage(percentage)?;
            let other_goals: f64 = self
                .goal_repository
                .list_goals(&command.user_id)?
                .iter()
                .filter(|g| g.id != goal.id)
                .map(|g| g.allocation_percentage)
                .sum();
            if other_goals + percentage > 100.0 {
                return Err(Error::Validation(
                    "Total allocation percentage cannot exceed 100%".to_string(),
                ));
            }
            goal.allocation_percentage = percentage;
        }

        if let Some(target_amount) = command.target_amount {
            if target_amount < 0.0 {
                return Err(Error::Validation(
                    "Target amount cannot be negative".to_string(),
                ));
            }
            goal.target_amount = target_amount;
        }

        if let Some(current_amount) = command.current_amount {
            if current_amount < 0.0 {
                return Err(Error::Validation(
                    "Current amount cannot be negative".to_string(),
                ));
            }
            goal.current_amount = current_amount;
        }
        if goal.current_amount > goal.target_amount {
            return Err(Error::Validation(
                "Current amount cannot exceed target amount".to_string(),
            ));
        }

        if let Some(deadline) = command.deadline {
            if deadline < Utc::now() {
                return Err(Error::Validation("Deadline cannot be in the past".to_string()));
            }
            goal.deadline = deadline;
        }

        self.goal_repository.update_goal(&goal)?;

        info!("Successfully updated goal: {}", goal.id);
        Ok(UpdateGoalResult {
            goal,
            success_message: "Goal updated successfully".to_string(),
        })
    }

    pub fn delete_goal(&self, user_id: &str, goal_id: &str) -> Result<()> {
        if !self.goal_repository.delete_goal(user_id, goal_id)? {
            return Err(Error::NotFound(format!("Goal {}", goal_id)));
        }
        info!("Deleted goal: {}", goal_id);
        Ok(())
    }

    /// Distribute a posted income across the user's goals.
    ///
    /// Completed goals are skipped. Each remaining goal receives its
    /// allocation percentage of the income, clamped at the target; the
    /// completion notification fires at the transition and only then.
    /// Per-goal failures are logged and the loop continues.
    pub fn apply_income(&self, user_id: &str, usd_amount: f64) {
        let user = match self.user_repository.get_user(user_id) {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!("Skipping goal allocation for unknown user: {}", user_id);
                return;
            }
            Err(e) => {
                warn!("Failed to load user {} for goal allocation: {:#}", user_id, e);
                return;
            }
        };

        let goals = match self.goal_repository.list_goals(user_id) {
            Ok(goals) => goals,
            Err(e) => {
                warn!("Failed to list goals for {}: {:#}", user_id, e);
                return;
            }
        };

        for mut goal in goals {
            if goal.is_complete() {
                info!("Goal \"{}\" is already completed. Skipping allocation.", goal.name);
                continue;
            }

            let delta = goal.allocation_percentage / 100.0 * usd_amount;
            goal.current_amount = (goal.current_amount + delta).min(goal.target_amount);

            if let Err(e) = self.goal_repository.update_goal(&goal) {
                warn!("Failed to persist goal {}: {:#}", goal.id, e);
                continue;
            }

            if goal.is_complete() {
                info!("Goal \"{}\" has been completed.", goal.name);
                let subject = format!("Goal Completed: {}", goal.name);
                let body = format!(
                    "Congratulations! You have completed your goal of saving for {}.",
                    goal.name
                );
                if let Err(e) = self.notifier.send(&user.email, &subject, &body, None) {
                    warn!("Failed to send goal-completion notification: {:#}", e);
                }
            }
        }
    }

    /// Periodic sweep over every goal system-wide: owners of incomplete
    /// goals whose deadline falls within the next seven days (inclusive)
    /// get a reminder. Returns the number of reminders sent.
    pub fn send_deadline_reminders(&self, now: DateTime<Utc>) -> Result<usize> {
        let goals = self.goal_repository.list_all_goals()?;
        let today = now.date_naive();
        let window_end = today + chrono::Duration::days(DEADLINE_REMINDER_DAYS);
        let mut sent = 0;

        for goal in goals {
            if goal.is_complete() {
                info!(
                    "Goal \"{}\" has already been achieved. No reminder needed.",
                    goal.name
                );
                continue;
            }

            let deadline = goal.deadline.date_naive();
            if deadline < today || deadline > window_end {
                continue;
            }

            let user = match self.user_repository.get_user(&goal.user_id) {
                Ok(Some(user)) => user,
                Ok(None) => {
                    warn!("No user found for goal owner: {}", goal.user_id);
                    continue;
                }
                Err(e) => {
                    warn!("Failed to load goal owner {}: {:#}", goal.user_id, e);
                    continue;
                }
            };

            let subject = format!("Reminder: Deadline Approaching for Goal - {}", goal.name);
            let body = format!(
                "Reminder: Your goal of saving for \"{}\" is due soon. Your deadline is {}. Keep saving!",
                goal.name,
                deadline.format("%Y-%m-%d")
            );
            match self.notifier.send(&user.email, &subject, &body, None) {
                Ok(()) => sent += 1,
                Err(e) => warn!("Failed to send goal reminder: {:#}", e),
            }
        }

        Ok(sent)
    }

    fn validate_percentage(percentage: f64) -> Result<()> {
        if !(0.0..=100.0).contains(&percentage) {
            return Err(Error::Validation(
                "Allocation percentage must be between 0 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Role, User};
    use crate::domain::test_support::RecordingNotifier;
    use tempfile::tempdir;

    struct Fixture {
        _temp: tempfile::TempDir,
        service: GoalService,
        notifier: Arc<RecordingNotifier>,
        user: User,
    }

    fn setup() -> Fixture {
        let temp = tempdir().unwrap();
        let conn = Arc::new(CsvConnection::new(temp.path()).unwrap());
        let notifier = Arc::new(RecordingNotifier::new());
        let service = GoalService::new(conn.clone(), notifier.clone());

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

    fn goal_command(user_id: &str, name: &str, target: f64, pct: f64) -> CreateGoalCommand {
        CreateGoalCommand {
            user_id: user_id.to_string(),
            name: name.to_string(),
            target_amount: target,
            deadline: Utc::now() + chrono::Duration::days(90),
            allocation_percentage: pct,
        }
    }

    #[test]
    fn test_create_goal() {
        let f = setup();
        let result = f
            .service
            .create_goal(goal_command(&f.user.id, "New car", 5000.0, 40.0))
            .unwrap();

        assert_eq!(result.goal.current_amount, 0.0);
        assert_eq!(result.goal.allocation_percentage, 40.0);
    }

    #[test]
    fn test_allocation_sum_boundary() {
        let f = setup();
        f.service
            .create_goal(goal_command(&f.user.id, "Car", 5000.0, 70.0))
            .unwrap();

        // Exactly 100 in total is accepted.
        f.service
            .create_goal(goal_command(&f.user.id, "House", 50000.0, 30.0))
            .unwrap();

        // Anything past 100 is rejected.
        let err = f
            .service
            .create_goal(goal_command(&f.user.id, "Boat", 1000.0, 0.01))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_allocation_sum_just_over_boundary() {
        let f = setup();
        f.service
            .create_goal(goal_command(&f.user.id, "Car", 5000.0, 70.0))
            .unwrap();

        let err = f
            .service
            .create_goal(goal_command(&f.user.id, "House", 1000.0, 30.01))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_percentage_out_of_range_rejected() {
        let f = setup();
        for pct in [-1.0, 100.5] {
            let err = f
                .service
                .create_goal(goal_command(&f.user.id, "Car", 5000.0, pct))
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
    }

    #[test]
    fn test_deadline_in_past_rejected() {
        let f = setup();
        let mut cmd = goal_command(&f.user.id, "Car", 5000.0, 10.0);
        cmd.deadline = Utc::now() - chrono::Duration::days(1);

        let err = f.service.create_goal(cmd).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_update_excludes_own_percentage_from_sum() {
        let f = setup();
        let car = f
            .service
            .create_goal(goal_command(&f.user.id, "Car", 5000.0, 60.0))
            .unwrap()
            .goal;
        f.service
            .create_goal(goal_command(&f.user.id, "House", 50000.0, 40.0))
            .unwrap();

        // Re-submitting the goal's own 60% must not be double-counted.
        let updated = f
            .service
            .update_goal(UpdateGoalCommand {
                user_id: f.user.id.clone(),
                goal_id: car.id.clone(),
                allocation_percentage: Some(60.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.goal.allocation_percentage, 60.0);

        // Raising it past the other goal's share is still rejected.
        let err = f
            .service
            .update_goal(UpdateGoalCommand {
                user_id: f.user.id.clone(),
                goal_id: car.id,
                allocation_percentage: Some(61.0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_update_current_above_target_rejected() {
        let f = setup();
        let goal = f
            .service
            .create_goal(goal_command(&f.user.id, "Car", 100.0, 10.0))
            .unwrap()
            .goal;

        let err = f
            .service
            .update_goal(UpdateGoalCommand {
                user_id: f.user.id.clone(),
                goal_id: goal.id,
                current_amount: Some(150.0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_apply_income_splits_by_percentage() {
        let f = setup();
        let car = f
            .service
            .create_goal(goal_command(&f.user.id, "Car", 100000.0, 50.0))
            .unwrap()
            .goal;
        let house = f
            .service
            .create_goal(goal_command(&f.user.id, "House", 100000.0, 30.0))
            .unwrap()
            .goal;

        f.service.apply_income(&f.user.id, 1000.0);

        assert_eq!(
            f.service.get_goal(&f.user.id, &car.id).unwrap().current_amount,
            500.0
        );
        assert_eq!(
            f.service.get_goal(&f.user.id, &house.id).unwrap().current_amount,
            300.0
        );
        // Targets are far away, so no completion notification.
        assert!(f.notifier.sent().is_empty());
    }

    #[test]
    fn test_apply_income_clamps_and_notifies_once() {
        let f = setup();
        let goal = f
            .service
            .create_goal(goal_command(&f.user.id, "Bike", 100.0, 50.0))
            .unwrap()
            .goal;

        // 50% of 300 = 150, clamped at the 100 target.
        f.service.apply_income(&f.user.id, 300.0);
        let fetched = f.service.get_goal(&f.user.id, &goal.id).unwrap();
        assert_eq!(fetched.current_amount, 100.0);
        assert_eq!(f.notifier.subjects(), vec!["Goal Completed: Bike"]);

        // Further income skips the completed goal; no second notification.
        f.service.apply_income(&f.user.id, 300.0);
        let fetched = f.service.get_goal(&f.user.id, &goal.id).unwrap();
        assert_eq!(fetched.current_amount, 100.0);
        assert_eq!(f.notifier.sent().len(), 1);
    }

    #[test]
    fn test_apply_income_notifies_on_exact_target() {
        let f = setup();
        f.service
            .create_goal(goal_command(&f.user.id, "Bike", 100.0, 50.0))
            .unwrap();

        // 50% of 200 lands exactly on the target.
        f.service.apply_income(&f.user.id, 200.0);
        assert_eq!(f.notifier.sent().len(), 1);
    }

    #[test]
    fn test_deadline_reminders_window() {
        let f = setup();
        let now = Utc::now();

        let mut due_soon = goal_command(&f.user.id, "Due soon", 1000.0, 10.0);
        due_soon.deadline = now + chrono::Duration::days(3);
        f.service.create_goal(due_soon).unwrap();

        let mut far_away = goal_command(&f.user.id, "Far away", 1000.0, 10.0);
        far_away.deadline = now + chrono::Duration::days(30);
        f.service.create_goal(far_away).unwrap();

        let sent = f.service.send_deadline_reminders(now).unwrap();
        assert_eq!(sent, 1);
        let emails = f.notifier.sent();
        assert_eq!(emails.len(), 1);
        assert!(emails[0].subject.contains("Due soon"));
        assert_eq!(emails[0].to, "alice@example.com");
    }

    #[test]
    fn test_deadline_reminder_skips_completed_goal() {
        let f = setup();
        let now = Utc::now();

        let mut cmd = goal_command(&f.user.id, "Nearly due", 100.0, 50.0);
        cmd.deadline = now + chrono::Duration::days(2);
        let goal = f.service.create_goal(cmd).unwrap().goal;

        f.service
            .update_goal(UpdateGoalCommand {
                user_id: f.user.id.clone(),
                goal_id: goal.id,
                current_amount: Some(100.0),
                ..Default::default()
            })
            .unwrap();

        let sent = f.service.send_deadline_reminders(now).unwrap();
        assert_eq!(sent, 0);
    }
}
