//! Financial report generation.
//!
//! Produces a plain-text report artifact covering transactions, budgets
//! and goal progress for a period, records it as an immutable `Report`,
//! and emails it to the user as an attachment. Deleting a report removes
//! the artifact along with the record.

use anyhow::Context;
use chrono::{DateTime, Months, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::commands::reports::{GenerateReportCommand, GenerateReportResult};
use crate::domain::email_service::Notifier;
use crate::domain::errors::{Error, Result};
use crate::domain::models::{
    Budget, Goal, Report, Transaction, TransactionType, User,
};
use crate::storage::csv::{
    BudgetRepository, CsvConnection, GoalRepository, ReportRepository, TransactionRepository,
    UserRepository,
};
use crate::storage::traits::{
    BudgetStorage, GoalStorage, ReportStorage, TransactionStorage, UserStorage,
};

#[derive(Clone)]
pub struct ReportService {
    connection: Arc<CsvConnection>,
    transaction_repository: TransactionRepository,
    budget_repository: BudgetRepository,
    goal_repository: GoalRepository,
    report_repository: ReportRepository,
    user_repository: UserRepository,
    notifier: Arc<dyn Notifier>,
}

impl ReportService {
    pub fn new(connection: Arc<CsvConnection>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            transaction_repository: TransactionRepository::new((*connection).clone()),
            budget_repository: BudgetRepository::new((*connection).clone()),
            goal_repository: GoalRepository::new((*connection).clone()),
            report_repository: ReportRepository::new((*connection).clone()),
            user_repository: UserRepository::new((*connection).clone()),
            connection,
            notifier,
        }
    }

    /// Generate a report artifact for the period, defaulting to the last
    /// month, and email it to the user. The email is best-effort; the
    /// report exists either way.
    pub fn generate_report(&self, command: GenerateReportCommand) -> Result<GenerateReportResult> {
        let user = self
            .user_repository
            .get_user(&command.user_id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", command.user_id)))?;
        info!("Generating report for: {}", user.username);

        let end_date = command.end_date.unwrap_or_else(Utc::now);
        let start_date = command
            .start_date
            .unwrap_or_else(|| end_date.checked_sub_months(Months::new(1)).unwrap_or(end_date));

        let mut transactions: Vec<Transaction> = self
            .transaction_repository
            .list_transactions(&user.id)?
            .into_iter()
            .filter(|t| t.date >= start_date && t.date < end_date)
            .collect();
        if let Some(categories) = &command.categories {
            transactions.retain(|t| categories.contains(&t.category));
        }
        if let Some(tags) = &command.tags {
            transactions.retain(|t| t.tags.iter().any(|tag| tags.contains(tag)));
        }
        transactions.sort_by(|a, b| a.date.cmp(&b.date));

        let budgets = self.budget_repository.list_budgets(&user.id)?;
        let goals = self.goal_repository.list_goals(&user.id)?;

        let content =
            render_report(&user, start_date, end_date, &transactions, &budgets, &goals);

        let artifact_dir = self.connection.report_artifact_directory(&user.id)?;
        let file_name = format!(
            "financial_report_{}_{}.txt",
            user.username,
            Transaction::now_millis()
        );
        let file_path = artifact_dir.join(file_name);
        std::fs::write(&file_path, content)
            .with_context(|| format!("Failed to write report {}", file_path.display()))?;

        let report = Report {
            id: Report::generate_id(),
            user_id: user.id.clone(),
            file_path: file_path.display().to_string(),
            generated_at: Utc::now(),
        };
        self.report_repository.store_report(&report)?;

        if let Err(e) = self.notifier.send(
            &user.email,
            "Your Financial Report",
            "Please find your financial report attached.",
            Some(&file_path),
        ) {
            warn!("Failed to email report to {}: {:#}", user.email, e);
        }

        info!("Saved report to: {}", report.file_path);
        Ok(GenerateReportResult {
            report,
            success_message: "Report generated successfully".to_string(),
        })
    }

    pub fn list_reports(&self, user_id: &str) -> Result<Vec<Report>> {
        Ok(self.report_repository.list_reports(user_id)?)
    }

    /// Delete a report record and the artifact it points at.
    pub fn delete_report(&self, user_id: &str, report_id: &str) -> Result<()> {
        let report = self
            .report_repository
            .get_report(user_id, report_id)?
            .ok_or_else(|| Error::NotFound(format!("Report {}", report_id)))?;

        let path = Path::new(&report.file_path);
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove report file {}", report.file_path))?;
        }
        self.report_repository.delete_report(user_id, report_id)?;

        info!("Deleted report: {}", report_id);
        Ok(())
    }

    /// Monthly sweep: generate a default-period report for every user.
    /// Per-user failures are logged and skipped.
    pub fn generate_for_all_users(&self) -> Result<usize> {
        let users = self.user_repository.list_users()?;
        let mut generated = 0;
        for user in users {
            info!("Sending report to user: {}", user.username);
            let command = GenerateReportCommand {
                user_id: user.id.clone(),
                ..Default::default()
            };
            match self.generate_report(command) {
                Ok(_) => generated += 1,
                Err(e) => warn!("Report generation failed for {}: {:#}", user.username, e),
            }
        }
        Ok(generated)
    }
}

/// Render the report body. Layout mirrors the sections of the emailed
/// statement: transactions, budgets, goal progress, then a summary.
fn render_report(
    user: &User,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    transactions: &[Transaction],
    budgets: &[Budget],
    goals: &[Goal],
) -> String {
    let mut out = String::new();
    out.push_str("Personal Finance Tracker\n");
    out.push_str("Financial Report\n");
    out.push_str(&format!("User: {}\n", user.username));
    out.push_str(&format!(
        "Period: {} - {}\n\n",
        start_date.format("%Y-%m-%d"),
        end_date.format("%Y-%m-%d")
    ));

    out.push_str("Transactions Overview\n");
    out.push_str("---------------------\n");
    for transaction in transactions {
        let sign = match transaction.transaction_type {
            TransactionType::Income => '+',
            TransactionType::Expense => '-',
        };
        out.push_str(&format!(
            "{} - {}: {}${:.2}\n",
            transaction.date.format("%Y-%m-%d"),
            transaction.category,
            sign,
            transaction.usd_amount()
        ));
    }
    out.push('\n');

    out.push_str("Budget Overview\n");
    out.push_str("---------------\n");
    for budget in budgets {
        let label = budget
            .category
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| "N/A".to_string());
        out.push_str(&format!(
            "{} - {}: budget ${:.2}, spent ${:.2}\n",
            budget.budget_type.as_str(),
            label,
            budget.amount,
            budget.current_amount
        ));
    }
    out.push('\n');

    out.push_str("Goals Overview\n");
    out.push_str("--------------\n");
    for goal in goals {
        let progress = if goal.target_amount > 0.0 {
            goal.current_amount / goal.target_amount * 100.0
        } else {
            100.0
        };
        out.push_str(&format!(
            "{} (deadline {}): {:.2}% achieved\n",
            goal.name,
            goal.deadline.format("%Y-%m-%d"),
            progress
        ));
    }
    out.push('\n');

    let total_income: f64 = transactions
        .iter()
        .filter(|t| t.transaction_type == TransactionType::Income)
        .map(|t| t.usd_amount())
        .sum();
    let total_expense: f64 = transactions
        .iter()
        .filter(|t| t.transaction_type == TransactionType::Expense)
        .map(|t| t.usd_amount())
        .sum();
    out.push_str("Summary\n");
    out.push_str("-------\n");
    out.push_str(&format!("Total income:  ${:.2}\n", total_income));
    out.push_str(&format!("Total expense: ${:.2}\n", total_expense));
    out.push_str(&format!("Net:           ${:.2}\n", total_income - total_expense));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Category, Role, TransactionStatus};
    use crate::domain::test_support::RecordingNotifier;
    use tempfile::tempdir;

    struct Fixture {
        _temp: tempfile::TempDir,
        service: ReportService,
        notifier: Arc<RecordingNotifier>,
        transactions: TransactionRepository,
        user: User,
    }

    fn setup() -> Fixture {
        let temp = tempdir().unwrap();
        let conn = Arc::new(CsvConnection::new(temp.path()).unwrap());
        let notifier = Arc::new(RecordingNotifier::new());
        let service = ReportService::new(conn.clone(), notifier.clone());

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
            user,
        }
    }

    fn transaction(user_id: &str, id: &str, amount: f64, transaction_type: TransactionType, date: DateTime<Utc>) -> Transaction {
        Transaction {
            id: id.to_string(),
            user_id: user_id.to_string(),
            amount,
            currency: "USD".to_string(),
            converted_amount: Some(amount),
            transaction_type,
            category: Category::Other,
            tags: Vec::new(),
            date,
            recurring: false,
            recurrence_pattern: None,
            end_date: None,
            status: TransactionStatus::Completed,
        }
    }

    #[test]
    fn test_generate_report_writes_artifact_and_record() {
        let f = setup();
        let now = Utc::now();
        f.transactions
            .store_transaction(&transaction(
                &f.user.id,
                "t1",
                1000.0,
                TransactionType::Income,
                now - chrono::Duration::days(5),
            ))
            .unwrap();
        f.transactions
            .store_transaction(&transaction(
                &f.user.id,
                "t2",
                400.0,
                TransactionType::Expense,
                now - chrono::Duration::days(3),
            ))
            .unwrap();

        let result = f
            .service
            .generate_report(GenerateReportCommand {
                user_id: f.user.id.clone(),
                ..Default::default()
            })
            .unwrap();

        let content = std::fs::read_to_string(&result.report.file_path).unwrap();
        assert!(content.contains("User: alice"));
        assert!(content.contains("+$1000.00"));
        assert!(content.contains("-$400.00"));
        assert!(content.contains("Net:           $600.00"));

        assert_eq!(f.service.list_reports(&f.user.id).unwrap().len(), 1);

        let sent = f.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].attachment.as_ref().unwrap().display().to_string(),
            result.report.file_path
        );
    }

    #[test]
    fn test_generate_report_filters_period() {
        let f = setup();
        let now = Utc::now();
        f.transactions
            .store_transaction(&transaction(
                &f.user.id,
                "old",
                999.0,
                TransactionType::Expense,
                now - chrono::Duration::days(90),
            ))
            .unwrap();

        let result = f
            .service
            .generate_report(GenerateReportCommand {
                user_id: f.user.id.clone(),
                ..Default::default()
            })
            .unwrap();

        let content = std::fs::read_to_string(&result.report.file_path).unwrap();
        assert!(!content.contains("999.00"));
    }

    #[test]
    fn test_delete_report_removes_file() {
        let f = setup();
        let result = f
            .service
            .generate_report(GenerateReportCommand {
                user_id: f.user.id.clone(),
                ..Default::default()
            })
            .unwrap();
        assert!(Path::new(&result.report.file_path).exists());

        f.service.delete_report(&f.user.id, &result.report.id).unwrap();
        assert!(!Path::new(&result.report.file_path).exists());
        assert!(f.service.list_reports(&f.user.id).unwrap().is_empty());

        let err = f
            .service
            .delete_report(&f.user.id, &result.report.id)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_generate_for_all_users() {
        let f = setup();
        let generated = f.service.generate_for_all_users().unwrap();
        assert_eq!(generated, 1);
        assert_eq!(f.service.list_reports(&f.user.id).unwrap().len(), 1);
    }
}
