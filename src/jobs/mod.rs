//! Wall-clock job scheduler.
//!
//! Drives the periodic sweeps on the same fixed local-time triggers the
//! deployment always used: 08:00 recurring-transaction check, 00:00 trend
//! analysis, 09:00 goal-deadline reminders, and report generation on the
//! first of each month. Each job runs sequentially in its own task; a
//! failed run is logged and the next trigger fires as usual.

use chrono::{Datelike, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::domain::{GoalService, ReportService, TransactionService, TrendService};

/// Fallback delay if a trigger computation fails; never expected to hit.
const RETRY_DELAY: Duration = Duration::from_secs(60);

pub struct JobScheduler {
    pub transaction_service: TransactionService,
    pub trend_service: TrendService,
    pub goal_service: GoalService,
    pub report_service: ReportService,
}

impl JobScheduler {
    /// Spawn one task per scheduled job. The handles live for the rest of
    /// the process.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let transactions = self.transaction_service;
        handles.push(tokio::spawn(run_daily(8, 0, move || {
            info!("Running scheduled task: checking for upcoming/missed recurring transactions");
            match transactions.send_upcoming_transaction_notifications(Utc::now()) {
                Ok(outcome) => info!(
                    "Recurring sweep done: {} upcoming notifications, {} marked missed",
                    outcome.upcoming_notifications, outcome.missed_marked
                ),
                Err(e) => error!("Recurring transaction sweep failed: {:#}", e),
            }
        })));

        let trends = self.trend_service;
        handles.push(tokio::spawn(run_daily(0, 0, move || {
            info!("Running spending trend analysis for all users");
            match trends.analyze_all_users() {
                Ok(analyzed) => info!("Trend analysis done for {} users", analyzed),
                Err(e) => error!("Trend analysis sweep failed: {:#}", e),
            }
        })));

        let goals = self.goal_service;
        handles.push(tokio::spawn(run_daily(9, 0, move || {
            info!("Running scheduled task: checking for upcoming goal deadlines");
            match goals.send_deadline_reminders(Utc::now()) {
                Ok(sent) => info!("Goal reminder sweep done: {} reminders sent", sent),
                Err(e) => error!("Goal reminder sweep failed: {:#}", e),
            }
        })));

        let reports = self.report_service;
        handles.push(tokio::spawn(run_monthly(1, 0, 0, move || {
            info!("Generating and sending financial reports to users");
            match reports.generate_for_all_users() {
                Ok(generated) => info!("Report sweep done: {} reports generated", generated),
                Err(e) => error!("Report sweep failed: {:#}", e),
            }
        })));

        handles
    }
}

async fn run_daily<F>(hour: u32, minute: u32, mut job: F)
where
    F: FnMut() + Send + 'static,
{
    loop {
        let delay = duration_until_next_daily(Local::now().naive_local(), hour, minute);
        tokio::time::sleep(delay).await;
        job();
    }
}

async fn run_monthly<F>(day: u32, hour: u32, minute: u32, mut job: F)
where
    F: FnMut() + Send + 'static,
{
    loop {
        let delay = duration_until_next_monthly(Local::now().naive_local(), day, hour, minute);
        tokio::time::sleep(delay).await;
        job();
    }
}

/// Time until the next occurrence of `hour:minute`, strictly in the future.
fn duration_until_next_daily(now: NaiveDateTime, hour: u32, minute: u32) -> Duration {
    let target_time = match NaiveTime::from_hms_opt(hour, minute, 0) {
        Some(time) => time,
        None => return RETRY_DELAY,
    };
    let mut next = now.date().and_time(target_time);
    if next <= now {
        next += chrono::Duration::days(1);
    }
    (next - now).to_std().unwrap_or(RETRY_DELAY)
}

/// Time until the next occurrence of day-of-month `day` at `hour:minute`.
fn duration_until_next_monthly(now: NaiveDateTime, day: u32, hour: u32, minute: u32) -> Duration {
    let target_time = match NaiveTime::from_hms_opt(hour, minute, 0) {
        Some(time) => time,
        None => return RETRY_DELAY,
    };
    let this_month = NaiveDate::from_ymd_opt(now.year(), now.month(), day);
    let mut next = match this_month {
        Some(date) => date.and_time(target_time),
        None => return RETRY_DELAY,
    };
    if next <= now {
        next = match next.checked_add_months(Months::new(1)) {
            Some(next) => next,
            None => return RETRY_DELAY,
        };
    }
    (next - now).to_std().unwrap_or(RETRY_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_daily_trigger_later_today() {
        let delay = duration_until_next_daily(at(2025, 1, 15, 7, 30), 8, 0);
        assert_eq!(delay, Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_daily_trigger_rolls_to_tomorrow() {
        let delay = duration_until_next_daily(at(2025, 1, 15, 9, 0), 8, 0);
        assert_eq!(delay, Duration::from_secs(23 * 60 * 60));
    }

    #[test]
    fn test_daily_trigger_exact_time_waits_a_day() {
        let delay = duration_until_next_daily(at(2025, 1, 15, 8, 0), 8, 0);
        assert_eq!(delay, Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_monthly_trigger_next_month() {
        let delay = duration_until_next_monthly(at(2025, 1, 15, 12, 0), 1, 0, 0);
        // Jan 15 noon to Feb 1 midnight: 16 full days and 12 hours.
        assert_eq!(delay, Duration::from_secs((16 * 24 + 12) * 60 * 60));
    }

    #[test]
    fn test_monthly_trigger_later_this_month() {
        let delay = duration_until_next_monthly(at(2025, 1, 15, 12, 0), 20, 8, 0);
        assert_eq!(delay, Duration::from_secs((4 * 24 + 20) * 60 * 60));
    }
}
