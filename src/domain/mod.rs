//! Domain layer: models, commands, errors and services.

pub mod budget_service;
pub mod commands;
pub mod currency_service;
pub mod dashboard_service;
pub mod email_service;
pub mod errors;
pub mod goal_service;
pub mod models;
pub mod report_service;
pub mod transaction_service;
pub mod trend_service;
pub mod user_service;

#[cfg(test)]
pub mod test_support;

pub use budget_service::BudgetService;
pub use currency_service::{CurrencyService, ExchangeRateApiClient, RateProvider};
pub use dashboard_service::DashboardService;
pub use email_service::{EmailConfig, Notifier, SmtpNotifier};
pub use errors::{Error, Result};
pub use goal_service::GoalService;
pub use report_service::ReportService;
pub use transaction_service::TransactionService;
pub use trend_service::TrendService;
pub use user_service::UserService;
