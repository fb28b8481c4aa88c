use std::sync::Arc;

use tracing::{info, warn, Level};

use finance_tracker_backend::config::AppConfig;
use finance_tracker_backend::domain::{
    BudgetService, CurrencyService, ExchangeRateApiClient, GoalService, Notifier, ReportService,
    SmtpNotifier, TransactionService, TrendService,
};
use finance_tracker_backend::jobs::JobScheduler;
use finance_tracker_backend::storage::csv::CsvConnection;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let config = AppConfig::from_env();
    info!("Setting up data directory at {}", config.data_dir.display());
    let connection = Arc::new(CsvConnection::new(&config.data_dir)?);

    let mut smtp = SmtpNotifier::new(config.email.clone());
    if config.email.is_configured() {
        if let Err(e) = smtp.initialize() {
            warn!("Email transport unavailable, notifications will be skipped: {:#}", e);
        }
    } else {
        info!("Email not configured, notifications will be skipped");
    }
    let notifier: Arc<dyn Notifier> = Arc::new(smtp);

    let currency_service = CurrencyService::new(Arc::new(ExchangeRateApiClient::new(
        config.exchange_rate_url.clone(),
    )));

    let budget_service = BudgetService::new(connection.clone(), notifier.clone());
    let goal_service = GoalService::new(connection.clone(), notifier.clone());
    let transaction_service = TransactionService::new(
        connection.clone(),
        budget_service.clone(),
        goal_service.clone(),
        currency_service,
        notifier.clone(),
    );
    let trend_service = TrendService::new(connection.clone(), notifier.clone());
    let report_service = ReportService::new(connection.clone(), notifier.clone());

    let scheduler = JobScheduler {
        transaction_service,
        trend_service,
        goal_service,
        report_service,
    };
    let handles = scheduler.spawn();
    info!("Started {} scheduled jobs", handles.len());

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}
