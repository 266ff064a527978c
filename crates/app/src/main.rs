/// Event organizer marketplace backend.
///
/// Organizers publish services and get paid through a payment gateway;
/// customers book those services for an event and leave feedback once an
/// order is completed.
///
/// # Architecture
///
/// - Repository layer for data access (PostgreSQL)
/// - Service layer for business logic
/// - Gateway clients for payments and sentiment analysis
/// - HTTP API with Prometheus metrics
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use app_config::AppConfig;
use gateway::{GoogleSentimentClient, MidtransClient};
use repository::{
    PgBankAccountsRepository, PgFeedbacksRepository, PgOrdersRepository, PgPaymentsRepository,
    PgServicesRepository, PgUsersRepository,
};
use server::{Server, Services};
use service::{
    AccountServiceImpl, BankAccountServiceImpl, CatalogServiceImpl, FeedbackServiceImpl,
    OrderServiceImpl, PasswordManager, TokenManager,
};

/// Initialize the tracing subscriber, honouring `RUST_LOG`.
fn init_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();
    info!("Event organizer platform starting...");

    let config = AppConfig::load().context("Failed to load configuration")?;

    let pool = db::init_db_pool(&config)
        .await
        .context("Failed to initialize database")?;
    info!("Database initialized successfully");

    let http = gateway::http_client(config.outbound_timeout)
        .context("Failed to build outbound HTTP client")?;
    let payments_gateway = MidtransClient::new(
        http.clone(),
        &config.midtrans_base_url,
        &config.midtrans_server_key,
    );
    let sentiment = GoogleSentimentClient::new(
        http,
        &config.sentiment_base_url,
        &config.sentiment_api_key,
    );

    let tokens = TokenManager::new(
        &config.auth_secret,
        chrono::Duration::hours(config.auth_exp_hours),
    );
    let passwords = PasswordManager::new(config.auth_cost);

    let services = Services {
        accounts: Arc::new(AccountServiceImpl::new(
            PgUsersRepository::new(pool.clone()),
            tokens.clone(),
            passwords,
        )),
        catalog: Arc::new(CatalogServiceImpl::new(PgServicesRepository::new(pool.clone()))),
        orders: Arc::new(OrderServiceImpl::new(
            PgOrdersRepository::new(pool.clone()),
            PgServicesRepository::new(pool.clone()),
            PgPaymentsRepository::new(pool.clone()),
            PgBankAccountsRepository::new(pool.clone()),
            payments_gateway,
            &config.order_reference_prefix,
        )),
        bank_accounts: Arc::new(BankAccountServiceImpl::new(PgBankAccountsRepository::new(
            pool.clone(),
        ))),
        feedbacks: Arc::new(FeedbackServiceImpl::new(
            PgFeedbacksRepository::new(pool),
            sentiment,
        )),
    };

    let server = Server::new(
        config.http_port,
        services,
        tokens,
        &config.payment_webhook_path,
        config.shutdown_timeout,
    )?;
    server.start().await?;

    info!("Application stopped");
    Ok(())
}
