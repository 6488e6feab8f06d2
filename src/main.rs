use std::net::SocketAddr;
use std::sync::Arc;

use revolut_checkout::api::{self, AppState};
use revolut_checkout::config::Config;
use revolut_checkout::database::order_repository::PgOrderRepository;
use revolut_checkout::database::payment_repository::PgPaymentRepository;
use revolut_checkout::database::{init_pool, PoolConfig};
use revolut_checkout::payments::client::RevolutClient;
use revolut_checkout::payments::providers::RevolutProvider;
use revolut_checkout::payments::urls::UrlBuilder;
use revolut_checkout::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    telemetry::init_tracing()?;

    let config = Config::from_env()?;

    tracing::info!("Starting Revolut checkout provider");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("Revolut settings: {:?}", config.revolut);

    let pool = init_pool(
        &config.database.url,
        Some(PoolConfig {
            max_connections: config.database.max_connections,
            ..Default::default()
        }),
    )
    .await?;

    let urls = UrlBuilder::new(&config.urls.public_base_url, &config.urls.shop_base_url)?;
    let client = RevolutClient::new(config.revolut.clone())?;
    let provider = RevolutProvider::new(
        client,
        Arc::new(PgPaymentRepository::new(pool.clone())),
        Arc::new(PgOrderRepository::new(pool.clone())),
        urls,
    );

    let state = AppState::new(Arc::new(provider), config.server.environment.clone()).with_pool(pool);
    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
