use drawpool::settlement::{Aggregator, DistributionEngine, LifecycleManager, SettlementRunner};
use drawpool::{
    api, config::Config, db::init_db, scheduler, HttpLedgerClient, LedgerClient, Repository, TimeMs,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let ledger: Arc<dyn LedgerClient> =
        Arc::new(HttpLedgerClient::new(config.ledger_api_url.clone()));

    let lifecycle = LifecycleManager::new(repo.clone());

    // Seed upcoming daily draws before the scheduler starts, so the first
    // settlement tick always has a candidate to promote.
    match lifecycle
        .ensure_upcoming_draws(TimeMs::now(), config.upcoming_draw_days)
        .await
    {
        Ok(created) if created > 0 => tracing::info!("Seeded {} upcoming draws", created),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Failed to seed upcoming draws: {}", e);
            std::process::exit(1);
        }
    }

    let aggregator = Aggregator::new(ledger.clone(), repo.clone(), config.clone());
    let engine = DistributionEngine::new(ledger.clone(), repo.clone(), config.clone());
    let runner = Arc::new(SettlementRunner::new(
        lifecycle,
        aggregator,
        engine,
        config.clone(),
    ));

    let (_settlement_handle, _retry_handle) = scheduler::spawn(
        runner,
        Duration::from_secs(config.settlement_interval_secs),
        Duration::from_secs(config.retry_interval_secs),
    );

    // Create router
    let api_aggregator = Arc::new(Aggregator::new(
        ledger.clone(),
        repo.clone(),
        config.clone(),
    ));
    let app = api::create_router(api::AppState::new(repo, api_aggregator, config));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
