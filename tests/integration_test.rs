use axum::http::StatusCode;
use drawpool::api::{self, AppState};
use drawpool::config::Config;
use drawpool::settlement::{Aggregator, LifecycleManager};
use drawpool::{
    init_db, ContributionTransfer, Decimal, Identity, LedgerClient, MockLedger, Repository, TimeMs,
    TxHash,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

// 2024-01-15T00:00:00Z
const DAY_START: i64 = 1_705_276_800_000;
const DAY_MS: i64 = 86_400_000;

fn test_config(db_path: String) -> Config {
    Config {
        port: 0,
        database_path: db_path,
        ledger_api_url: "http://example.invalid".to_string(),
        collection_address: "EQpool".to_string(),
        min_contribution: 1_000_000_000,
        blocked_addresses: vec![],
        top_prize_share: Decimal::from_str_canonical("0.475").unwrap(),
        individual_prize_share: Decimal::from_str_canonical("0.475").unwrap(),
        payout_fee: Decimal::from_str_canonical("0.05").unwrap(),
        payout_spacing_ms: 0,
        max_payout_retries: 3,
        settlement_interval_secs: 86_400,
        retry_interval_secs: 900,
        upcoming_draw_days: 7,
    }
}

async fn setup_test_app(ledger: MockLedger) -> (axum::Router, Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();

    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let ledger: Arc<dyn LedgerClient> = Arc::new(ledger);

    let config = test_config(db_path);
    let aggregator = Arc::new(Aggregator::new(ledger, repo.clone(), config.clone()));
    let state = AppState::new(repo.clone(), aggregator, config);

    (api::create_router(state), repo, temp_dir)
}

/// Seed daily windows and promote the first draw to running.
async fn start_first_draw(repo: &Arc<Repository>) {
    let lifecycle = LifecycleManager::new(repo.clone());
    let noon = TimeMs::new(DAY_START + DAY_MS / 2);
    lifecycle.ensure_upcoming_draws(noon, 2).await.unwrap();
    lifecycle.start_next_draw(noon).await.unwrap();
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);

    (status, value)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _repo, _temp) = setup_test_app(MockLedger::new()).await;

    let (status, body) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_current_draw_returns_running_window() {
    let (app, repo, _temp) = setup_test_app(MockLedger::new()).await;
    start_first_draw(&repo).await;

    let (status, body) = get_json(app, "/v1/draw/current").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sequenceNumber"], 1);
    assert_eq!(body["windowStartMs"], DAY_START);
    assert_eq!(body["windowEndMs"], DAY_START + DAY_MS);
}

#[tokio::test]
async fn test_current_draw_without_running_draw_is_server_error() {
    let (app, _repo, _temp) = setup_test_app(MockLedger::new()).await;

    let (status, body) = get_json(app, "/v1/draw/current").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("no active draw"));
}

#[tokio::test]
async fn test_deposit_address_endpoint() {
    let (app, _repo, _temp) = setup_test_app(MockLedger::new()).await;

    let (status, body) = get_json(app, "/v1/deposit-address").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["address"], "EQpool");
}

#[tokio::test]
async fn test_contributions_filters_to_running_window() {
    let in_window = ContributionTransfer::new(
        Identity::new("EQalice".to_string()),
        2_000_000_000,
        TimeMs::new(DAY_START + 1000),
        TxHash::new("hash-in".to_string()),
    );
    let below_minimum = ContributionTransfer::new(
        Identity::new("EQbob".to_string()),
        500_000_000,
        TimeMs::new(DAY_START + 2000),
        TxHash::new("hash-dust".to_string()),
    );
    let outside_window = ContributionTransfer::new(
        Identity::new("EQcarol".to_string()),
        2_000_000_000,
        TimeMs::new(DAY_START - 1000),
        TxHash::new("hash-early".to_string()),
    );

    let ledger =
        MockLedger::new().with_transfers(vec![in_window, below_minimum, outside_window]);
    let (app, repo, _temp) = setup_test_app(ledger).await;
    start_first_draw(&repo).await;

    let (status, body) = get_json(app, "/v1/draw/contributions").await;
    assert_eq!(status, StatusCode::OK);

    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["sender"], "EQalice");
    assert_eq!(entries[0]["amount"], 2_000_000_000_i64);
    assert_eq!(entries[0]["timeMs"], DAY_START + 1000);
    assert_eq!(entries[0]["txHash"], "hash-in");
}

#[tokio::test]
async fn test_contributions_empty_without_running_draw() {
    let (app, _repo, _temp) = setup_test_app(MockLedger::new()).await;

    let (status, body) = get_json(app, "/v1/draw/contributions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}
