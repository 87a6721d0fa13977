pub mod contributions;
pub mod draw;
pub mod health;

use crate::config::Config;
use crate::db::Repository;
use crate::settlement::Aggregator;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub aggregator: Arc<Aggregator>,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, aggregator: Arc<Aggregator>, config: Config) -> Self {
        Self {
            repo,
            aggregator,
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/v1/draw/current", get(draw::get_current_draw))
        .route(
            "/v1/draw/contributions",
            get(contributions::get_contributions),
        )
        .route("/v1/deposit-address", get(draw::get_deposit_address))
        .layer(cors)
        .with_state(state)
}
