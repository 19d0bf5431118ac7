//! Mint Service
//!
//! Mints value to a recipient once a zero-knowledge proof of a burn has been
//! verified, guarding each burn's nullifier against replay. Exposes the
//! mint over a small HTTP API.

pub mod artifact;
pub mod config;
pub mod handlers;
pub mod identity;
pub mod issuer;
pub mod ledger;
pub mod nullifier;
pub mod replay;
pub mod service;
pub mod store;
pub mod transaction;
pub mod verifier;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::Config;
pub use handlers::AppState;
pub use service::MintService;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/mint", post(handlers::mint_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
