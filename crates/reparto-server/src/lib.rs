//! reparto-server - REST API server for reparto.
//!
//! This crate exposes the record store through a thin HTTP facade: it
//! translates requests into [`reparto_core::RecordStore`] calls and maps
//! domain errors onto status codes, nothing more.
//!
//! # Example
//!
//! ```ignore
//! use reparto_server::{create_server, AppState};
//! use reparto_store::create_store;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = create_store(&Default::default()).unwrap();
//!     let app = create_server(AppState::new(store));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{middleware as axum_middleware, Router};
use tower_http::trace::TraceLayer;

/// Create the server with all routes and middleware.
pub fn create_server(state: AppState) -> Router {
    routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}
