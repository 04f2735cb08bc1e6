//! Route definitions for the REST API.

mod facturas;
mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Factura operations
        .route("/facturas", post(facturas::create_factura))
        .route("/facturas", get(facturas::list_facturas))
        .route("/facturas/:id", get(facturas::get_factura))
        .route("/facturas/:id", put(facturas::update_factura))
        .route("/facturas/:id/historial", get(facturas::get_factura_historial))
        // Attach state
        .with_state(state)
}

pub use facturas::*;
pub use health::*;
