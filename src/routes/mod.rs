use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod cart;
pub mod doc;
pub mod gateway;
pub mod health;
pub mod orders;
pub mod params;
pub mod payments;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/order", orders::router())
        .nest("/orders", orders::history_router())
        .nest("/payment", payments::router())
        .nest("/kakaopay", gateway::router())
        .nest("/cart", cart::router())
        .nest("/admin", admin::router())
}
