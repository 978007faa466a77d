use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    dto::orders::{OrderList, OrderSummary},
    dto::stock::{StockHistory, StockInboundRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::StockEntry,
    response::ApiResponse,
    routes::params::{AdminOrderQuery, Pagination},
    services::{admin_service, stock_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/orders/{order_id}/{account_id}", get(get_order_admin))
        .route("/stock/inbound", post(stock_inbound))
        .route("/stock/{isbn}", get(stock_history))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StockHistoryQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("order_id" = Option<String>, Query, description = "Exact order id"),
        ("account_id" = Option<String>, Query, description = "Exact account id"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("min_total" = Option<i64>, Query, description = "Minimum paid amount"),
        ("max_total" = Option<i64>, Query, description = "Maximum paid amount"),
        ("sort" = Option<String>, Query, description = "latest, oldest, high_price, low_price")
    ),
    responses(
        (status = 200, description = "Orders", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminOrderQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    admin_service::list_all_orders(&state, &user, query)
        .await
        .map(Json)
}

#[utoipa::path(get, path = "/api/admin/orders/{order_id}/{account_id}", tag = "Admin")]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path((order_id, account_id)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<OrderSummary>>> {
    admin_service::get_order_admin(&state, &user, &order_id, &account_id)
        .await
        .map(Json)
}

#[utoipa::path(
    post,
    path = "/api/admin/stock/inbound",
    request_body = StockInboundRequest,
    responses(
        (status = 200, description = "Inbound entry appended", body = ApiResponse<StockEntry>),
        (status = 404, description = "Book not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn stock_inbound(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<StockInboundRequest>,
) -> AppResult<Json<ApiResponse<StockEntry>>> {
    stock_service::record_inbound(&state, &user, payload)
        .await
        .map(Json)
}

#[utoipa::path(get, path = "/api/admin/stock/{isbn}", tag = "Admin")]
pub async fn stock_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(isbn): Path<String>,
    Query(query): Query<StockHistoryQuery>,
) -> AppResult<Json<ApiResponse<StockHistory>>> {
    stock_service::stock_history(&state, &user, &isbn, query.pagination)
        .await
        .map(Json)
}
