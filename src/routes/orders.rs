use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    dto::orders::{
        CancelOrderRequest, CreateOrderRequest, OrderCreated, OrderList, OrderSummary,
        UpdateOrderStatusRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

/// Order lifecycle endpoints, mounted at /api/order.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_order))
        .route("/update-status", post(update_order_status))
        .route("/cancel", post(cancel_order))
}

/// Customer order history, mounted at /api/orders.
pub fn history_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/cancel", post(cancel_completed_order))
        .route("/{order_id}", get(get_order))
}

#[utoipa::path(
    post,
    path = "/api/order/create",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = ApiResponse<OrderCreated>),
        (status = 400, description = "Duplicate order id, unknown isbn or price mismatch"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderCreated>>> {
    order_service::create_order(&state, &user, payload)
        .await
        .map(Json)
}

#[utoipa::path(
    post,
    path = "/api/order/update-status",
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Order>),
        (status = 400, description = "Illegal transition or insufficient stock"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    order_service::transition_status(&state, &user, payload)
        .await
        .map(Json)
}

#[utoipa::path(post, path = "/api/order/cancel", tag = "Orders")]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CancelOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    order_service::cancel_order(&state, &user, payload)
        .await
        .map(Json)
}

#[utoipa::path(post, path = "/api/orders/cancel", tag = "Orders")]
pub async fn cancel_completed_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CancelOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    order_service::cancel_completed_order(&state, &user, payload)
        .await
        .map(Json)
}

#[utoipa::path(get, path = "/api/orders", tag = "Orders")]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    order_service::list_orders(&state, &user, query)
        .await
        .map(Json)
}

#[utoipa::path(get, path = "/api/orders/{order_id}", tag = "Orders")]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderSummary>>> {
    order_service::get_order(&state, &user, &order_id)
        .await
        .map(Json)
}
