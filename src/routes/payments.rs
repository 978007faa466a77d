use axum::{
    Json, Router,
    extract::State,
    routing::post,
};

use crate::{
    dto::payments::{PaymentAttemptRequest, PaymentOrderRequest, PaymentRecorded},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

/// Payment reconciliation endpoints, mounted at /api/payment.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/attempt", post(payment_attempt))
        .route("/complete", post(payment_complete))
        .route("/fail", post(payment_fail))
}

#[utoipa::path(
    post,
    path = "/api/payment/attempt",
    request_body = PaymentAttemptRequest,
    responses(
        (status = 200, description = "Attempt recorded", body = ApiResponse<PaymentRecorded>),
        (status = 400, description = "Duplicate payment id"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn payment_attempt(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PaymentAttemptRequest>,
) -> AppResult<Json<ApiResponse<PaymentRecorded>>> {
    payment_service::record_attempt(&state, &user, payload)
        .await
        .map(Json)
}

#[utoipa::path(post, path = "/api/payment/complete", tag = "Payments")]
pub async fn payment_complete(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PaymentOrderRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    payment_service::complete_payment(&state, &user, payload)
        .await
        .map(Json)
}

#[utoipa::path(post, path = "/api/payment/fail", tag = "Payments")]
pub async fn payment_fail(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PaymentOrderRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    payment_service::fail_payment(&state, &user, payload)
        .await
        .map(Json)
}
