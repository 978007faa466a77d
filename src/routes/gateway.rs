use axum::{
    Json, Router,
    extract::State,
    response::Html,
    routing::{get, post},
};

use crate::{
    dto::gateway::PayReadyRequest,
    error::AppResult,
    gateway::ReadySession,
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Gateway proxy, mounted at /api/kakaopay.
pub fn router() -> Router<AppState> {
    Router::new().route("/ready", post(pay_ready))
}

/// Redirect landing pages the gateway sends the customer back to, mounted
/// at /order. These render a signal for the opener window and never touch
/// order or payment state; the client drives the explicit complete/fail
/// APIs after reading the signal.
pub fn callback_router() -> Router<AppState> {
    Router::new()
        .route("/payment-success", get(payment_success_page))
        .route("/payment-cancel", get(payment_cancel_page))
        .route("/payment-fail", get(payment_fail_page))
}

#[utoipa::path(
    post,
    path = "/api/kakaopay/ready",
    request_body = PayReadyRequest,
    responses(
        (status = 200, description = "Payment session opened", body = ApiResponse<ReadySession>),
        (status = 502, description = "Gateway unreachable, timed out or rejected the request"),
    ),
    security(("bearer_auth" = [])),
    tag = "Gateway"
)]
pub async fn pay_ready(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<PayReadyRequest>,
) -> AppResult<Json<ApiResponse<ReadySession>>> {
    let session = state.gateway.ready(&payload).await?;
    Ok(Json(ApiResponse::success(
        "Payment session opened",
        session,
        Some(Meta::empty()),
    )))
}

pub async fn payment_success_page() -> Html<String> {
    Html(signal_page("Payment approved.", "PAY_SUCCESS"))
}

pub async fn payment_cancel_page() -> Html<String> {
    Html(signal_page("Payment cancelled.", "PAY_CANCEL"))
}

pub async fn payment_fail_page() -> Html<String> {
    Html(signal_page("Payment failed.", "PAY_FAIL"))
}

fn signal_page(message: &str, signal: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{message}</title></head>
<body>
<p>{message}</p>
<script>
  if (window.opener) {{
    window.opener.postMessage({{ type: "{signal}" }}, "*");
    window.close();
  }}
</script>
</body>
</html>
"#
    )
}
