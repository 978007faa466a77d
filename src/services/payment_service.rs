use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};

use crate::{
    audit::log_audit,
    dto::payments::{PaymentAttemptRequest, PaymentOrderRequest, PaymentRecorded},
    entity::{
        order_lines::{Column as OrderLineCol, Entity as OrderLines},
        orders::{ActiveModel as OrderActive, Entity as Orders},
        payments::{
            ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments,
            Model as PaymentModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{OrderStatus, Payment, PaymentStatus},
    response::{ApiResponse, Meta},
    services::cart_service,
    state::AppState,
};

/// Move every ATTEMPT-state payment for the order to FAILED. Keeps the
/// "at most one live attempt" invariant; COMPLETED and FAILED rows are left
/// alone.
pub async fn fail_live_attempts<C: ConnectionTrait>(
    conn: &C,
    order_id: &str,
    account_id: &str,
) -> AppResult<usize> {
    let attempts = Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .filter(PaymentCol::AccountId.eq(account_id))
        .filter(PaymentCol::Status.eq(PaymentStatus::Attempt))
        .all(conn)
        .await?;

    let count = attempts.len();
    for payment in attempts {
        let mut active: PaymentActive = payment.into();
        active.status = Set(PaymentStatus::Failed);
        active.updated_at = Set(Utc::now().into());
        active.update(conn).await?;
    }
    Ok(count)
}

/// Record a new payment attempt. A retry (e.g. switching from gateway pay
/// to bank transfer) does not require the client to cancel the previous
/// attempt: any live one is failed here first.
pub async fn record_attempt(
    state: &AppState,
    user: &AuthUser,
    payload: PaymentAttemptRequest,
) -> AppResult<ApiResponse<PaymentRecorded>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id((payload.order_id.clone(), user.account_id.clone()))
        .one(&txn)
        .await?;
    if order.is_none() {
        return Err(AppError::NotFound);
    }

    let existing = Payments::find_by_id((
        payload.payment_id.clone(),
        payload.order_id.clone(),
        user.account_id.clone(),
    ))
    .one(&txn)
    .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest(format!(
            "payment {} already exists",
            payload.payment_id
        )));
    }

    fail_live_attempts(&txn, &payload.order_id, &user.account_id).await?;

    let payment = PaymentActive {
        payment_id: Set(payload.payment_id.clone()),
        order_id: Set(payload.order_id.clone()),
        account_id: Set(user.account_id.clone()),
        method: Set(payload.method.clone()),
        status: Set(PaymentStatus::Attempt),
        attempted_at: Set(payload.attempted_at.into()),
        updated_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(&user.account_id),
        "payment_attempt",
        Some("payments"),
        Some(serde_json::json!({
            "order_id": &payload.order_id,
            "payment_id": &payload.payment_id,
            "method": &payload.method,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment attempt recorded",
        PaymentRecorded {
            payment_id: payment.payment_id,
            status: payment.status,
        },
        Some(Meta::empty()),
    ))
}

/// Settle the order after the gateway confirmed payment: live attempts move
/// to COMPLETED and the order to COMPLETED in one transaction. Re-invoking
/// on an already-completed order is an explicit no-op, not an error.
pub async fn complete_payment(
    state: &AppState,
    user: &AuthUser,
    payload: PaymentOrderRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id((payload.order_id.clone(), user.account_id.clone()))
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let attempts = Payments::find()
        .filter(PaymentCol::OrderId.eq(&payload.order_id))
        .filter(PaymentCol::AccountId.eq(&user.account_id))
        .filter(PaymentCol::Status.eq(PaymentStatus::Attempt))
        .all(&txn)
        .await?;

    match order.status {
        OrderStatus::Completed if attempts.is_empty() => {
            // Already settled, nothing to do.
            txn.commit().await?;
            return Ok(ApiResponse::success(
                "Order already completed",
                serde_json::json!({ "order_id": payload.order_id }),
                Some(Meta::empty()),
            ));
        }
        OrderStatus::Requested if attempts.is_empty() => {
            // Completing without a live attempt (e.g. right after a
            // failure) is a caller bug, not something to paper over.
            return Err(AppError::BadRequest(
                "no live payment attempt to complete".to_string(),
            ));
        }
        OrderStatus::Requested | OrderStatus::Completed => {}
        status => {
            return Err(AppError::BadRequest(format!(
                "cannot complete payment while the order is {status}"
            )));
        }
    }

    for payment in attempts {
        let mut active: PaymentActive = payment.into();
        active.status = Set(PaymentStatus::Completed);
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;
    }

    if order.status != OrderStatus::Completed {
        let mut active: OrderActive = order.into();
        active.status = Set(OrderStatus::Completed);
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;
    }

    let ordered_isbns: Vec<String> = OrderLines::find()
        .filter(OrderLineCol::OrderId.eq(&payload.order_id))
        .filter(OrderLineCol::AccountId.eq(&user.account_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|line| line.isbn)
        .collect();

    txn.commit().await?;

    // Money has already moved, so a cart line that refuses to go away must
    // not roll the completion back.
    for isbn in &ordered_isbns {
        if let Err(err) = cart_service::clear_ordered_line(&state.pool, &user.account_id, isbn).await
        {
            tracing::warn!(error = %err, isbn = %isbn, "cart cleanup failed");
        }
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(&user.account_id),
        "payment_completed",
        Some("payments"),
        Some(serde_json::json!({ "order_id": &payload.order_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment completed",
        serde_json::json!({ "order_id": payload.order_id }),
        Some(Meta::empty()),
    ))
}

/// Gateway failure or checkout abandonment: live attempts become FAILED but
/// the order stays put so the customer can retry with another method.
pub async fn fail_payment(
    state: &AppState,
    user: &AuthUser,
    payload: PaymentOrderRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id((payload.order_id.clone(), user.account_id.clone()))
        .one(&txn)
        .await?;
    if order.is_none() {
        return Err(AppError::NotFound);
    }

    let failed = fail_live_attempts(&txn, &payload.order_id, &user.account_id).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(&user.account_id),
        "payment_failed",
        Some("payments"),
        Some(serde_json::json!({ "order_id": &payload.order_id, "failed_attempts": failed })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment attempts cleared",
        serde_json::json!({ "order_id": payload.order_id, "failed_attempts": failed }),
        Some(Meta::empty()),
    ))
}

pub fn payment_from_entity(model: PaymentModel) -> Payment {
    Payment {
        payment_id: model.payment_id,
        order_id: model.order_id,
        account_id: model.account_id,
        method: model.method,
        status: model.status,
        attempted_at: model.attempted_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
