use std::collections::HashSet;

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::{
    audit::log_audit,
    dto::orders::{
        CancelOrderRequest, CreateOrderRequest, OrderCreated, OrderList, OrderSummary,
        UpdateOrderStatusRequest,
    },
    entity::{
        books::Entity as Books,
        order_lines::{
            ActiveModel as OrderLineActive, Column as OrderLineCol, Entity as OrderLines,
            Model as OrderLineModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        payments::{Column as PaymentCol, Entity as Payments},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderLine, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{payment_service, stock_service},
    state::AppState,
};

pub const FREE_SHIPPING_THRESHOLD: i64 = 20_000;
pub const FLAT_SHIPPING_FEE: i64 = 3_000;

/// Orders at or above the threshold ship free; everything else pays the
/// flat fee.
pub fn shipping_fee(subtotal: i64) -> i64 {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        FLAT_SHIPPING_FEE
    }
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderCreated>> {
    if payload.lines.is_empty() {
        return Err(AppError::BadRequest("order has no lines".to_string()));
    }

    let txn = state.orm.begin().await?;

    let existing = Orders::find_by_id((payload.order_id.clone(), user.account_id.clone()))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest(format!(
            "order {} already exists",
            payload.order_id
        )));
    }

    // Re-price every line from the catalog. The client-submitted prices are
    // only accepted when they agree with the server-computed values.
    let mut seen: HashSet<&str> = HashSet::new();
    let mut total_quantity: i32 = 0;
    let mut subtotal: i64 = 0;
    let mut priced: Vec<(String, i32, i64, i64)> = Vec::with_capacity(payload.lines.len());
    for line in &payload.lines {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest(format!(
                "invalid quantity for {}",
                line.isbn
            )));
        }
        if !seen.insert(line.isbn.as_str()) {
            return Err(AppError::BadRequest(format!(
                "duplicate line for {}",
                line.isbn
            )));
        }

        let book = Books::find_by_id(line.isbn.clone()).one(&txn).await?;
        let book = match book {
            Some(b) => b,
            None => {
                return Err(AppError::BadRequest(format!("unknown isbn {}", line.isbn)));
            }
        };

        let unit_price = book.price;
        let line_total = unit_price * i64::from(line.quantity);
        if line.unit_price != unit_price || line.line_total != line_total {
            return Err(AppError::BadRequest(format!(
                "price for {} has changed, refresh and retry",
                line.isbn
            )));
        }

        total_quantity += line.quantity;
        subtotal += line_total;
        priced.push((line.isbn.clone(), line.quantity, unit_price, line_total));
    }

    let fee = shipping_fee(subtotal);
    let total_paid = subtotal + fee;
    let order_date = payload.order_date.unwrap_or_else(Utc::now);

    let order = OrderActive {
        order_id: Set(payload.order_id.clone()),
        account_id: Set(user.account_id.clone()),
        total_line_count: Set(payload.lines.len() as i32),
        total_quantity: Set(total_quantity),
        total_paid: Set(total_paid),
        status: Set(OrderStatus::Requested),
        order_date: Set(order_date.into()),
        updated_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    for (isbn, quantity, unit_price, line_total) in priced {
        OrderLineActive {
            order_id: Set(order.order_id.clone()),
            account_id: Set(order.account_id.clone()),
            isbn: Set(isbn),
            quantity: Set(quantity),
            unit_price: Set(unit_price),
            line_total: Set(line_total),
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(&user.account_id),
        "order_created",
        Some("orders"),
        Some(serde_json::json!({ "order_id": &order.order_id, "total_paid": total_paid })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order created",
        OrderCreated {
            order_id: order.order_id,
            account_id: order.account_id,
            subtotal,
            shipping_fee: fee,
            total_paid,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::AccountId.eq(&user.account_id));
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status.parse()?;
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::OrderDate),
        SortOrder::Desc => finder.order_by_desc(OrderCol::OrderDate),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    order_id: &str,
) -> AppResult<ApiResponse<OrderSummary>> {
    let order = Orders::find_by_id((order_id.to_owned(), user.account_id.clone()))
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let lines: Vec<OrderLineModel> = OrderLines::find()
        .filter(OrderLineCol::OrderId.eq(&order.order_id))
        .filter(OrderLineCol::AccountId.eq(&order.account_id))
        .all(&state.orm)
        .await?;

    let latest_payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(&order.order_id))
        .filter(PaymentCol::AccountId.eq(&order.account_id))
        .order_by_desc(PaymentCol::AttemptedAt)
        .one(&state.orm)
        .await?
        .map(payment_service::payment_from_entity);

    let subtotal: i64 = lines.iter().map(|l| l.line_total).sum();
    let fee = shipping_fee(subtotal);

    Ok(ApiResponse::success(
        "OK",
        OrderSummary {
            order: order_from_entity(order),
            lines: lines.into_iter().map(order_line_from_entity).collect(),
            payment: latest_payment,
            subtotal,
            shipping_fee: fee,
        },
        Some(Meta::empty()),
    ))
}

/// Admin-driven status change, validated against the transition table.
/// Entering FAILED also fails every live payment attempt; first entry into
/// PREPARING deducts stock for every line, all-or-nothing.
pub async fn transition_status(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let new_status: OrderStatus = payload.status.parse()?;

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id((payload.order_id.clone(), payload.account_id.clone()))
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let old_status = order.status;
    if !old_status.can_transition_to(new_status) {
        return Err(AppError::BadRequest(format!(
            "illegal status transition {old_status} -> {new_status}"
        )));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(new_status);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    if new_status == OrderStatus::Failed {
        payment_service::fail_live_attempts(&txn, &payload.order_id, &payload.account_id).await?;
    }

    // The transition table makes PREPARING unreachable from PREPARING, so
    // this deduction can only run once per order.
    if new_status == OrderStatus::Preparing {
        deduct_stock_for_order(&txn, &updated).await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(&user.account_id),
        "order_status",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": &payload.order_id,
            "from": old_status.as_str(),
            "to": new_status.as_str(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order status updated",
        order_from_entity(updated),
        Some(Meta::empty()),
    ))
}

/// Pre-payment abort, fired when the customer leaves the order page. Moves
/// the order to FAILED and clears any live payment attempt.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    payload: CancelOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id((payload.order_id.clone(), user.account_id.clone()))
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if !order.status.can_transition_to(OrderStatus::Failed) {
        return Err(AppError::BadRequest(format!(
            "order in status {} can no longer be aborted",
            order.status
        )));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Failed);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    payment_service::fail_live_attempts(&txn, &payload.order_id, &user.account_id).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(&user.account_id),
        "order_aborted",
        Some("orders"),
        Some(serde_json::json!({ "order_id": &payload.order_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order cancelled",
        order_from_entity(updated),
        Some(Meta::empty()),
    ))
}

/// Customer cancellation of a paid order. Only legal from COMPLETED; any
/// other state is a domain error rather than a silent no-op.
pub async fn cancel_completed_order(
    state: &AppState,
    user: &AuthUser,
    payload: CancelOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id((payload.order_id.clone(), user.account_id.clone()))
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if order.status != OrderStatus::Completed {
        return Err(AppError::BadRequest(format!(
            "cancellation is not available while the order is {}",
            order.status
        )));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(&user.account_id),
        "order_cancelled",
        Some("orders"),
        Some(serde_json::json!({ "order_id": &payload.order_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order cancellation completed",
        order_from_entity(updated),
        Some(Meta::empty()),
    ))
}

/// Write one OUTBOUND ledger entry per order line. Each line locks its book
/// row first so concurrent transitions for the same isbn serialize; any
/// shortfall aborts the surrounding transaction.
async fn deduct_stock_for_order(txn: &DatabaseTransaction, order: &OrderModel) -> AppResult<()> {
    let lines = OrderLines::find()
        .filter(OrderLineCol::OrderId.eq(&order.order_id))
        .filter(OrderLineCol::AccountId.eq(&order.account_id))
        .all(txn)
        .await?;

    for line in lines {
        let book = Books::find_by_id(line.isbn.clone())
            .lock(LockType::Update)
            .one(txn)
            .await?;
        if book.is_none() {
            return Err(AppError::BadRequest(format!("unknown isbn {}", line.isbn)));
        }

        let before = stock_service::current_stock(txn, &line.isbn).await?;
        if before < line.quantity {
            return Err(AppError::BadRequest(format!(
                "insufficient stock for {} (current {}, ordered {})",
                line.isbn, before, line.quantity
            )));
        }

        stock_service::record_outbound(txn, &line.isbn, line.quantity, before).await?;
    }

    Ok(())
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        order_id: model.order_id,
        account_id: model.account_id,
        total_line_count: model.total_line_count,
        total_quantity: model.total_quantity,
        total_paid: model.total_paid,
        status: model.status,
        order_date: model.order_date.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_line_from_entity(model: OrderLineModel) -> OrderLine {
    OrderLine {
        order_id: model.order_id,
        account_id: model.account_id,
        isbn: model.isbn,
        quantity: model.quantity,
        unit_price: model.unit_price,
        line_total: model.line_total,
    }
}
