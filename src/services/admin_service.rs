use chrono::Utc;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::{
    dto::orders::{OrderList, OrderSummary},
    entity::{
        order_lines::{Column as OrderLineCol, Entity as OrderLines, Model as OrderLineModel},
        orders::{Column as OrderCol, Entity as Orders, Model as OrderModel},
        payments::{Column as PaymentCol, Entity as Payments},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderLine, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::{AdminOrderQuery, AdminOrderSort},
    services::{order_service, payment_service},
    state::AppState,
};

/// Admin console order search: free combination of order id, account,
/// status and paid-amount bounds.
pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: AdminOrderQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(order_id) = query.order_id.as_deref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::OrderId.eq(order_id));
    }
    if let Some(account_id) = query.account_id.as_deref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::AccountId.eq(account_id));
    }
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status.parse()?;
        condition = condition.add(OrderCol::Status.eq(status));
    }
    if let Some(min) = query.min_total {
        condition = condition.add(OrderCol::TotalPaid.gte(min));
    }
    if let Some(max) = query.max_total {
        condition = condition.add(OrderCol::TotalPaid.lte(max));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort.unwrap_or(AdminOrderSort::Latest) {
        AdminOrderSort::Latest => finder.order_by_desc(OrderCol::OrderDate),
        AdminOrderSort::Oldest => finder.order_by_asc(OrderCol::OrderDate),
        AdminOrderSort::HighPrice => finder.order_by_desc(OrderCol::TotalPaid),
        AdminOrderSort::LowPrice => finder.order_by_asc(OrderCol::TotalPaid),
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
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    order_id: &str,
    account_id: &str,
) -> AppResult<ApiResponse<OrderSummary>> {
    ensure_admin(user)?;

    let order = Orders::find_by_id((order_id.to_owned(), account_id.to_owned()))
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
    let fee = order_service::shipping_fee(subtotal);

    Ok(ApiResponse::success(
        "Order found",
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
