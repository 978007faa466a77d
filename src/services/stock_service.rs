use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::{
    audit::log_audit,
    dto::stock::{StockHistory, StockInboundRequest},
    entity::{
        books::Entity as Books,
        stock_entries::{
            ActiveModel as StockActive, Column as StockCol, Entity as StockEntries,
            Model as StockModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{StockDirection, StockEntry},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Current stock is derived from the ledger, not kept as a mutable counter:
/// it is the quantity_after of the newest entry for the isbn, 0 when the
/// item has no history.
pub async fn current_stock<C: ConnectionTrait>(conn: &C, isbn: &str) -> AppResult<i32> {
    let latest = StockEntries::find()
        .filter(StockCol::Isbn.eq(isbn))
        .order_by_desc(StockCol::RecordedAt)
        .order_by_desc(StockCol::Id)
        .one(conn)
        .await?;
    Ok(latest.map(|entry| entry.quantity_after).unwrap_or(0))
}

/// Append an OUTBOUND entry. The caller must hold the per-isbn row lock and
/// must already have verified sufficiency against `before`.
pub async fn record_outbound<C: ConnectionTrait>(
    conn: &C,
    isbn: &str,
    quantity: i32,
    before: i32,
) -> AppResult<StockModel> {
    let entry = StockActive {
        id: NotSet,
        isbn: Set(isbn.to_owned()),
        direction: Set(StockDirection::Outbound),
        quantity: Set(quantity),
        quantity_before: Set(before),
        quantity_after: Set(before - quantity),
        recorded_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;
    Ok(entry)
}

pub async fn record_inbound(
    state: &AppState,
    user: &AuthUser,
    payload: StockInboundRequest,
) -> AppResult<ApiResponse<StockEntry>> {
    ensure_admin(user)?;
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;

    // Serialize ledger appends per isbn behind the book row lock.
    let book = Books::find_by_id(payload.isbn.clone())
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    if book.is_none() {
        return Err(AppError::NotFound);
    }

    let before = current_stock(&txn, &payload.isbn).await?;
    let entry = StockActive {
        id: NotSet,
        isbn: Set(payload.isbn.clone()),
        direction: Set(StockDirection::Inbound),
        quantity: Set(payload.quantity),
        quantity_before: Set(before),
        quantity_after: Set(before + payload.quantity),
        recorded_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(&user.account_id),
        "stock_inbound",
        Some("stock_entries"),
        Some(serde_json::json!({ "isbn": payload.isbn, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Stock received",
        stock_entry_from_entity(entry),
        Some(Meta::empty()),
    ))
}

pub async fn stock_history(
    state: &AppState,
    user: &AuthUser,
    isbn: &str,
    pagination: Pagination,
) -> AppResult<ApiResponse<StockHistory>> {
    ensure_admin(user)?;
    let book = Books::find_by_id(isbn.to_owned()).one(&state.orm).await?;
    if book.is_none() {
        return Err(AppError::NotFound);
    }

    let (page, limit, offset) = pagination.normalize();
    let finder = StockEntries::find()
        .filter(StockCol::Isbn.eq(isbn))
        .order_by_desc(StockCol::RecordedAt)
        .order_by_desc(StockCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;
    let entries = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(stock_entry_from_entity)
        .collect();

    let current = current_stock(&state.orm, isbn).await?;
    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Stock history",
        StockHistory {
            isbn: isbn.to_owned(),
            current_stock: current,
            entries,
        },
        Some(meta),
    ))
}

pub fn stock_entry_from_entity(model: StockModel) -> StockEntry {
    StockEntry {
        id: model.id,
        isbn: model.isbn,
        direction: model.direction,
        quantity: model.quantity,
        quantity_before: model.quantity_before,
        quantity_after: model.quantity_after,
        recorded_at: model.recorded_at.with_timezone(&Utc),
    }
}
