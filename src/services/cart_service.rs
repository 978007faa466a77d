use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartLine, CartList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

#[derive(FromRow)]
struct CartWithBookRow {
    isbn: String,
    title: String,
    price: i64,
    quantity: i32,
    created_at: DateTime<Utc>,
}

pub async fn list_cart(
    pool: &DbPool,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    let (page, limit, offset) = pagination.normalize();
    let rows = sqlx::query_as::<_, CartWithBookRow>(
        r#"
        SELECT ci.isbn, b.title, b.price, ci.quantity, ci.created_at
        FROM cart_items ci
        JOIN books b ON b.isbn = ci.isbn
        WHERE ci.account_id = $1
        ORDER BY ci.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&user.account_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE account_id = $1")
        .bind(&user.account_id)
        .fetch_one(pool)
        .await?;

    let items = rows
        .into_iter()
        .map(|row| CartLine {
            isbn: row.isbn,
            title: row.title,
            unit_price: row.price,
            quantity: row.quantity,
            created_at: row.created_at,
        })
        .collect();

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartLine>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let book: Option<(String, i64)> = sqlx::query_as("SELECT title, price FROM books WHERE isbn = $1")
        .bind(&payload.isbn)
        .fetch_optional(pool)
        .await?;
    let (title, price) = match book {
        Some(b) => b,
        None => return Err(AppError::BadRequest("book not found".to_string())),
    };

    let row: (i32, DateTime<Utc>) = sqlx::query_as(
        r#"
        INSERT INTO cart_items (account_id, isbn, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (account_id, isbn) DO UPDATE SET quantity = EXCLUDED.quantity
        RETURNING quantity, created_at
        "#,
    )
    .bind(&user.account_id)
    .bind(&payload.isbn)
    .bind(payload.quantity)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(&user.account_id),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({ "isbn": &payload.isbn, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "OK",
        CartLine {
            isbn: payload.isbn,
            title,
            unit_price: price,
            quantity: row.0,
            created_at: row.1,
        },
        None,
    ))
}

pub async fn remove_from_cart(
    pool: &DbPool,
    user: &AuthUser,
    isbn: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE isbn = $1 AND account_id = $2")
        .bind(isbn)
        .bind(&user.account_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(&user.account_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "isbn": isbn })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Drain one ordered line from the cart after payment completion. Missing
/// rows are fine; the customer may never have carted the item.
pub async fn clear_ordered_line(pool: &DbPool, account_id: &str, isbn: &str) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE isbn = $1 AND account_id = $2")
        .bind(isbn)
        .bind(account_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
