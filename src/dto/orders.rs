use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Order, OrderLine, Payment};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub order_id: String,
    /// Client clock at checkout; server time is used when absent.
    pub order_date: Option<DateTime<Utc>>,
    pub lines: Vec<OrderLineRequest>,
}

/// One checkout line. The price fields are the values the customer saw;
/// the server recomputes both from the catalog and rejects any mismatch.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderLineRequest {
    pub isbn: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderCreated {
    pub order_id: String,
    pub account_id: String,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub total_paid: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub order_id: String,
    pub account_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub order_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

/// Order summary: header, price breakdown, lines, and the most recent
/// payment if one exists.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummary {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub payment: Option<Payment>,
    pub subtotal: i64,
    pub shipping_fee: i64,
}
