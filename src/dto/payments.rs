use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::PaymentStatus;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentAttemptRequest {
    pub order_id: String,
    pub payment_id: String,
    /// Payment method code, e.g. "KP" (gateway) or "AC" (bank transfer).
    pub method: String,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentRecorded {
    pub payment_id: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentOrderRequest {
    pub order_id: String,
}
