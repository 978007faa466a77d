use serde::Deserialize;
use utoipa::ToSchema;

/// Client-side request to open a payment session with the gateway.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PayReadyRequest {
    pub order_id: String,
    pub orderer_name: String,
    /// Display name shown on the gateway's payment page, e.g. the first
    /// book title plus an item count.
    pub item_name: String,
    pub quantity: i32,
    pub total_amount: i64,
}
