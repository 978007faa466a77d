use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::StockEntry;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StockInboundRequest {
    pub isbn: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockHistory {
    pub isbn: String,
    pub current_stock: i32,
    pub entries: Vec<StockEntry>,
}
