use sea_orm::entity::prelude::*;

use crate::models::StockDirection;

// Append-only ledger: rows are inserted, never updated or deleted. The
// current stock level for an isbn is the quantity_after of its newest row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stock_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub isbn: String,
    pub direction: StockDirection,
    pub quantity: i32,
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub recorded_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::books::Entity",
        from = "Column::Isbn",
        to = "super::books::Column::Isbn"
    )]
    Books,
}

impl Related<super::books::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Books.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
