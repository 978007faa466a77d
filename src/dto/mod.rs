pub mod cart;
pub mod gateway;
pub mod orders;
pub mod payments;
pub mod stock;
