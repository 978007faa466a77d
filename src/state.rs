use crate::db::{DbPool, OrmConn};
use crate::gateway::GatewayClient;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub gateway: GatewayClient,
}
