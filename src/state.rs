use crate::db::{DbPool, OrmConn};
use crate::gateway::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub gateway: PaymentGateway,
}
