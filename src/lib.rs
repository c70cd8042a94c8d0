use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
pub type DbPool = Pool<SqliteConnectionManager>;

use crate::bot::Dispatcher;
use crate::helper::content_store::SqliteContentStore;

pub struct AppState {
    pub dispatcher: Dispatcher<SqliteContentStore>,
}

pub mod bot;
pub mod config;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;
