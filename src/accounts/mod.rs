use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod errors;
pub mod handlers;
#[cfg(test)]
pub(crate) mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod store;

pub use errors::{AccountError, StoreError};
pub use services::UserAccounts;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}
