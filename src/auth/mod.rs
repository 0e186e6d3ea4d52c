use crate::state::AppState;
use axum::Router;

mod claims;
mod cookie;
mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod password;
pub mod store;
pub mod tokens;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
