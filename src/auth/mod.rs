use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub(crate) mod jwt;
pub mod password;
pub mod services;
pub mod session;
pub mod token;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
