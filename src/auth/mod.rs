use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod services;

pub use jwt::CurrentUser;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
