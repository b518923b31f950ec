//! Roles, permissions and who holds what.
pub mod dto;
pub mod grants;
pub mod handlers;
pub mod seed;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::role_routes())
        .merge(handlers::permission_routes())
        .merge(handlers::grant_routes())
}
