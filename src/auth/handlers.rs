use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use super::{
    dto::{LoginRequest, LoginResponse},
    services,
};
use crate::{error::AppResult, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let resp = services::login(state.store.as_ref(), &state.jwt, &payload).await?;
    Ok(Json(resp))
}
