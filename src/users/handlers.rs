use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{UserInput, UserResponse};
use super::services;
use crate::{error::AppResult, model::User, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/activate", post(activate_user))
        .route("/users/:id/deactivate", post(deactivate_user))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(services::list_users(state.store.as_ref()).await?))
}

#[instrument(skip(state))]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<User>> {
    Ok(Json(services::get_user(state.store.as_ref(), id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<UserInput>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = services::create_user(state.store.as_ref(), &payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User created successfully.".into(),
            user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserInput>,
) -> AppResult<Json<UserResponse>> {
    let user = services::update_user(state.store.as_ref(), id, &payload).await?;
    Ok(Json(UserResponse {
        message: "User updated successfully.".into(),
        user,
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    services::delete_user(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn activate_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = services::activate_user(state.store.as_ref(), id).await?;
    Ok(Json(UserResponse {
        message: "User activated successfully.".into(),
        user,
    }))
}

#[instrument(skip(state))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = services::deactivate_user(state.store.as_ref(), id).await?;
    Ok(Json(UserResponse {
        message: "User deactivated successfully.".into(),
        user,
    }))
}
