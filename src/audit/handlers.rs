use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{ActivityLogInput, CreateLogRequest, LogFilter};
use super::services;
use crate::{auth::CurrentUser, error::AppResult, model::ActivityLog, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/activity-logs", get(list_logs))
        .route("/activity-logs/:id", get(get_log))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/activity-logs", post(create_log))
        .route("/activity-logs/:id", put(update_log).delete(delete_log))
}

#[instrument(skip(state))]
pub async fn list_logs(
    State(state): State<AppState>,
    Query(filter): Query<LogFilter>,
) -> AppResult<Json<Vec<ActivityLog>>> {
    Ok(Json(
        services::list_logs(state.store.as_ref(), filter.user_id).await?,
    ))
}

#[instrument(skip(state))]
pub async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ActivityLog>> {
    Ok(Json(services::get_log(state.store.as_ref(), id).await?))
}

/// The entry is attributed to the authenticated user.
#[instrument(skip(state, payload))]
pub async fn create_log(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<CreateLogRequest>,
) -> AppResult<(StatusCode, Json<ActivityLog>)> {
    let input = ActivityLogInput {
        user_id: Some(user_id),
        action: Some(payload.action),
        description: payload.description,
    };
    let log = services::record_log(state.store.as_ref(), &input).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

#[instrument(skip(state, payload))]
pub async fn update_log(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ActivityLogInput>,
) -> AppResult<Json<ActivityLog>> {
    Ok(Json(
        services::update_log(state.store.as_ref(), id, user_id, &payload).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_log(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_log(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
