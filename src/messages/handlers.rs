use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{SendMessageRequest, UpdateMessageRequest};
use super::services;
use crate::{auth::CurrentUser, error::AppResult, model::Message, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", get(list_messages))
        .route("/messages/:id", get(get_message))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(send_message))
        .route("/messages/:id", put(update_message).delete(delete_message))
}

#[instrument(skip(state))]
pub async fn list_messages(State(state): State<AppState>) -> AppResult<Json<Vec<Message>>> {
    Ok(Json(services::list_messages(state.store.as_ref(), None).await?))
}

#[instrument(skip(state))]
pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Message>> {
    Ok(Json(services::get_message(state.store.as_ref(), id).await?))
}

#[instrument(skip(state, payload))]
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(sender_id): CurrentUser,
    Json(payload): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let message = services::send_message(
        state.store.as_ref(),
        sender_id,
        payload.receiver_id,
        &payload.content,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[instrument(skip(state, payload))]
pub async fn update_message(
    State(state): State<AppState>,
    CurrentUser(editor): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMessageRequest>,
) -> AppResult<Json<Message>> {
    Ok(Json(
        services::update_message(state.store.as_ref(), id, editor, &payload).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_message(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_message(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
