use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CarFilter, CarInput};
use super::services;
use crate::{auth::CurrentUser, error::AppResult, model::Car, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/cars", get(list_cars))
        .route("/cars/:id", get(get_car))
}

/// Every write records the authenticated user as creator, updater or deleter.
pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/cars", post(create_car))
        .route("/cars/:id", put(update_car).delete(delete_car))
}

#[instrument(skip(state))]
pub async fn list_cars(
    State(state): State<AppState>,
    Query(filter): Query<CarFilter>,
) -> AppResult<Json<Vec<Car>>> {
    let cars = services::list_cars(state.store.as_ref(), filter.status.as_deref()).await?;
    Ok(Json(cars))
}

#[instrument(skip(state))]
pub async fn get_car(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Car>> {
    Ok(Json(services::get_car(state.store.as_ref(), id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_car(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<CarInput>,
) -> AppResult<(StatusCode, Json<Car>)> {
    let car = services::create_car(state.store.as_ref(), &payload, Some(user_id)).await?;
    Ok((StatusCode::CREATED, Json(car)))
}

#[instrument(skip(state, payload))]
pub async fn update_car(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CarInput>,
) -> AppResult<Json<Car>> {
    let car = services::update_car(state.store.as_ref(), id, &payload, Some(user_id)).await?;
    Ok(Json(car))
}

#[instrument(skip(state))]
pub async fn delete_car(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_car(state.store.as_ref(), id, Some(user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
