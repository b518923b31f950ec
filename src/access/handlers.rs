use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{AccessCheck, GrantOutcome, PermissionInput, RoleInput, RolePermissions};
use super::{grants, services};
use crate::{
    error::AppResult,
    model::{Permission, Role, User},
    state::AppState,
    users::dto::UserPermissions,
};

pub fn role_routes() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route(
            "/roles/:id",
            get(get_role).put(update_role).delete(delete_role),
        )
        .route("/roles/:id/permissions", get(list_role_permissions))
        .route(
            "/roles/:id/permissions/:permission_id",
            put(assign_role_permission).delete(revoke_role_permission),
        )
}

pub fn permission_routes() -> Router<AppState> {
    Router::new()
        .route("/permissions", get(list_permissions).post(create_permission))
        .route(
            "/permissions/:id",
            get(get_permission)
                .put(update_permission)
                .delete(delete_permission),
        )
}

pub fn grant_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:id/role/:role_id", put(assign_user_role))
        .route("/users/:id/permissions", get(list_user_permissions))
        .route("/users/:id/access/:permission", get(check_user_access))
        .route(
            "/users/:id/permissions/:permission_id",
            put(assign_user_permission).delete(revoke_user_permission),
        )
}

// --- roles ---

#[instrument(skip(state))]
pub async fn list_roles(State(state): State<AppState>) -> AppResult<Json<Vec<Role>>> {
    Ok(Json(services::list_roles(state.store.as_ref()).await?))
}

#[instrument(skip(state))]
pub async fn get_role(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Role>> {
    Ok(Json(services::get_role(state.store.as_ref(), id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_role(
    State(state): State<AppState>,
    Json(payload): Json<RoleInput>,
) -> AppResult<(StatusCode, Json<Role>)> {
    let role = services::create_role(state.store.as_ref(), &payload).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[instrument(skip(state, payload))]
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleInput>,
) -> AppResult<Json<Role>> {
    Ok(Json(services::update_role(state.store.as_ref(), id, &payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_role(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    services::delete_role(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_role_permissions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RolePermissions>> {
    let permissions = grants::role_permissions(state.store.as_ref(), id).await?;
    Ok(Json(RolePermissions {
        role_id: id,
        permissions,
    }))
}

#[instrument(skip(state))]
pub async fn assign_role_permission(
    State(state): State<AppState>,
    Path((id, permission_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<GrantOutcome>> {
    let outcome =
        grants::assign_permission_to_role(state.store.as_ref(), id, permission_id).await?;
    Ok(Json(outcome))
}

#[instrument(skip(state))]
pub async fn revoke_role_permission(
    State(state): State<AppState>,
    Path((id, permission_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<GrantOutcome>> {
    let outcome =
        grants::revoke_permission_from_role(state.store.as_ref(), id, permission_id).await?;
    Ok(Json(outcome))
}

// --- permissions ---

#[instrument(skip(state))]
pub async fn list_permissions(State(state): State<AppState>) -> AppResult<Json<Vec<Permission>>> {
    Ok(Json(services::list_permissions(state.store.as_ref()).await?))
}

#[instrument(skip(state))]
pub async fn get_permission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Permission>> {
    Ok(Json(services::get_permission(state.store.as_ref(), id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_permission(
    State(state): State<AppState>,
    Json(payload): Json<PermissionInput>,
) -> AppResult<(StatusCode, Json<Permission>)> {
    let permission = services::create_permission(state.store.as_ref(), &payload).await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

#[instrument(skip(state, payload))]
pub async fn update_permission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PermissionInput>,
) -> AppResult<Json<Permission>> {
    Ok(Json(
        services::update_permission(state.store.as_ref(), id, &payload).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_permission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_permission(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- user grants ---

#[instrument(skip(state))]
pub async fn assign_user_role(
    State(state): State<AppState>,
    Path((id, role_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<User>> {
    Ok(Json(
        grants::assign_role_to_user(state.store.as_ref(), id, role_id).await?,
    ))
}

#[instrument(skip(state))]
pub async fn list_user_permissions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserPermissions>> {
    let permissions = grants::user_permissions(state.store.as_ref(), id).await?;
    Ok(Json(UserPermissions {
        user_id: id,
        permissions,
    }))
}

#[instrument(skip(state))]
pub async fn check_user_access(
    State(state): State<AppState>,
    Path((id, permission)): Path<(Uuid, String)>,
) -> AppResult<Json<AccessCheck>> {
    Ok(Json(
        grants::check_access(state.store.as_ref(), id, &permission).await?,
    ))
}

#[instrument(skip(state))]
pub async fn assign_user_permission(
    State(state): State<AppState>,
    Path((id, permission_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<GrantOutcome>> {
    let outcome =
        grants::assign_permission_to_user(state.store.as_ref(), id, permission_id).await?;
    Ok(Json(outcome))
}

#[instrument(skip(state))]
pub async fn revoke_user_permission(
    State(state): State<AppState>,
    Path((id, permission_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<GrantOutcome>> {
    let outcome =
        grants::revoke_permission_from_user(state.store.as_ref(), id, permission_id).await?;
    Ok(Json(outcome))
}
