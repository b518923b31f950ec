use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{PermissionInput, RoleInput};
use crate::error::{AppError, AppResult};
use crate::hooks::{guard, Phase};
use crate::model::{Permission, PermissionType, Role, RoleType};
use crate::store::Store;
use crate::validation::{validate_permission, validate_role, PermissionDraft, RoleDraft};

pub fn default_role_description(name: RoleType) -> String {
    format!("Default description for role {}", name)
}

pub fn default_permission_description(name: PermissionType) -> String {
    format!("Default description for permission {}", name)
}

pub(crate) async fn require_role(store: &dyn Store, id: Uuid) -> AppResult<Role> {
    store
        .get_role(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Role {} not found", id)))
}

pub(crate) async fn require_permission(store: &dyn Store, id: Uuid) -> AppResult<Permission> {
    store
        .get_permission(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Permission {} not found", id)))
}

pub async fn list_roles(store: &dyn Store) -> AppResult<Vec<Role>> {
    Ok(store.list_roles().await?)
}

pub async fn get_role(store: &dyn Store, id: Uuid) -> AppResult<Role> {
    require_role(store, id).await
}

#[instrument(skip(store, input))]
pub async fn create_role(store: &dyn Store, input: &RoleInput) -> AppResult<Role> {
    let role = guard(
        "role",
        Phase::Create,
        async {
            let mut draft = validate_role(store, input, None).await?;
            if draft.description.is_none() {
                draft.description = Some(default_role_description(draft.name));
            }
            Ok::<_, AppError>(draft)
        },
        |draft: RoleDraft| async move { store.insert_role(&draft).await },
    )
    .await?;
    info!(role_id = %role.id, role = %role.name, "role created");
    Ok(role)
}

#[instrument(skip(store, input))]
pub async fn update_role(store: &dyn Store, id: Uuid, input: &RoleInput) -> AppResult<Role> {
    let role = guard(
        "role",
        Phase::Update,
        async {
            let existing = require_role(store, id).await?;
            let renamed = input
                .name
                .as_deref()
                .and_then(|n| n.trim().parse::<RoleType>().ok())
                .filter(|name| *name != existing.name);
            if let Some(name) = renamed {
                if store.role_name_taken(name, Some(id)).await? {
                    return Err(AppError::conflict(format!(
                        "The role name {} is already in use by another role.",
                        name
                    )));
                }
            }
            let mut draft = validate_role(store, input, Some(id)).await?;
            if draft.description.is_none() {
                draft.description = Some(default_role_description(draft.name));
            }
            Ok::<_, AppError>(draft)
        },
        |draft: RoleDraft| async move { store.update_role(id, &draft).await },
    )
    .await?;
    info!(role_id = %role.id, role = %role.name, "role updated");
    Ok(role)
}

/// Soft-deletes a role nobody is assigned to.
#[instrument(skip(store))]
pub async fn delete_role(store: &dyn Store, id: Uuid) -> AppResult<()> {
    guard(
        "role",
        Phase::Delete,
        async {
            let role = require_role(store, id).await?;
            let holders = store.count_users_with_role(id).await?;
            if holders > 0 {
                return Err(AppError::conflict(format!(
                    "Cannot delete role {} because it is assigned to {} user(s).",
                    role.name, holders
                )));
            }
            Ok::<_, AppError>(role)
        },
        |role: Role| async move {
            store.soft_delete_role(role.id).await?;
            info!(role_id = %role.id, role = %role.name, "role deleted");
            Ok(())
        },
    )
    .await
}

pub async fn list_permissions(store: &dyn Store) -> AppResult<Vec<Permission>> {
    Ok(store.list_permissions().await?)
}

pub async fn get_permission(store: &dyn Store, id: Uuid) -> AppResult<Permission> {
    require_permission(store, id).await
}

#[instrument(skip(store, input))]
pub async fn create_permission(store: &dyn Store, input: &PermissionInput) -> AppResult<Permission> {
    let permission = guard(
        "permission",
        Phase::Create,
        async {
            let mut draft = validate_permission(store, input, None).await?;
            if draft.description.is_none() {
                draft.description = Some(default_permission_description(draft.name));
            }
            Ok::<_, AppError>(draft)
        },
        |draft: PermissionDraft| async move { store.insert_permission(&draft).await },
    )
    .await?;
    info!(permission_id = %permission.id, permission = %permission.name, "permission created");
    Ok(permission)
}

#[instrument(skip(store, input))]
pub async fn update_permission(
    store: &dyn Store,
    id: Uuid,
    input: &PermissionInput,
) -> AppResult<Permission> {
    let permission = guard(
        "permission",
        Phase::Update,
        async {
            let existing = require_permission(store, id).await?;
            let renamed = input
                .name
                .as_deref()
                .and_then(|n| n.trim().parse::<PermissionType>().ok())
                .filter(|name| *name != existing.name);
            if let Some(name) = renamed {
                if store.permission_name_taken(name, Some(id)).await? {
                    return Err(AppError::conflict(format!(
                        "The permission name {} is already in use by another permission.",
                        name
                    )));
                }
            }
            let mut draft = validate_permission(store, input, Some(id)).await?;
            if draft.description.is_none() {
                draft.description = Some(default_permission_description(draft.name));
            }
            Ok::<_, AppError>(draft)
        },
        |draft: PermissionDraft| async move { store.update_permission(id, &draft).await },
    )
    .await?;
    info!(permission_id = %permission.id, permission = %permission.name, "permission updated");
    Ok(permission)
}

/// Deletes a permission no user holds as a direct grant. Role grants are
/// dropped along with it.
#[instrument(skip(store))]
pub async fn delete_permission(store: &dyn Store, id: Uuid) -> AppResult<()> {
    guard(
        "permission",
        Phase::Delete,
        async {
            let permission = require_permission(store, id).await?;
            let holders = store.count_direct_holders(id).await?;
            if holders > 0 {
                return Err(AppError::conflict(format!(
                    "Cannot delete permission {} because it is granted to {} user(s).",
                    permission.name, holders
                )));
            }
            Ok::<_, AppError>(permission)
        },
        |permission: Permission| async move {
            store.delete_permission(permission.id).await?;
            info!(permission_id = %permission.id, permission = %permission.name, "permission deleted");
            Ok(())
        },
    )
    .await
}
