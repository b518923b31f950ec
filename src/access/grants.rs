//! Assignment and revocation of permissions and roles.
//!
//! Every assignment first checks whether the relation already exists and
//! every revocation whether it exists at all. Either way a call that would
//! not change anything is logged and reported as `changed: false`, never as
//! an error. A concurrent duplicate attach that reaches the store's unique
//! key is folded into the same no-op.
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{AccessCheck, GrantOutcome};
use super::services::{require_permission, require_role};
use crate::error::AppResult;
use crate::model::{Permission, PermissionType, User};
use crate::store::{Store, StoreError};
use crate::users::services::{is_admin, require_user};
use crate::validation::FieldErrors;

const CHANGED: GrantOutcome = GrantOutcome { changed: true };
const UNCHANGED: GrantOutcome = GrantOutcome { changed: false };

#[instrument(skip(store))]
pub async fn assign_permission_to_role(
    store: &dyn Store,
    role_id: Uuid,
    permission_id: Uuid,
) -> AppResult<GrantOutcome> {
    let role = require_role(store, role_id).await?;
    let permission = require_permission(store, permission_id).await?;
    if store.role_has_permission(role_id, permission_id).await? {
        warn!(role = %role.name, permission = %permission.name, "role already has permission");
        return Ok(UNCHANGED);
    }
    match store.attach_role_permission(role_id, permission_id).await {
        Ok(()) => {
            info!(role = %role.name, permission = %permission.name, "permission assigned to role");
            Ok(CHANGED)
        }
        Err(StoreError::Conflict(_)) => {
            warn!(role = %role.name, permission = %permission.name, "role already has permission");
            Ok(UNCHANGED)
        }
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(store))]
pub async fn revoke_permission_from_role(
    store: &dyn Store,
    role_id: Uuid,
    permission_id: Uuid,
) -> AppResult<GrantOutcome> {
    let role = require_role(store, role_id).await?;
    let permission = require_permission(store, permission_id).await?;
    if !store.role_has_permission(role_id, permission_id).await? {
        warn!(role = %role.name, permission = %permission.name, "role does not have permission");
        return Ok(UNCHANGED);
    }
    store.detach_role_permission(role_id, permission_id).await?;
    info!(role = %role.name, permission = %permission.name, "permission revoked from role");
    Ok(CHANGED)
}

#[instrument(skip(store))]
pub async fn assign_permission_to_user(
    store: &dyn Store,
    user_id: Uuid,
    permission_id: Uuid,
) -> AppResult<GrantOutcome> {
    let user = require_user(store, user_id).await?;
    let permission = require_permission(store, permission_id).await?;
    if store.user_has_permission(user_id, permission_id).await? {
        warn!(user = %user.email, permission = %permission.name, "user already has permission");
        return Ok(UNCHANGED);
    }
    match store.attach_user_permission(user_id, permission_id).await {
        Ok(()) => {
            info!(user = %user.email, permission = %permission.name, "permission assigned to user");
            Ok(CHANGED)
        }
        Err(StoreError::Conflict(_)) => {
            warn!(user = %user.email, permission = %permission.name, "user already has permission");
            Ok(UNCHANGED)
        }
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(store))]
pub async fn revoke_permission_from_user(
    store: &dyn Store,
    user_id: Uuid,
    permission_id: Uuid,
) -> AppResult<GrantOutcome> {
    let user = require_user(store, user_id).await?;
    let permission = require_permission(store, permission_id).await?;
    if !store.user_has_permission(user_id, permission_id).await? {
        warn!(user = %user.email, permission = %permission.name, "user does not have permission");
        return Ok(UNCHANGED);
    }
    store.detach_user_permission(user_id, permission_id).await?;
    info!(user = %user.email, permission = %permission.name, "permission revoked from user");
    Ok(CHANGED)
}

/// Makes `role_id` the user's primary role. Re-assigning the current role
/// is a logged no-op.
#[instrument(skip(store))]
pub async fn assign_role_to_user(store: &dyn Store, user_id: Uuid, role_id: Uuid) -> AppResult<User> {
    let user = require_user(store, user_id).await?;
    let role = require_role(store, role_id).await?;
    if user.role_id == role_id {
        warn!(user = %user.email, role = %role.name, "user already has role");
        return Ok(user);
    }
    let user = store.set_user_role(user_id, role_id).await?;
    info!(user = %user.email, role = %role.name, "role assigned to user");
    Ok(user)
}

/// Whether the user holds `permission` as a direct grant. Permissions that
/// only reach the user through their role are not consulted.
pub async fn has_permission(
    store: &dyn Store,
    user_id: Uuid,
    permission: PermissionType,
) -> AppResult<bool> {
    let Some(permission) = store.find_permission_by_name(permission).await? else {
        return Ok(false);
    };
    Ok(store.user_has_permission(user_id, permission.id).await?)
}

/// Resolves a raw permission name and reports whether the user holds it
/// directly, alongside whether their role is `admin`.
pub async fn check_access(store: &dyn Store, user_id: Uuid, permission: &str) -> AppResult<AccessCheck> {
    let permission = match permission.trim().parse::<PermissionType>() {
        Ok(permission) => permission,
        Err(_) => {
            let mut errors = FieldErrors::default();
            errors.add("permission", "The selected permission is invalid.");
            return Err(errors.into());
        }
    };
    let user = require_user(store, user_id).await?;
    Ok(AccessCheck {
        user_id,
        permission,
        granted: has_permission(store, user_id, permission).await?,
        is_admin: is_admin(store, &user).await?,
    })
}

pub async fn role_permissions(store: &dyn Store, role_id: Uuid) -> AppResult<Vec<Permission>> {
    require_role(store, role_id).await?;
    Ok(store.list_role_permissions(role_id).await?)
}

pub async fn user_permissions(store: &dyn Store, user_id: Uuid) -> AppResult<Vec<Permission>> {
    require_user(store, user_id).await?;
    Ok(store.list_user_permissions(user_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::model::{RoleType, UserStatus};
    use crate::store::memory::InMemoryStore;
    use crate::store::NewUser;
    use crate::validation::{PermissionDraft, RoleDraft};

    struct Fixture {
        store: InMemoryStore,
        user: Uuid,
        role: Uuid,
        other_role: Uuid,
        permission: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let role = store
            .insert_role(&RoleDraft {
                name: RoleType::User,
                description: None,
            })
            .await
            .unwrap();
        let other_role = store
            .insert_role(&RoleDraft {
                name: RoleType::Moderator,
                description: None,
            })
            .await
            .unwrap();
        let permission = store
            .insert_permission(&PermissionDraft {
                name: PermissionType::SendMessage,
                description: None,
            })
            .await
            .unwrap();
        let user = store
            .insert_user(NewUser {
                name: "Sam".into(),
                email: "sam@example.com".into(),
                password_hash: "x".into(),
                phone: None,
                address: None,
                profile_image: None,
                status: UserStatus::Active,
                role_id: role.id,
            })
            .await
            .unwrap();
        Fixture {
            store,
            user: user.id,
            role: role.id,
            other_role: other_role.id,
            permission: permission.id,
        }
    }

    #[tokio::test]
    async fn assigning_user_permission_twice_is_idempotent() {
        let f = fixture().await;
        let first = assign_permission_to_user(&f.store, f.user, f.permission)
            .await
            .unwrap();
        assert!(first.changed);
        let second = assign_permission_to_user(&f.store, f.user, f.permission)
            .await
            .unwrap();
        assert!(!second.changed);
        assert_eq!(user_permissions(&f.store, f.user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn revoking_absent_permission_is_idempotent() {
        let f = fixture().await;
        let outcome = revoke_permission_from_user(&f.store, f.user, f.permission)
            .await
            .unwrap();
        assert!(!outcome.changed);
        assert!(user_permissions(&f.store, f.user).await.unwrap().is_empty());

        let outcome = revoke_permission_from_role(&f.store, f.role, f.permission)
            .await
            .unwrap();
        assert!(!outcome.changed);
    }

    #[tokio::test]
    async fn role_grants_round_trip() {
        let f = fixture().await;
        assert!(assign_permission_to_role(&f.store, f.role, f.permission)
            .await
            .unwrap()
            .changed);
        assert!(!assign_permission_to_role(&f.store, f.role, f.permission)
            .await
            .unwrap()
            .changed);
        assert_eq!(role_permissions(&f.store, f.role).await.unwrap().len(), 1);

        assert!(revoke_permission_from_role(&f.store, f.role, f.permission)
            .await
            .unwrap()
            .changed);
        assert!(role_permissions(&f.store, f.role).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn has_permission_ignores_role_grants() {
        let f = fixture().await;
        assign_permission_to_role(&f.store, f.role, f.permission)
            .await
            .unwrap();
        assert!(!has_permission(&f.store, f.user, PermissionType::SendMessage)
            .await
            .unwrap());

        assign_permission_to_user(&f.store, f.user, f.permission)
            .await
            .unwrap();
        assert!(has_permission(&f.store, f.user, PermissionType::SendMessage)
            .await
            .unwrap());
        assert!(!has_permission(&f.store, f.user, PermissionType::DeleteCar)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn assign_role_to_user_checks_both_ends() {
        let f = fixture().await;
        let user = assign_role_to_user(&f.store, f.user, f.other_role)
            .await
            .unwrap();
        assert_eq!(user.role_id, f.other_role);

        let err = assign_role_to_user(&f.store, f.user, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = assign_role_to_user(&f.store, Uuid::new_v4(), f.role)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_permission_is_not_found() {
        let f = fixture().await;
        let err = assign_permission_to_user(&f.store, f.user, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn check_access_reports_direct_grants_only() {
        let f = fixture().await;
        assign_permission_to_role(&f.store, f.role, f.permission)
            .await
            .unwrap();

        let check = check_access(&f.store, f.user, "send_message").await.unwrap();
        assert!(!check.granted);
        assert!(!check.is_admin);

        assign_permission_to_user(&f.store, f.user, f.permission)
            .await
            .unwrap();
        let check = check_access(&f.store, f.user, " send_message ").await.unwrap();
        assert_eq!(check.permission, PermissionType::SendMessage);
        assert!(check.granted);

        let err = check_access(&f.store, f.user, "fly").await.unwrap_err();
        assert!(err.field_errors().unwrap().has("permission"));
        assert!(matches!(
            check_access(&f.store, Uuid::new_v4(), "send_message").await,
            Err(AppError::NotFound(_))
        ));
    }
}
