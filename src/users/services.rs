use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::UserInput;
use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::hooks::{guard, Phase};
use crate::model::{Role, RoleType, User, UserStatus};
use crate::store::{NewUser, Store, UserUpdate};
use crate::validation::{validate_user, FieldErrors, UserDraft};

pub(crate) async fn require_user(store: &dyn Store, id: Uuid) -> AppResult<User> {
    store
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", id)))
}

/// The stored role row for a validated role name. A name that passed
/// validation but has no row yet is reported against the `role` field.
async fn resolve_role(store: &dyn Store, name: RoleType) -> AppResult<Role> {
    match store.find_role_by_name(name).await? {
        Some(role) => Ok(role),
        None => {
            let mut errors = FieldErrors::default();
            errors.add("role", "The selected role is invalid.");
            Err(errors.into())
        }
    }
}

pub async fn list_users(store: &dyn Store) -> AppResult<Vec<User>> {
    Ok(store.list_users().await?)
}

pub async fn get_user(store: &dyn Store, id: Uuid) -> AppResult<User> {
    require_user(store, id).await
}

#[instrument(skip(store, input))]
pub async fn create_user(store: &dyn Store, input: &UserInput) -> AppResult<User> {
    let user = guard(
        "user",
        Phase::Create,
        async {
            let draft = validate_user(store, input, None).await?;
            let role = resolve_role(store, draft.role).await?;
            let UserDraft {
                name,
                email,
                password,
                status,
                phone,
                address,
                profile_image,
                ..
            } = draft;
            let password = password
                .ok_or_else(|| AppError::Internal(anyhow::anyhow!("validated user has no password")))?;
            Ok::<_, AppError>(NewUser {
                name,
                email,
                password_hash: hash_password(&password)?,
                phone,
                address,
                profile_image,
                status,
                role_id: role.id,
            })
        },
        |user: NewUser| async move { store.insert_user(user).await },
    )
    .await?;
    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(user)
}

/// Replaces the user's profile. The credential is re-hashed only when a new
/// password is supplied.
#[instrument(skip(store, input))]
pub async fn update_user(store: &dyn Store, id: Uuid, input: &UserInput) -> AppResult<User> {
    let user = guard(
        "user",
        Phase::Update,
        async {
            require_user(store, id).await?;
            let draft = validate_user(store, input, Some(id)).await?;
            let role = resolve_role(store, draft.role).await?;
            let password_hash = match draft.password.as_deref() {
                Some(password) => Some(hash_password(password)?),
                None => None,
            };
            Ok::<_, AppError>(UserUpdate {
                name: draft.name,
                email: draft.email,
                password_hash,
                phone: draft.phone,
                address: draft.address,
                profile_image: draft.profile_image,
                status: draft.status,
                role_id: role.id,
            })
        },
        |update: UserUpdate| async move { store.update_user(id, update).await },
    )
    .await?;
    info!(user_id = %user.id, email = %user.email, "user updated");
    Ok(user)
}

#[instrument(skip(store))]
pub async fn delete_user(store: &dyn Store, id: Uuid) -> AppResult<()> {
    guard(
        "user",
        Phase::Delete,
        require_user(store, id),
        |user: User| async move {
            store.delete_user(user.id).await?;
            info!(user_id = %user.id, email = %user.email, "user deleted");
            Ok(())
        },
    )
    .await
}

async fn transition(store: &dyn Store, id: Uuid, status: UserStatus) -> AppResult<User> {
    let user = require_user(store, id).await?;
    if user.status == status {
        warn!(user_id = %id, status = %status, "user already in requested status");
        return Ok(user);
    }
    let user = store.set_user_status(id, status).await?;
    info!(user_id = %id, email = %user.email, status = %status, "user status changed");
    Ok(user)
}

#[instrument(skip(store))]
pub async fn activate_user(store: &dyn Store, id: Uuid) -> AppResult<User> {
    transition(store, id, UserStatus::Active).await
}

#[instrument(skip(store))]
pub async fn deactivate_user(store: &dyn Store, id: Uuid) -> AppResult<User> {
    transition(store, id, UserStatus::Inactive).await
}

pub async fn is_admin(store: &dyn Store, user: &User) -> AppResult<bool> {
    let role = store.get_role(user.role_id).await?;
    Ok(role.map_or(false, |r| r.name == RoleType::Admin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::seed::seed_reference_data;
    use crate::auth::password::verify_password;
    use crate::store::memory::InMemoryStore;

    fn input(email: &str) -> UserInput {
        UserInput {
            name: Some("Jane Doe".into()),
            email: Some(email.into()),
            password: Some("s3cret-pass".into()),
            password_confirmation: Some("s3cret-pass".into()),
            role: Some("user".into()),
            status: Some("active".into()),
            ..Default::default()
        }
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        seed_reference_data(&store).await.unwrap();
        store
    }

    #[tokio::test]
    async fn create_user_hashes_password_and_rejects_duplicate_email() {
        let store = seeded().await;
        let user = create_user(&store, &input("jane@example.com")).await.unwrap();
        assert_eq!(user.status, UserStatus::Active);
        assert_ne!(user.password_hash, "s3cret-pass");
        assert!(verify_password("s3cret-pass", &user.password_hash).unwrap());

        let err = create_user(&store, &input("JANE@example.com"))
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().has("email"));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_user_without_role_row_reports_role_field() {
        let store = InMemoryStore::new();
        let err = create_user(&store, &input("jane@example.com"))
            .await
            .unwrap_err();
        assert_eq!(
            err.field_errors().unwrap().get("role"),
            ["The selected role is invalid."]
        );
    }

    #[tokio::test]
    async fn update_rehashes_only_when_password_given() {
        let store = seeded().await;
        let user = create_user(&store, &input("jane@example.com")).await.unwrap();

        let keep = UserInput {
            password: None,
            password_confirmation: None,
            name: Some("Jane Roe".into()),
            ..input("jane@example.com")
        };
        let updated = update_user(&store, user.id, &keep).await.unwrap();
        assert_eq!(updated.name, "Jane Roe");
        assert_eq!(updated.password_hash, user.password_hash);

        let change = UserInput {
            password: Some("another-pass".into()),
            password_confirmation: Some("another-pass".into()),
            role: Some("admin".into()),
            ..input("jane@example.com")
        };
        let updated = update_user(&store, user.id, &change).await.unwrap();
        assert_ne!(updated.password_hash, user.password_hash);
        assert!(verify_password("another-pass", &updated.password_hash).unwrap());
        assert!(is_admin(&store, &updated).await.unwrap());
    }

    #[tokio::test]
    async fn activation_transitions() {
        let store = seeded().await;
        let user = create_user(
            &store,
            &UserInput {
                status: Some("inactive".into()),
                ..input("jane@example.com")
            },
        )
        .await
        .unwrap();
        assert!(!user.is_active());

        let user = activate_user(&store, user.id).await.unwrap();
        assert!(user.is_active());
        let again = activate_user(&store, user.id).await.unwrap();
        assert!(again.is_active());

        let user = deactivate_user(&store, user.id).await.unwrap();
        assert_eq!(user.status, UserStatus::Inactive);
        assert!(!is_admin(&store, &user).await.unwrap());
    }

    #[tokio::test]
    async fn delete_user_then_missing() {
        let store = seeded().await;
        let user = create_user(&store, &input("jane@example.com")).await.unwrap();
        delete_user(&store, user.id).await.unwrap();
        assert!(matches!(
            get_user(&store, user.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_user(&store, user.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
