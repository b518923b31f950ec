use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::ActivityLogInput;
use crate::error::{AppError, AppResult};
use crate::hooks::{guard, Phase};
use crate::model::{ActivityLog, PermissionType};
use crate::store::Store;
use crate::validation::{validate_activity_log, ActivityLogDraft};

async fn require_log(store: &dyn Store, id: Uuid) -> AppResult<ActivityLog> {
    store
        .get_activity_log(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Activity log {} not found", id)))
}

/// Records that `user_id` performed `action`.
pub async fn create_log(
    store: &dyn Store,
    user_id: Uuid,
    action: PermissionType,
    description: Option<&str>,
) -> AppResult<ActivityLog> {
    let input = ActivityLogInput {
        user_id: Some(user_id),
        action: Some(action.as_str().to_string()),
        description: description.map(str::to_string),
    };
    record_log(store, &input).await
}

/// Validates the raw entry, logs it, then persists it. The before-create
/// hook validates the entry a second time against the store.
#[instrument(skip(store, input))]
pub async fn record_log(store: &dyn Store, input: &ActivityLogInput) -> AppResult<ActivityLog> {
    let draft = validate_activity_log(store, input).await?;
    info!(user_id = %draft.user_id, action = %draft.action, "recording activity");

    guard(
        "activity_log",
        Phase::Create,
        async {
            let checked = validate_activity_log(store, input).await?;
            Ok::<_, AppError>(checked)
        },
        |checked: ActivityLogDraft| async move { store.insert_activity_log(&checked).await },
    )
    .await
}

pub async fn list_logs(store: &dyn Store, user_id: Option<Uuid>) -> AppResult<Vec<ActivityLog>> {
    Ok(store.list_activity_logs(user_id).await?)
}

pub async fn get_log(store: &dyn Store, id: Uuid) -> AppResult<ActivityLog> {
    require_log(store, id).await
}

/// Rewrites an entry. The entry is re-attributed to `actor`; any `user_id`
/// in `input` is ignored.
#[instrument(skip(store, input))]
pub async fn update_log(
    store: &dyn Store,
    id: Uuid,
    actor: Uuid,
    input: &ActivityLogInput,
) -> AppResult<ActivityLog> {
    guard(
        "activity_log",
        Phase::Update,
        async {
            require_log(store, id).await?;
            let input = ActivityLogInput {
                user_id: Some(actor),
                ..input.clone()
            };
            validate_activity_log(store, &input).await
        },
        |draft: ActivityLogDraft| async move { store.update_activity_log(id, &draft).await },
    )
    .await
}

#[instrument(skip(store))]
pub async fn delete_log(store: &dyn Store, id: Uuid) -> AppResult<()> {
    guard(
        "activity_log",
        Phase::Delete,
        require_log(store, id),
        |log: ActivityLog| async move {
            store.delete_activity_log(log.id).await?;
            info!(log_id = %log.id, action = %log.action, "activity log deleted");
            Ok(())
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RoleType, UserStatus};
    use crate::store::memory::InMemoryStore;
    use crate::store::NewUser;
    use crate::validation::RoleDraft;

    async fn actor(store: &InMemoryStore) -> Uuid {
        actor_with_email(store, "mod@example.com").await
    }

    async fn actor_with_email(store: &InMemoryStore, email: &str) -> Uuid {
        let role = match store.find_role_by_name(RoleType::Moderator).await.unwrap() {
            Some(role) => role,
            None => store
                .insert_role(&RoleDraft {
                    name: RoleType::Moderator,
                    description: None,
                })
                .await
                .unwrap(),
        };
        store
            .insert_user(NewUser {
                name: "Mod".into(),
                email: email.into(),
                password_hash: "x".into(),
                phone: None,
                address: None,
                profile_image: None,
                status: UserStatus::Active,
                role_id: role.id,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_log_persists_validated_entry() {
        let store = InMemoryStore::new();
        let user = actor(&store).await;
        let log = create_log(&store, user, PermissionType::EditCar, Some("changed price"))
            .await
            .unwrap();
        assert_eq!(log.action, PermissionType::EditCar);
        assert_eq!(log.description.as_deref(), Some("changed price"));
        assert_eq!(get_log(&store, log.id).await.unwrap(), log);
        assert_eq!(list_logs(&store, Some(user)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_log_for_unknown_user_fails() {
        let store = InMemoryStore::new();
        let err = create_log(&store, Uuid::new_v4(), PermissionType::ViewCar, None)
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().has("user_id"));
        assert!(list_logs(&store, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_log() {
        let store = InMemoryStore::new();
        let user = actor(&store).await;
        let log = create_log(&store, user, PermissionType::ListCars, None)
            .await
            .unwrap();

        let bad = ActivityLogInput {
            user_id: Some(user),
            action: Some("teleport".into()),
            description: None,
        };
        let err = update_log(&store, log.id, user, &bad).await.unwrap_err();
        assert!(err.field_errors().unwrap().has("action"));

        let good = ActivityLogInput {
            action: Some("export_activity_log".into()),
            description: Some("monthly export".into()),
            ..bad
        };
        let updated = update_log(&store, log.id, user, &good).await.unwrap();
        assert_eq!(updated.action, PermissionType::ExportActivityLog);

        delete_log(&store, log.id).await.unwrap();
        assert!(matches!(
            delete_log(&store, log.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_cannot_reassign_entry_to_another_user() {
        let store = InMemoryStore::new();
        let author = actor_with_email(&store, "author@example.com").await;
        let other = actor_with_email(&store, "other@example.com").await;
        let log = create_log(&store, author, PermissionType::ViewUser, None)
            .await
            .unwrap();

        let forged = ActivityLogInput {
            user_id: Some(other),
            action: Some("view_user".into()),
            description: Some("edited".into()),
        };
        let updated = update_log(&store, log.id, author, &forged).await.unwrap();
        assert_eq!(updated.user_id, author);
        assert_eq!(get_log(&store, log.id).await.unwrap().user_id, author);
        assert!(list_logs(&store, Some(other)).await.unwrap().is_empty());
    }
}
