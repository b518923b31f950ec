use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{MessageInput, UpdateMessageRequest};
use crate::error::{AppError, AppResult};
use crate::hooks::{guard, Phase};
use crate::model::Message;
use crate::store::Store;
use crate::validation::{validate_message, MessageDraft};

async fn require_message(store: &dyn Store, id: Uuid) -> AppResult<Message> {
    store
        .get_message(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Message {} not found", id)))
}

/// Validates, logs and stores one message.
#[instrument(skip(store, content))]
pub async fn send_message(
    store: &dyn Store,
    sender_id: Uuid,
    receiver_id: Uuid,
    content: &str,
) -> AppResult<Message> {
    let input = MessageInput {
        sender_id: Some(sender_id),
        receiver_id: Some(receiver_id),
        content: Some(content.to_string()),
    };
    guard(
        "message",
        Phase::Create,
        async {
            let draft = validate_message(store, &input).await?;
            info!(sender_id = %draft.sender_id, receiver_id = %draft.receiver_id, "sending message");
            Ok::<_, AppError>(draft)
        },
        |draft: MessageDraft| async move { store.insert_message(&draft).await },
    )
    .await
}

pub async fn list_messages(store: &dyn Store, participant: Option<Uuid>) -> AppResult<Vec<Message>> {
    Ok(store.list_messages(participant).await?)
}

pub async fn get_message(store: &dyn Store, id: Uuid) -> AppResult<Message> {
    require_message(store, id).await
}

/// Applies the changed fields and re-validates the whole record. The
/// sender is always `editor`, never a value from the request.
#[instrument(skip(store, changes))]
pub async fn update_message(
    store: &dyn Store,
    id: Uuid,
    editor: Uuid,
    changes: &UpdateMessageRequest,
) -> AppResult<Message> {
    guard(
        "message",
        Phase::Update,
        async {
            let existing = require_message(store, id).await?;
            let input = MessageInput {
                sender_id: Some(editor),
                receiver_id: Some(changes.receiver_id.unwrap_or(existing.receiver_id)),
                content: Some(
                    changes
                        .content
                        .clone()
                        .unwrap_or_else(|| existing.content.clone()),
                ),
            };
            validate_message(store, &input).await
        },
        |draft: MessageDraft| async move { store.update_message(id, &draft).await },
    )
    .await
}

#[instrument(skip(store))]
pub async fn delete_message(store: &dyn Store, id: Uuid) -> AppResult<()> {
    guard(
        "message",
        Phase::Delete,
        require_message(store, id),
        |message: Message| async move {
            store.delete_message(message.id).await?;
            info!(message_id = %message.id, sender_id = %message.sender_id, "message deleted");
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

    async fn two_users(store: &InMemoryStore) -> (Uuid, Uuid) {
        let role = store
            .insert_role(&RoleDraft {
                name: RoleType::User,
                description: None,
            })
            .await
            .unwrap();
        let mut ids = Vec::new();
        for email in ["alice@example.com", "bob@example.com"] {
            let user = store
                .insert_user(NewUser {
                    name: email.into(),
                    email: email.into(),
                    password_hash: "x".into(),
                    phone: None,
                    address: None,
                    profile_image: None,
                    status: UserStatus::Active,
                    role_id: role.id,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        (ids[0], ids[1])
    }

    #[tokio::test]
    async fn send_then_read_back() {
        let store = InMemoryStore::new();
        let (alice, bob) = two_users(&store).await;

        let sent = send_message(&store, alice, bob, "hello").await.unwrap();
        let read = get_message(&store, sent.id).await.unwrap();
        assert_eq!(read.sender_id, alice);
        assert_eq!(read.receiver_id, bob);
        assert_eq!(read.content, "hello");

        assert_eq!(list_messages(&store, Some(bob)).await.unwrap().len(), 1);
        assert!(list_messages(&store, Some(Uuid::new_v4()))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn rejected_message_is_not_stored() {
        let store = InMemoryStore::new();
        let (alice, _) = two_users(&store).await;
        let err = send_message(&store, alice, Uuid::new_v4(), "hello")
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().has("receiver_id"));

        let err = send_message(&store, alice, alice, "   ").await.unwrap_err();
        assert!(err.field_errors().unwrap().has("content"));
        assert!(list_messages(&store, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_revalidates_and_delete_removes() {
        let store = InMemoryStore::new();
        let (alice, bob) = two_users(&store).await;
        let sent = send_message(&store, alice, bob, "hello").await.unwrap();

        let updated = update_message(
            &store,
            sent.id,
            alice,
            &UpdateMessageRequest {
                receiver_id: None,
                content: Some("hello again".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.content, "hello again");
        assert_eq!(updated.receiver_id, bob);

        let err = update_message(
            &store,
            sent.id,
            alice,
            &UpdateMessageRequest {
                receiver_id: None,
                content: Some("x".repeat(501)),
            },
        )
        .await
        .unwrap_err();
        assert!(err.field_errors().unwrap().has("content"));
        assert_eq!(get_message(&store, sent.id).await.unwrap().content, "hello again");

        delete_message(&store, sent.id).await.unwrap();
        assert!(matches!(
            get_message(&store, sent.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_attributes_message_to_editor() {
        let store = InMemoryStore::new();
        let (alice, bob) = two_users(&store).await;
        let sent = send_message(&store, alice, bob, "hello").await.unwrap();

        let updated = update_message(
            &store,
            sent.id,
            alice,
            &UpdateMessageRequest {
                receiver_id: Some(alice),
                content: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.sender_id, alice);
        assert_eq!(updated.receiver_id, alice);

        let err = update_message(
            &store,
            sent.id,
            Uuid::new_v4(),
            &UpdateMessageRequest {
                receiver_id: None,
                content: Some("rewritten".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(err.field_errors().unwrap().has("sender_id"));
        assert_eq!(get_message(&store, sent.id).await.unwrap().content, "hello");
    }
}
