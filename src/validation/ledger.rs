use uuid::Uuid;

use super::{max_chars, one_of, optional, required, FieldErrors};
use crate::audit::dto::ActivityLogInput;
use crate::error::AppResult;
use crate::messages::dto::MessageInput;
use crate::model::PermissionType;
use crate::store::Store;

pub const MAX_MESSAGE_CHARS: usize = 500;
pub const MAX_LOG_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityLogDraft {
    pub user_id: Uuid,
    pub action: PermissionType,
    pub description: Option<String>,
}

/// Present and pointing at an existing user.
async fn existing_user(
    store: &dyn Store,
    errors: &mut FieldErrors,
    field: &str,
    id: Option<Uuid>,
) -> AppResult<Option<Uuid>> {
    let Some(id) = id else {
        errors.add(field, format!("The {} field is required.", super::label(field)));
        return Ok(None);
    };
    if store.get_user(id).await?.is_none() {
        errors.add(field, format!("The selected {} is invalid.", super::label(field)));
        return Ok(None);
    }
    Ok(Some(id))
}

pub async fn validate_message(store: &dyn Store, input: &MessageInput) -> AppResult<MessageDraft> {
    let mut errors = FieldErrors::default();
    let sender_id = existing_user(store, &mut errors, "sender_id", input.sender_id).await?;
    let receiver_id = existing_user(store, &mut errors, "receiver_id", input.receiver_id).await?;
    // message bodies keep their inner whitespace; only blank content is rejected
    let content = match input.content.as_deref() {
        Some(c) if !c.trim().is_empty() => {
            if max_chars(&mut errors, "content", c, MAX_MESSAGE_CHARS) {
                Some(c.to_string())
            } else {
                None
            }
        }
        _ => {
            errors.add("content", "The content field is required.");
            None
        }
    };

    match (sender_id, receiver_id, content) {
        (Some(sender_id), Some(receiver_id), Some(content)) if errors.is_empty() => {
            Ok(MessageDraft {
                sender_id,
                receiver_id,
                content,
            })
        }
        _ => Err(errors.into()),
    }
}

pub async fn validate_activity_log(
    store: &dyn Store,
    input: &ActivityLogInput,
) -> AppResult<ActivityLogDraft> {
    let mut errors = FieldErrors::default();
    let user_id = existing_user(store, &mut errors, "user_id", input.user_id).await?;
    let action = required(&mut errors, "action", input.action.as_deref())
        .and_then(|a| one_of::<PermissionType>(&mut errors, "action", a));
    let description = optional(input.description.as_deref())
        .filter(|d| max_chars(&mut errors, "description", d, MAX_LOG_DESCRIPTION_CHARS))
        .map(str::to_string);

    match (user_id, action) {
        (Some(user_id), Some(action)) if errors.is_empty() => Ok(ActivityLogDraft {
            user_id,
            action,
            description,
        }),
        _ => Err(errors.into()),
    }
}
