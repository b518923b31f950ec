use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageInput {
    pub sender_id: Option<Uuid>,
    pub receiver_id: Option<Uuid>,
    pub content: Option<String>,
}

/// Body of `POST /messages`; the sender is the authenticated user.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
}

/// Body of `PUT /messages/:id`.
#[derive(Debug, Deserialize)]
pub struct UpdateMessageRequest {
    pub receiver_id: Option<Uuid>,
    pub content: Option<String>,
}
