use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityLogInput {
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub description: Option<String>,
}

/// Body of `POST /activity-logs`; the acting user is the authenticated one.
#[derive(Debug, Deserialize)]
pub struct CreateLogRequest {
    pub action: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogFilter {
    pub user_id: Option<Uuid>,
}
