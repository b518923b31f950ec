use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Permission, PermissionType};

/// Raw body of a role create or update request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Raw body of a permission create or update request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Result of an assignment or revocation. `changed` is false when the call
/// was a no-op because the relation already was in the requested state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GrantOutcome {
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct RolePermissions {
    pub role_id: Uuid,
    pub permissions: Vec<Permission>,
}

/// Answer to "may this user perform `permission`?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessCheck {
    pub user_id: Uuid,
    pub permission: PermissionType,
    pub granted: bool,
    pub is_admin: bool,
}
