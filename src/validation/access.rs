use uuid::Uuid;

use super::{max_chars, one_of, optional, required, FieldErrors};
use crate::access::dto::{PermissionInput, RoleInput};
use crate::error::AppResult;
use crate::model::{PermissionType, RoleType};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDraft {
    pub name: RoleType,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDraft {
    pub name: PermissionType,
    pub description: Option<String>,
}

/// Shared shape of role and permission rules: a unique name from a fixed
/// enumeration and an optional short description.
fn name_and_description<T: std::str::FromStr>(
    errors: &mut FieldErrors,
    name: Option<&str>,
    description: Option<&str>,
) -> (Option<T>, Option<String>) {
    let name = required(errors, "name", name)
        .filter(|n| max_chars(errors, "name", n, 255))
        .and_then(|n| one_of::<T>(errors, "name", n));
    let description = optional(description)
        .filter(|d| max_chars(errors, "description", d, 255))
        .map(str::to_string);
    (name, description)
}

pub async fn validate_role(
    store: &dyn Store,
    input: &RoleInput,
    current: Option<Uuid>,
) -> AppResult<RoleDraft> {
    let mut errors = FieldErrors::default();
    let (name, description) = name_and_description::<RoleType>(
        &mut errors,
        input.name.as_deref(),
        input.description.as_deref(),
    );
    if let Some(name) = name {
        if store.role_name_taken(name, current).await? {
            errors.add("name", "The name has already been taken.");
        }
    }
    match name {
        Some(name) if errors.is_empty() => Ok(RoleDraft { name, description }),
        _ => Err(errors.into()),
    }
}

pub async fn validate_permission(
    store: &dyn Store,
    input: &PermissionInput,
    current: Option<Uuid>,
) -> AppResult<PermissionDraft> {
    let mut errors = FieldErrors::default();
    let (name, description) = name_and_description::<PermissionType>(
        &mut errors,
        input.name.as_deref(),
        input.description.as_deref(),
    );
    if let Some(name) = name {
        if store.permission_name_taken(name, current).await? {
            errors.add("name", "The name has already been taken.");
        }
    }
    match name {
        Some(name) if errors.is_empty() => Ok(PermissionDraft { name, description }),
        _ => Err(errors.into()),
    }
}
