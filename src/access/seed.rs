use tracing::{debug, info, instrument};

use super::services::{default_permission_description, default_role_description};
use crate::error::AppResult;
use crate::model::{PermissionType, RoleType};
use crate::store::{Store, StoreError};
use crate::validation::{PermissionDraft, RoleDraft};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub roles_created: usize,
    pub permissions_created: usize,
}

/// Ensures every role and permission of the fixed enumerations exists.
/// Existing rows are left untouched, so running it again creates nothing.
#[instrument(skip(store))]
pub async fn seed_reference_data(store: &dyn Store) -> AppResult<SeedReport> {
    let mut report = SeedReport::default();

    for &name in RoleType::ALL {
        if store.role_name_taken(name, None).await? {
            continue;
        }
        let draft = RoleDraft {
            name,
            description: Some(default_role_description(name)),
        };
        match store.insert_role(&draft).await {
            Ok(_) => report.roles_created += 1,
            Err(StoreError::Conflict(_)) => debug!(role = %name, "role seeded concurrently"),
            Err(e) => return Err(e.into()),
        }
    }

    for &name in PermissionType::ALL {
        if store.permission_name_taken(name, None).await? {
            continue;
        }
        let draft = PermissionDraft {
            name,
            description: Some(default_permission_description(name)),
        };
        match store.insert_permission(&draft).await {
            Ok(_) => report.permissions_created += 1,
            Err(StoreError::Conflict(_)) => {
                debug!(permission = %name, "permission seeded concurrently")
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        roles_created = report.roles_created,
        permissions_created = report.permissions_created,
        "reference data seeded"
    );
    Ok(report)
}
