//! Persistence seam for every entity and relation.
//!
//! Services only ever talk to [`Store`]. Two backends implement it:
//! [`memory::InMemoryStore`] for tests and database-less runs, and
//! [`postgres::PgStore`] backed by sqlx. Both enforce the unique constraints
//! themselves (role and permission names, user emails, car serial numbers,
//! join-table pairs) and report violations as [`StoreError::Conflict`], which
//! is what makes concurrent duplicate creates safe: the application-level
//! pre-checks only exist to produce field-level messages.
//!
//! Writes accept validated drafts only, so nothing reaches a backend without
//! having passed its rule set first.
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{
    ActivityLog, Car, CarStatus, Message, Permission, PermissionType, Role, RoleType, User,
    UserStatus,
};
use crate::validation::{ActivityLogDraft, CarDraft, MessageDraft, PermissionDraft, RoleDraft};

pub mod memory;
pub mod postgres;
mod rows;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A user ready to be inserted; the credential is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<String>,
    pub status: UserStatus,
    pub role_id: Uuid,
}

/// Full replacement of a user's profile. `password_hash: None` keeps the
/// stored credential.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<String>,
    pub status: UserStatus,
    pub role_id: Uuid,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> StoreResult<bool>;
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<User>;
    async fn set_user_status(&self, id: Uuid, status: UserStatus) -> StoreResult<User>;
    async fn set_user_role(&self, id: Uuid, role_id: Uuid) -> StoreResult<User>;
    async fn delete_user(&self, id: Uuid) -> StoreResult<()>;
    async fn count_users_with_role(&self, role_id: Uuid) -> StoreResult<u64>;

    /// Roles that are not soft-deleted.
    async fn list_roles(&self) -> StoreResult<Vec<Role>>;
    async fn get_role(&self, id: Uuid) -> StoreResult<Option<Role>>;
    async fn find_role_by_name(&self, name: RoleType) -> StoreResult<Option<Role>>;
    /// Soft-deleted roles still hold their name.
    async fn role_name_taken(&self, name: RoleType, except: Option<Uuid>) -> StoreResult<bool>;
    async fn insert_role(&self, role: &RoleDraft) -> StoreResult<Role>;
    async fn update_role(&self, id: Uuid, role: &RoleDraft) -> StoreResult<Role>;
    async fn soft_delete_role(&self, id: Uuid) -> StoreResult<()>;

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>>;
    async fn get_permission(&self, id: Uuid) -> StoreResult<Option<Permission>>;
    async fn find_permission_by_name(&self, name: PermissionType)
        -> StoreResult<Option<Permission>>;
    async fn permission_name_taken(
        &self,
        name: PermissionType,
        except: Option<Uuid>,
    ) -> StoreResult<bool>;
    async fn insert_permission(&self, permission: &PermissionDraft) -> StoreResult<Permission>;
    async fn update_permission(
        &self,
        id: Uuid,
        permission: &PermissionDraft,
    ) -> StoreResult<Permission>;
    async fn delete_permission(&self, id: Uuid) -> StoreResult<()>;
    /// Users holding the permission as a direct grant.
    async fn count_direct_holders(&self, permission_id: Uuid) -> StoreResult<u64>;

    async fn role_has_permission(&self, role_id: Uuid, permission_id: Uuid) -> StoreResult<bool>;
    async fn attach_role_permission(&self, role_id: Uuid, permission_id: Uuid) -> StoreResult<()>;
    async fn detach_role_permission(&self, role_id: Uuid, permission_id: Uuid) -> StoreResult<()>;
    async fn list_role_permissions(&self, role_id: Uuid) -> StoreResult<Vec<Permission>>;

    async fn user_has_permission(&self, user_id: Uuid, permission_id: Uuid) -> StoreResult<bool>;
    async fn attach_user_permission(&self, user_id: Uuid, permission_id: Uuid) -> StoreResult<()>;
    async fn detach_user_permission(&self, user_id: Uuid, permission_id: Uuid) -> StoreResult<()>;
    async fn list_user_permissions(&self, user_id: Uuid) -> StoreResult<Vec<Permission>>;

    /// Cars that are not soft-deleted, optionally narrowed to one status.
    async fn list_cars(&self, status: Option<CarStatus>) -> StoreResult<Vec<Car>>;
    async fn get_car(&self, id: Uuid) -> StoreResult<Option<Car>>;
    async fn serial_taken(&self, serial_number: &str, except: Option<Uuid>) -> StoreResult<bool>;
    async fn insert_car(&self, car: &CarDraft, created_by: Option<Uuid>) -> StoreResult<Car>;
    async fn update_car(
        &self,
        id: Uuid,
        car: &CarDraft,
        updated_by: Option<Uuid>,
    ) -> StoreResult<Car>;
    async fn soft_delete_car(&self, id: Uuid, deleted_by: Option<Uuid>) -> StoreResult<()>;

    /// Messages sent or received by `participant`, or all of them.
    async fn list_messages(&self, participant: Option<Uuid>) -> StoreResult<Vec<Message>>;
    async fn get_message(&self, id: Uuid) -> StoreResult<Option<Message>>;
    async fn insert_message(&self, message: &MessageDraft) -> StoreResult<Message>;
    async fn update_message(&self, id: Uuid, message: &MessageDraft) -> StoreResult<Message>;
    async fn delete_message(&self, id: Uuid) -> StoreResult<()>;

    async fn list_activity_logs(&self, user_id: Option<Uuid>) -> StoreResult<Vec<ActivityLog>>;
    async fn get_activity_log(&self, id: Uuid) -> StoreResult<Option<ActivityLog>>;
    async fn insert_activity_log(&self, log: &ActivityLogDraft) -> StoreResult<ActivityLog>;
    async fn update_activity_log(
        &self,
        id: Uuid,
        log: &ActivityLogDraft,
    ) -> StoreResult<ActivityLog>;
    async fn delete_activity_log(&self, id: Uuid) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}
