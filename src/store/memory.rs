//! In-memory implementation of [`Store`].
//!
//! All tables live in one [`State`] behind a single `tokio::sync::RwLock`, so
//! every write (including its uniqueness check) is atomic with respect to
//! every other write. State is lost on restart; this backend serves tests and
//! runs without `DATABASE_URL`.
//!
//! Deletes mirror the foreign keys of the Postgres schema: removing a user
//! drops its direct grants, messages and activity logs and nulls its car
//! references; removing a permission drops its join rows.
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewUser, Store, StoreError, StoreResult, UserUpdate};
use crate::model::{
    ActivityLog, Car, CarStatus, Message, Permission, PermissionType, Role, RoleType, User,
    UserStatus,
};
use crate::validation::{ActivityLogDraft, CarDraft, MessageDraft, PermissionDraft, RoleDraft};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    roles: HashMap<Uuid, Role>,
    permissions: HashMap<Uuid, Permission>,
    /// (role_id, permission_id)
    role_permission: BTreeSet<(Uuid, Uuid)>,
    /// (permission_id, user_id)
    permission_user: BTreeSet<(Uuid, Uuid)>,
    cars: HashMap<Uuid, Car>,
    messages: HashMap<Uuid, Message>,
    activity_logs: HashMap<Uuid, ActivityLog>,
}

impl State {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn role_name_taken(&self, name: RoleType, except: Option<Uuid>) -> bool {
        self.roles
            .values()
            .any(|r| r.name == name && Some(r.id) != except)
    }

    fn permission_name_taken(&self, name: PermissionType, except: Option<Uuid>) -> bool {
        self.permissions
            .values()
            .any(|p| p.name == name && Some(p.id) != except)
    }

    fn serial_taken(&self, serial: &str, except: Option<Uuid>) -> bool {
        self.cars
            .values()
            .any(|c| c.serial_number == serial && Some(c.id) != except)
    }

    fn live_role(&self, id: Uuid) -> Option<&Role> {
        self.roles.get(&id).filter(|r| r.deleted_at.is_none())
    }

    fn user_mut(&mut self, id: Uuid) -> StoreResult<&mut User> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))
    }

    fn require_user(&self, id: Uuid) -> StoreResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("user {}", id)))
        }
    }

    fn require_role(&self, id: Uuid) -> StoreResult<()> {
        match self.live_role(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("role {}", id))),
        }
    }

    fn require_permission(&self, id: Uuid) -> StoreResult<()> {
        if self.permissions.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("permission {}", id)))
        }
    }

    fn permissions_in<'a>(&self, ids: impl Iterator<Item = &'a Uuid>) -> Vec<Permission> {
        let mut out: Vec<Permission> = ids
            .filter_map(|id| self.permissions.get(id).cloned())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

fn by_created<T>(items: &mut [T], created_at: impl Fn(&T) -> OffsetDateTime) {
    items.sort_by_key(|item| created_at(item));
}

fn car_from_draft(id: Uuid, draft: &CarDraft, created_by: Option<Uuid>) -> Car {
    let ts = now();
    Car {
        id,
        serial_number: draft.serial_number.clone(),
        brand: draft.brand.clone(),
        model: draft.model.clone(),
        year: draft.year,
        drive_type: draft.drive_type,
        color: draft.color.clone(),
        image: draft.image.clone(),
        price: draft.price,
        mileage: draft.mileage,
        fuel_type: draft.fuel_type,
        transmission: draft.transmission,
        engine: draft.engine,
        seats: draft.seats,
        doors: draft.doors,
        status: draft.status,
        created_by,
        updated_by: None,
        deleted_by: None,
        created_at: ts,
        updated_at: ts,
        deleted_at: None,
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        by_created(&mut users, |u| u.created_at);
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> StoreResult<bool> {
        Ok(self.state.read().await.email_taken(email, except))
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.email_taken(&user.email, None) {
            return Err(StoreError::Conflict(format!("email {} exists", user.email)));
        }
        state.require_role(user.role_id)?;
        let ts = now();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            email_verified_at: None,
            password_hash: user.password_hash,
            phone: user.phone,
            address: user.address,
            profile_image: user.profile_image,
            status: user.status,
            role_id: user.role_id,
            created_at: ts,
            updated_at: ts,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.email_taken(&update.email, Some(id)) {
            return Err(StoreError::Conflict(format!("email {} exists", update.email)));
        }
        state.require_role(update.role_id)?;
        let user = state.user_mut(id)?;
        user.name = update.name;
        user.email = update.email;
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
        }
        user.phone = update.phone;
        user.address = update.address;
        user.profile_image = update.profile_image;
        user.status = update.status;
        user.role_id = update.role_id;
        user.updated_at = now();
        Ok(user.clone())
    }

    async fn set_user_status(&self, id: Uuid, status: UserStatus) -> StoreResult<User> {
        let mut state = self.state.write().await;
        let user = state.user_mut(id)?;
        user.status = status;
        user.updated_at = now();
        Ok(user.clone())
    }

    async fn set_user_role(&self, id: Uuid, role_id: Uuid) -> StoreResult<User> {
        let mut state = self.state.write().await;
        state.require_role(role_id)?;
        let user = state.user_mut(id)?;
        user.role_id = role_id;
        user.updated_at = now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("user {}", id)));
        }
        state.permission_user.retain(|(_, user_id)| *user_id != id);
        state
            .messages
            .retain(|_, m| m.sender_id != id && m.receiver_id != id);
        state.activity_logs.retain(|_, l| l.user_id != id);
        for car in state.cars.values_mut() {
            for slot in [&mut car.created_by, &mut car.updated_by, &mut car.deleted_by] {
                if *slot == Some(id) {
                    *slot = None;
                }
            }
        }
        Ok(())
    }

    async fn count_users_with_role(&self, role_id: Uuid) -> StoreResult<u64> {
        let state = self.state.read().await;
        Ok(state.users.values().filter(|u| u.role_id == role_id).count() as u64)
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|r| r.deleted_at.is_none())
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn get_role(&self, id: Uuid) -> StoreResult<Option<Role>> {
        Ok(self.state.read().await.live_role(id).cloned())
    }

    async fn find_role_by_name(&self, name: RoleType) -> StoreResult<Option<Role>> {
        let state = self.state.read().await;
        Ok(state
            .roles
            .values()
            .find(|r| r.name == name && r.deleted_at.is_none())
            .cloned())
    }

    async fn role_name_taken(&self, name: RoleType, except: Option<Uuid>) -> StoreResult<bool> {
        Ok(self.state.read().await.role_name_taken(name, except))
    }

    async fn insert_role(&self, role: &RoleDraft) -> StoreResult<Role> {
        let mut state = self.state.write().await;
        if state.role_name_taken(role.name, None) {
            return Err(StoreError::Conflict(format!("role {} exists", role.name)));
        }
        let ts = now();
        let role = Role {
            id: Uuid::new_v4(),
            name: role.name,
            description: role.description.clone(),
            created_at: ts,
            updated_at: ts,
            deleted_at: None,
        };
        state.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn update_role(&self, id: Uuid, draft: &RoleDraft) -> StoreResult<Role> {
        let mut state = self.state.write().await;
        if state.role_name_taken(draft.name, Some(id)) {
            return Err(StoreError::Conflict(format!("role {} exists", draft.name)));
        }
        let role = state
            .roles
            .get_mut(&id)
            .filter(|r| r.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound(format!("role {}", id)))?;
        role.name = draft.name;
        role.description = draft.description.clone();
        role.updated_at = now();
        Ok(role.clone())
    }

    async fn soft_delete_role(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let role = state
            .roles
            .get_mut(&id)
            .filter(|r| r.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound(format!("role {}", id)))?;
        role.deleted_at = Some(now());
        Ok(())
    }

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        let state = self.state.read().await;
        Ok(state.permissions_in(state.permissions.keys()))
    }

    async fn get_permission(&self, id: Uuid) -> StoreResult<Option<Permission>> {
        Ok(self.state.read().await.permissions.get(&id).cloned())
    }

    async fn find_permission_by_name(
        &self,
        name: PermissionType,
    ) -> StoreResult<Option<Permission>> {
        let state = self.state.read().await;
        Ok(state.permissions.values().find(|p| p.name == name).cloned())
    }

    async fn permission_name_taken(
        &self,
        name: PermissionType,
        except: Option<Uuid>,
    ) -> StoreResult<bool> {
        Ok(self.state.read().await.permission_name_taken(name, except))
    }

    async fn insert_permission(&self, draft: &PermissionDraft) -> StoreResult<Permission> {
        let mut state = self.state.write().await;
        if state.permission_name_taken(draft.name, None) {
            return Err(StoreError::Conflict(format!(
                "permission {} exists",
                draft.name
            )));
        }
        let ts = now();
        let permission = Permission {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description.clone(),
            created_at: ts,
            updated_at: ts,
        };
        state.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn update_permission(&self, id: Uuid, draft: &PermissionDraft) -> StoreResult<Permission> {
        let mut state = self.state.write().await;
        if state.permission_name_taken(draft.name, Some(id)) {
            return Err(StoreError::Conflict(format!(
                "permission {} exists",
                draft.name
            )));
        }
        let permission = state
            .permissions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("permission {}", id)))?;
        permission.name = draft.name;
        permission.description = draft.description.clone();
        permission.updated_at = now();
        Ok(permission.clone())
    }

    async fn delete_permission(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.permissions.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("permission {}", id)));
        }
        state.role_permission.retain(|(_, p)| *p != id);
        state.permission_user.retain(|(p, _)| *p != id);
        Ok(())
    }

    async fn count_direct_holders(&self, permission_id: Uuid) -> StoreResult<u64> {
        let state = self.state.read().await;
        Ok(state
            .permission_user
            .iter()
            .filter(|(p, _)| *p == permission_id)
            .count() as u64)
    }

    async fn role_has_permission(&self, role_id: Uuid, permission_id: Uuid) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state.role_permission.contains(&(role_id, permission_id)))
    }

    async fn attach_role_permission(&self, role_id: Uuid, permission_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.require_role(role_id)?;
        state.require_permission(permission_id)?;
        if !state.role_permission.insert((role_id, permission_id)) {
            return Err(StoreError::Conflict("role already holds permission".into()));
        }
        Ok(())
    }

    async fn detach_role_permission(&self, role_id: Uuid, permission_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.role_permission.remove(&(role_id, permission_id));
        Ok(())
    }

    async fn list_role_permissions(&self, role_id: Uuid) -> StoreResult<Vec<Permission>> {
        let state = self.state.read().await;
        let ids = state
            .role_permission
            .iter()
            .filter(|(r, _)| *r == role_id)
            .map(|(_, p)| p);
        Ok(state.permissions_in(ids))
    }

    async fn user_has_permission(&self, user_id: Uuid, permission_id: Uuid) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state.permission_user.contains(&(permission_id, user_id)))
    }

    async fn attach_user_permission(&self, user_id: Uuid, permission_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.require_user(user_id)?;
        state.require_permission(permission_id)?;
        if !state.permission_user.insert((permission_id, user_id)) {
            return Err(StoreError::Conflict("user already holds permission".into()));
        }
        Ok(())
    }

    async fn detach_user_permission(&self, user_id: Uuid, permission_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.permission_user.remove(&(permission_id, user_id));
        Ok(())
    }

    async fn list_user_permissions(&self, user_id: Uuid) -> StoreResult<Vec<Permission>> {
        let state = self.state.read().await;
        let ids = state
            .permission_user
            .iter()
            .filter(|(_, u)| *u == user_id)
            .map(|(p, _)| p);
        Ok(state.permissions_in(ids))
    }

    async fn list_cars(&self, status: Option<CarStatus>) -> StoreResult<Vec<Car>> {
        let state = self.state.read().await;
        let mut cars: Vec<Car> = state
            .cars
            .values()
            .filter(|c| c.deleted_at.is_none())
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        by_created(&mut cars, |c| c.created_at);
        Ok(cars)
    }

    async fn get_car(&self, id: Uuid) -> StoreResult<Option<Car>> {
        let state = self.state.read().await;
        Ok(state
            .cars
            .get(&id)
            .filter(|c| c.deleted_at.is_none())
            .cloned())
    }

    async fn serial_taken(&self, serial_number: &str, except: Option<Uuid>) -> StoreResult<bool> {
        Ok(self.state.read().await.serial_taken(serial_number, except))
    }

    async fn insert_car(&self, draft: &CarDraft, created_by: Option<Uuid>) -> StoreResult<Car> {
        let mut state = self.state.write().await;
        if state.serial_taken(&draft.serial_number, None) {
            return Err(StoreError::Conflict(format!(
                "car {} exists",
                draft.serial_number
            )));
        }
        let car = car_from_draft(Uuid::new_v4(), draft, created_by);
        state.cars.insert(car.id, car.clone());
        Ok(car)
    }

    async fn update_car(
        &self,
        id: Uuid,
        draft: &CarDraft,
        updated_by: Option<Uuid>,
    ) -> StoreResult<Car> {
        let mut state = self.state.write().await;
        if state.serial_taken(&draft.serial_number, Some(id)) {
            return Err(StoreError::Conflict(format!(
                "car {} exists",
                draft.serial_number
            )));
        }
        let existing = state
            .cars
            .get_mut(&id)
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound(format!("car {}", id)))?;
        let mut car = car_from_draft(id, draft, existing.created_by);
        car.created_at = existing.created_at;
        car.updated_by = updated_by;
        *existing = car.clone();
        Ok(car)
    }

    async fn soft_delete_car(&self, id: Uuid, deleted_by: Option<Uuid>) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let car = state
            .cars
            .get_mut(&id)
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound(format!("car {}", id)))?;
        car.deleted_by = deleted_by;
        car.deleted_at = Some(now());
        Ok(())
    }

    async fn list_messages(&self, participant: Option<Uuid>) -> StoreResult<Vec<Message>> {
        let state = self.state.read().await;
        let mut messages: Vec<Message> = state
            .messages
            .values()
            .filter(|m| participant.map_or(true, |p| m.sender_id == p || m.receiver_id == p))
            .cloned()
            .collect();
        by_created(&mut messages, |m| m.created_at);
        Ok(messages)
    }

    async fn get_message(&self, id: Uuid) -> StoreResult<Option<Message>> {
        Ok(self.state.read().await.messages.get(&id).cloned())
    }

    async fn insert_message(&self, draft: &MessageDraft) -> StoreResult<Message> {
        let mut state = self.state.write().await;
        state.require_user(draft.sender_id)?;
        state.require_user(draft.receiver_id)?;
        let ts = now();
        let message = Message {
            id: Uuid::new_v4(),
            sender_id: draft.sender_id,
            receiver_id: draft.receiver_id,
            content: draft.content.clone(),
            created_at: ts,
            updated_at: ts,
        };
        state.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn update_message(&self, id: Uuid, draft: &MessageDraft) -> StoreResult<Message> {
        let mut state = self.state.write().await;
        state.require_user(draft.sender_id)?;
        state.require_user(draft.receiver_id)?;
        let message = state
            .messages
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("message {}", id)))?;
        message.sender_id = draft.sender_id;
        message.receiver_id = draft.receiver_id;
        message.content = draft.content.clone();
        message.updated_at = now();
        Ok(message.clone())
    }

    async fn delete_message(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.messages.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("message {}", id))),
        }
    }

    async fn list_activity_logs(&self, user_id: Option<Uuid>) -> StoreResult<Vec<ActivityLog>> {
        let state = self.state.read().await;
        let mut logs: Vec<ActivityLog> = state
            .activity_logs
            .values()
            .filter(|l| user_id.map_or(true, |u| l.user_id == u))
            .cloned()
            .collect();
        by_created(&mut logs, |l| l.created_at);
        Ok(logs)
    }

    async fn get_activity_log(&self, id: Uuid) -> StoreResult<Option<ActivityLog>> {
        Ok(self.state.read().await.activity_logs.get(&id).cloned())
    }

    async fn insert_activity_log(&self, draft: &ActivityLogDraft) -> StoreResult<ActivityLog> {
        let mut state = self.state.write().await;
        state.require_user(draft.user_id)?;
        let ts = now();
        let log = ActivityLog {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            action: draft.action,
            description: draft.description.clone(),
            created_at: ts,
            updated_at: ts,
        };
        state.activity_logs.insert(log.id, log.clone());
        Ok(log)
    }

    async fn update_activity_log(
        &self,
        id: Uuid,
        draft: &ActivityLogDraft,
    ) -> StoreResult<ActivityLog> {
        let mut state = self.state.write().await;
        state.require_user(draft.user_id)?;
        let log = state
            .activity_logs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("activity log {}", id)))?;
        log.user_id = draft.user_id;
        log.action = draft.action;
        log.description = draft.description.clone();
        log.updated_at = now();
        Ok(log.clone())
    }

    async fn delete_activity_log(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.activity_logs.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("activity log {}", id))),
        }
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
