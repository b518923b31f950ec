//! Raw database rows. Enumerations are stored as TEXT and parsed on the way
//! out, so a row the model cannot represent surfaces as an unexpected error.
use std::str::FromStr;

use anyhow::anyhow;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, StoreResult};
use crate::model::{ActivityLog, Car, Message, Permission, Role, User};

fn parse<T>(column: &str, raw: &str) -> StoreResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    T::from_str(raw).map_err(|e| StoreError::Unexpected(anyhow!("bad {} column: {}", column, e)))
}

fn parse_opt<T>(column: &str, raw: Option<&str>) -> StoreResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|r| parse(column, r)).transpose()
}

pub(super) const USER_COLUMNS: &str = "id, name, email, email_verified_at, password_hash, phone, \
     address, profile_image, status, role_id, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(super) struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub email_verified_at: Option<OffsetDateTime>,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<String>,
    pub status: String,
    pub role_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            email_verified_at: row.email_verified_at,
            password_hash: row.password_hash,
            phone: row.phone,
            address: row.address,
            profile_image: row.profile_image,
            status: parse("users.status", &row.status)?,
            role_id: row.role_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(super) const ROLE_COLUMNS: &str = "id, name, description, created_at, updated_at, deleted_at";

#[derive(Debug, FromRow)]
pub(super) struct RoleRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl TryFrom<RoleRow> for Role {
    type Error = StoreError;

    fn try_from(row: RoleRow) -> StoreResult<Self> {
        Ok(Role {
            id: row.id,
            name: parse("roles.name", &row.name)?,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

pub(super) const PERMISSION_COLUMNS: &str = "id, name, description, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(super) struct PermissionRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<PermissionRow> for Permission {
    type Error = StoreError;

    fn try_from(row: PermissionRow) -> StoreResult<Self> {
        Ok(Permission {
            id: row.id,
            name: parse("permissions.name", &row.name)?,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `price` is NUMERIC(10,2) in the table and read back as float8.
pub(super) const CAR_COLUMNS: &str = "id, serial_number, brand, model, year, drive_type, color, \
     image, price::float8 AS price, mileage, fuel_type, transmission, engine, seats, doors, \
     status, created_by, updated_by, deleted_by, created_at, updated_at, deleted_at";

#[derive(Debug, FromRow)]
pub(super) struct CarRow {
    pub id: Uuid,
    pub serial_number: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub drive_type: Option<String>,
    pub color: Option<String>,
    pub image: Option<String>,
    pub price: f64,
    pub mileage: i64,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub engine: Option<String>,
    pub seats: i32,
    pub doors: i32,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub deleted_by: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl TryFrom<CarRow> for Car {
    type Error = StoreError;

    fn try_from(row: CarRow) -> StoreResult<Self> {
        Ok(Car {
            id: row.id,
            serial_number: row.serial_number,
            brand: row.brand,
            model: row.model,
            year: row.year,
            drive_type: parse_opt("cars.drive_type", row.drive_type.as_deref())?,
            color: row.color,
            image: row.image,
            price: row.price,
            mileage: row.mileage,
            fuel_type: parse_opt("cars.fuel_type", row.fuel_type.as_deref())?,
            transmission: parse_opt("cars.transmission", row.transmission.as_deref())?,
            engine: parse_opt("cars.engine", row.engine.as_deref())?,
            seats: row.seats,
            doors: row.doors,
            status: parse("cars.status", &row.status)?,
            created_by: row.created_by,
            updated_by: row.updated_by,
            deleted_by: row.deleted_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

pub(super) const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, content, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(super) struct MessageRow {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(super) const ACTIVITY_LOG_COLUMNS: &str =
    "id, user_id, action, description, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(super) struct ActivityLogRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<ActivityLogRow> for ActivityLog {
    type Error = StoreError;

    fn try_from(row: ActivityLogRow) -> StoreResult<Self> {
        Ok(ActivityLog {
            id: row.id,
            user_id: row.user_id,
            action: parse("activity_logs.action", &row.action)?,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
