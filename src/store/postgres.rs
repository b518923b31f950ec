//! Postgres implementation of [`Store`] on a sqlx pool.
//!
//! Unique indexes and composite primary keys in `migrations/` are the source
//! of truth for uniqueness: a `23505` from Postgres becomes
//! [`StoreError::Conflict`], a `23503` on a join table becomes
//! [`StoreError::NotFound`]. Cascades on user deletion are declared in the
//! schema as well.
use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::rows::{
    ActivityLogRow, CarRow, MessageRow, PermissionRow, RoleRow, UserRow, ACTIVITY_LOG_COLUMNS,
    CAR_COLUMNS, MESSAGE_COLUMNS, PERMISSION_COLUMNS, ROLE_COLUMNS, USER_COLUMNS,
};
use super::{NewUser, Store, StoreError, StoreResult, UserUpdate};
use crate::model::{
    ActivityLog, Car, CarStatus, Message, Permission, PermissionType, Role, RoleType, User,
    UserStatus,
};
use crate::validation::{ActivityLogDraft, CarDraft, MessageDraft, PermissionDraft, RoleDraft};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503"))
}

/// Maps a write error, naming what clashed or what was missing.
fn write_error(err: sqlx::Error, conflict: &str, missing: &str) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict(conflict.to_string())
    } else if is_foreign_key_violation(&err) {
        StoreError::NotFound(missing.to_string())
    } else {
        StoreError::Unexpected(err.into())
    }
}

fn unexpected(err: sqlx::Error) -> StoreError {
    StoreError::Unexpected(err.into())
}

fn collect<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn expect_affected(result: sqlx::postgres::PgQueryResult, what: String) -> StoreResult<()> {
    if result.rows_affected() == 0 {
        Err(StoreError::NotFound(what))
    } else {
        Ok(())
    }
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        info!("database migrations applied");
        Ok(())
    }

    async fn fetch_user(&self, sql: &str, id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(User::try_from)
            .transpose()
    }

    async fn exists(&self, sql: &str, a: Uuid, b: Uuid) -> StoreResult<bool> {
        let found: bool = sqlx::query_scalar(sql)
            .bind(a)
            .bind(b)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(found)
    }

    async fn count(&self, sql: &str, id: Uuid) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(n as u64)
    }

    async fn permissions_via(&self, sql: &str, id: Uuid) -> StoreResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        collect(rows)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        collect(rows)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        self.fetch_user(&sql, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(User::try_from)
            .transpose()
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> StoreResult<bool> {
        sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))"#,
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, phone, address, profile_image, status, role_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.phone)
            .bind(&user.address)
            .bind(&user.profile_image)
            .bind(user.status.as_str())
            .bind(user.role_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                write_error(
                    e,
                    &format!("email {} exists", user.email),
                    &format!("role {}", user.role_id),
                )
            })?;
        row.try_into()
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<User> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = $2, email = $3, password_hash = COALESCE($4, password_hash),
                phone = $5, address = $6, profile_image = $7, status = $8, role_id = $9,
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(&update.name)
            .bind(&update.email)
            .bind(&update.password_hash)
            .bind(&update.phone)
            .bind(&update.address)
            .bind(&update.profile_image)
            .bind(update.status.as_str())
            .bind(update.role_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                write_error(
                    e,
                    &format!("email {} exists", update.email),
                    &format!("role {}", update.role_id),
                )
            })?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
        row.try_into()
    }

    async fn set_user_status(&self, id: Uuid, status: UserStatus) -> StoreResult<User> {
        let sql = format!(
            "UPDATE users SET status = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?
            .try_into()
    }

    async fn set_user_role(&self, id: Uuid, role_id: Uuid) -> StoreResult<User> {
        let sql = format!(
            "UPDATE users SET role_id = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, "user role", &format!("role {}", role_id)))?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?
            .try_into()
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_affected(result, format!("user {}", id))
    }

    async fn count_users_with_role(&self, role_id: Uuid) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM users WHERE role_id = $1", role_id)
            .await
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let sql =
            format!("SELECT {ROLE_COLUMNS} FROM roles WHERE deleted_at IS NULL ORDER BY name");
        let rows = sqlx::query_as::<_, RoleRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        collect(rows)
    }

    async fn get_role(&self, id: Uuid) -> StoreResult<Option<Role>> {
        let sql =
            format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, RoleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(Role::try_from)
            .transpose()
    }

    async fn find_role_by_name(&self, name: RoleType) -> StoreResult<Option<Role>> {
        let sql =
            format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, RoleRow>(&sql)
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(Role::try_from)
            .transpose()
    }

    async fn role_name_taken(&self, name: RoleType, except: Option<Uuid>) -> StoreResult<bool> {
        sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM roles WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2))"#,
        )
        .bind(name.as_str())
        .bind(except)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn insert_role(&self, role: &RoleDraft) -> StoreResult<Role> {
        let sql = format!(
            "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING {ROLE_COLUMNS}"
        );
        sqlx::query_as::<_, RoleRow>(&sql)
            .bind(role.name.as_str())
            .bind(&role.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, &format!("role {} exists", role.name), "role"))?
            .try_into()
    }

    async fn update_role(&self, id: Uuid, role: &RoleDraft) -> StoreResult<Role> {
        let sql = format!(
            r#"
            UPDATE roles SET name = $2, description = $3, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {ROLE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, RoleRow>(&sql)
            .bind(id)
            .bind(role.name.as_str())
            .bind(&role.description)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, &format!("role {} exists", role.name), "role"))?
            .ok_or_else(|| StoreError::NotFound(format!("role {}", id)))?
            .try_into()
    }

    async fn soft_delete_role(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE roles SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        expect_affected(result, format!("role {}", id))
    }

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions ORDER BY name");
        let rows = sqlx::query_as::<_, PermissionRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        collect(rows)
    }

    async fn get_permission(&self, id: Uuid) -> StoreResult<Option<Permission>> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = $1");
        sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(Permission::try_from)
            .transpose()
    }

    async fn find_permission_by_name(
        &self,
        name: PermissionType,
    ) -> StoreResult<Option<Permission>> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE name = $1");
        sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(Permission::try_from)
            .transpose()
    }

    async fn permission_name_taken(
        &self,
        name: PermissionType,
        except: Option<Uuid>,
    ) -> StoreResult<bool> {
        sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM permissions WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2))"#,
        )
        .bind(name.as_str())
        .bind(except)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn insert_permission(&self, permission: &PermissionDraft) -> StoreResult<Permission> {
        let sql = format!(
            "INSERT INTO permissions (name, description) VALUES ($1, $2) RETURNING {PERMISSION_COLUMNS}"
        );
        sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(permission.name.as_str())
            .bind(&permission.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                write_error(
                    e,
                    &format!("permission {} exists", permission.name),
                    "permission",
                )
            })?
            .try_into()
    }

    async fn update_permission(
        &self,
        id: Uuid,
        permission: &PermissionDraft,
    ) -> StoreResult<Permission> {
        let sql = format!(
            r#"
            UPDATE permissions SET name = $2, description = $3, updated_at = now()
            WHERE id = $1
            RETURNING {PERMISSION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(id)
            .bind(permission.name.as_str())
            .bind(&permission.description)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                write_error(
                    e,
                    &format!("permission {} exists", permission.name),
                    "permission",
                )
            })?
            .ok_or_else(|| StoreError::NotFound(format!("permission {}", id)))?
            .try_into()
    }

    async fn delete_permission(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_affected(result, format!("permission {}", id))
    }

    async fn count_direct_holders(&self, permission_id: Uuid) -> StoreResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM permission_user WHERE permission_id = $1",
            permission_id,
        )
        .await
    }

    async fn role_has_permission(&self, role_id: Uuid, permission_id: Uuid) -> StoreResult<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM role_permission WHERE role_id = $1 AND permission_id = $2)",
            role_id,
            permission_id,
        )
        .await
    }

    async fn attach_role_permission(&self, role_id: Uuid, permission_id: Uuid) -> StoreResult<()> {
        sqlx::query("INSERT INTO role_permission (role_id, permission_id) VALUES ($1, $2)")
            .bind(role_id)
            .bind(permission_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                write_error(e, "role already holds permission", "role or permission")
            })?;
        Ok(())
    }

    async fn detach_role_permission(&self, role_id: Uuid, permission_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM role_permission WHERE role_id = $1 AND permission_id = $2")
            .bind(role_id)
            .bind(permission_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_role_permissions(&self, role_id: Uuid) -> StoreResult<Vec<Permission>> {
        self.permissions_via(
            r#"
            SELECT p.id, p.name, p.description, p.created_at, p.updated_at
            FROM permissions p
            JOIN role_permission rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.name
            "#,
            role_id,
        )
        .await
    }

    async fn user_has_permission(&self, user_id: Uuid, permission_id: Uuid) -> StoreResult<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM permission_user WHERE user_id = $1 AND permission_id = $2)",
            user_id,
            permission_id,
        )
        .await
    }

    async fn attach_user_permission(&self, user_id: Uuid, permission_id: Uuid) -> StoreResult<()> {
        sqlx::query("INSERT INTO permission_user (permission_id, user_id) VALUES ($1, $2)")
            .bind(permission_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                write_error(e, "user already holds permission", "user or permission")
            })?;
        Ok(())
    }

    async fn detach_user_permission(&self, user_id: Uuid, permission_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM permission_user WHERE user_id = $1 AND permission_id = $2")
            .bind(user_id)
            .bind(permission_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_user_permissions(&self, user_id: Uuid) -> StoreResult<Vec<Permission>> {
        self.permissions_via(
            r#"
            SELECT p.id, p.name, p.description, p.created_at, p.updated_at
            FROM permissions p
            JOIN permission_user pu ON pu.permission_id = p.id
            WHERE pu.user_id = $1
            ORDER BY p.name
            "#,
            user_id,
        )
        .await
    }

    async fn list_cars(&self, status: Option<CarStatus>) -> StoreResult<Vec<Car>> {
        let sql = format!(
            r#"
            SELECT {CAR_COLUMNS} FROM cars
            WHERE deleted_at IS NULL AND ($1::text IS NULL OR status = $1)
            ORDER BY created_at
            "#
        );
        let rows = sqlx::query_as::<_, CarRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        collect(rows)
    }

    async fn get_car(&self, id: Uuid) -> StoreResult<Option<Car>> {
        let sql = format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, CarRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(Car::try_from)
            .transpose()
    }

    async fn serial_taken(&self, serial_number: &str, except: Option<Uuid>) -> StoreResult<bool> {
        sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM cars WHERE serial_number = $1 AND ($2::uuid IS NULL OR id <> $2))"#,
        )
        .bind(serial_number)
        .bind(except)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn insert_car(&self, car: &CarDraft, created_by: Option<Uuid>) -> StoreResult<Car> {
        let sql = format!(
            r#"
            INSERT INTO cars (serial_number, brand, model, year, drive_type, color, image, price,
                              mileage, fuel_type, transmission, engine, seats, doors, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8::numeric(10,2), $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {CAR_COLUMNS}
            "#
        );
        sqlx::query_as::<_, CarRow>(&sql)
            .bind(&car.serial_number)
            .bind(&car.brand)
            .bind(&car.model)
            .bind(car.year)
            .bind(car.drive_type.map(|d| d.as_str()))
            .bind(&car.color)
            .bind(&car.image)
            .bind(car.price)
            .bind(car.mileage)
            .bind(car.fuel_type.map(|f| f.as_str()))
            .bind(car.transmission.map(|t| t.as_str()))
            .bind(car.engine.map(|e| e.as_str()))
            .bind(car.seats)
            .bind(car.doors)
            .bind(car.status.as_str())
            .bind(created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                write_error(e, &format!("car {} exists", car.serial_number), "user")
            })?
            .try_into()
    }

    async fn update_car(
        &self,
        id: Uuid,
        car: &CarDraft,
        updated_by: Option<Uuid>,
    ) -> StoreResult<Car> {
        let sql = format!(
            r#"
            UPDATE cars
            SET serial_number = $2, brand = $3, model = $4, year = $5, drive_type = $6, color = $7,
                image = $8, price = $9::numeric(10,2), mileage = $10, fuel_type = $11,
                transmission = $12, engine = $13, seats = $14, doors = $15, status = $16,
                updated_by = $17, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {CAR_COLUMNS}
            "#
        );
        sqlx::query_as::<_, CarRow>(&sql)
            .bind(id)
            .bind(&car.serial_number)
            .bind(&car.brand)
            .bind(&car.model)
            .bind(car.year)
            .bind(car.drive_type.map(|d| d.as_str()))
            .bind(&car.color)
            .bind(&car.image)
            .bind(car.price)
            .bind(car.mileage)
            .bind(car.fuel_type.map(|f| f.as_str()))
            .bind(car.transmission.map(|t| t.as_str()))
            .bind(car.engine.map(|e| e.as_str()))
            .bind(car.seats)
            .bind(car.doors)
            .bind(car.status.as_str())
            .bind(updated_by)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                write_error(e, &format!("car {} exists", car.serial_number), "user")
            })?
            .ok_or_else(|| StoreError::NotFound(format!("car {}", id)))?
            .try_into()
    }

    async fn soft_delete_car(&self, id: Uuid, deleted_by: Option<Uuid>) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE cars SET deleted_by = $2, deleted_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(deleted_by)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "car", "user"))?;
        expect_affected(result, format!("car {}", id))
    }

    async fn list_messages(&self, participant: Option<Uuid>) -> StoreResult<Vec<Message>> {
        let sql = format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE $1::uuid IS NULL OR sender_id = $1 OR receiver_id = $1
            ORDER BY created_at
            "#
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(participant)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn get_message(&self, id: Uuid) -> StoreResult<Option<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
        let row = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(row.map(Message::from))
    }

    async fn insert_message(&self, message: &MessageDraft) -> StoreResult<Message> {
        let sql = format!(
            r#"
            INSERT INTO messages (sender_id, receiver_id, content) VALUES ($1, $2, $3)
            RETURNING {MESSAGE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(message.sender_id)
            .bind(message.receiver_id)
            .bind(&message.content)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "message", "sender or receiver"))?;
        Ok(row.into())
    }

    async fn update_message(&self, id: Uuid, message: &MessageDraft) -> StoreResult<Message> {
        let sql = format!(
            r#"
            UPDATE messages SET sender_id = $2, receiver_id = $3, content = $4, updated_at = now()
            WHERE id = $1
            RETURNING {MESSAGE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(id)
            .bind(message.sender_id)
            .bind(message.receiver_id)
            .bind(&message.content)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, "message", "sender or receiver"))?
            .ok_or_else(|| StoreError::NotFound(format!("message {}", id)))?;
        Ok(row.into())
    }

    async fn delete_message(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_affected(result, format!("message {}", id))
    }

    async fn list_activity_logs(&self, user_id: Option<Uuid>) -> StoreResult<Vec<ActivityLog>> {
        let sql = format!(
            r#"
            SELECT {ACTIVITY_LOG_COLUMNS} FROM activity_logs
            WHERE $1::uuid IS NULL OR user_id = $1
            ORDER BY created_at
            "#
        );
        let rows = sqlx::query_as::<_, ActivityLogRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        collect(rows)
    }

    async fn get_activity_log(&self, id: Uuid) -> StoreResult<Option<ActivityLog>> {
        let sql = format!("SELECT {ACTIVITY_LOG_COLUMNS} FROM activity_logs WHERE id = $1");
        sqlx::query_as::<_, ActivityLogRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(ActivityLog::try_from)
            .transpose()
    }

    async fn insert_activity_log(&self, log: &ActivityLogDraft) -> StoreResult<ActivityLog> {
        let sql = format!(
            r#"
            INSERT INTO activity_logs (user_id, action, description) VALUES ($1, $2, $3)
            RETURNING {ACTIVITY_LOG_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ActivityLogRow>(&sql)
            .bind(log.user_id)
            .bind(log.action.as_str())
            .bind(&log.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "activity log", &format!("user {}", log.user_id)))?
            .try_into()
    }

    async fn update_activity_log(
        &self,
        id: Uuid,
        log: &ActivityLogDraft,
    ) -> StoreResult<ActivityLog> {
        let sql = format!(
            r#"
            UPDATE activity_logs SET user_id = $2, action = $3, description = $4, updated_at = now()
            WHERE id = $1
            RETURNING {ACTIVITY_LOG_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ActivityLogRow>(&sql)
            .bind(id)
            .bind(log.user_id)
            .bind(log.action.as_str())
            .bind(&log.description)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, "activity log", &format!("user {}", log.user_id)))?
            .ok_or_else(|| StoreError::NotFound(format!("activity log {}", id)))?
            .try_into()
    }

    async fn delete_activity_log(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM activity_logs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_affected(result, format!("activity log {}", id))
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
