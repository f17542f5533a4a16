//! Database operations for `users`.

use chrono::{DateTime, Utc};
use harmony_core::{normalize_email, Role, User};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{is_unique_violation, DbError};

const EMAIL_CONSTRAINT: &str = "users_email_key";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `users` table, including the password hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    /// Drops the password hash and parses the role.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Core`] if the stored role is not a known value.
    pub fn into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: self.id,
            role: self.role.parse::<Role>()?,
            name: self.name,
            email: self.email,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl UserUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

fn map_email_conflict(err: sqlx::Error) -> DbError {
    if is_unique_violation(&err, EMAIL_CONSTRAINT) {
        DbError::EmailTaken
    } else {
        DbError::Sqlx(err)
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Inserts a user. The email is normalized before storage.
///
/// # Errors
///
/// Returns [`DbError::EmailTaken`] if the email is already registered, or
/// [`DbError::Sqlx`] on any other database failure.
pub async fn create_user(pool: &PgPool, new: &NewUser<'_>) -> Result<User, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO users (name, email, password_hash, role) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(new.name.trim())
    .bind(normalize_email(new.email))
    .bind(new.password_hash)
    .bind(new.role.as_str())
    .fetch_one(pool)
    .await
    .map_err(map_email_conflict)?;

    row.into_user()
}

/// Looks a user up by email for login. Returns the row with its hash.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(normalize_email(email))
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<Option<User>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(UserRow::into_user).transpose()
}

/// Lists users newest first, optionally restricted to one role.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_users(pool: &PgPool, role: Option<Role>) -> Result<Vec<User>, DbError> {
    let rows = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE ($1::text IS NULL OR role = $1) \
         ORDER BY created_at DESC"
    ))
    .bind(role.map(Role::as_str))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(UserRow::into_user).collect()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_users_by_role(pool: &PgPool, role: Role) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = $1")
        .bind(role.as_str())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Applies a partial update and returns the updated user.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no user has `id`, [`DbError::EmailTaken`]
/// if the new email collides, or [`DbError::Sqlx`] on other failures.
pub async fn update_user(pool: &PgPool, id: Uuid, update: &UserUpdate) -> Result<User, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "UPDATE users SET \
             name = COALESCE($2, name), \
             email = COALESCE($3, email), \
             password_hash = COALESCE($4, password_hash), \
             role = COALESCE($5, role), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(update.name.as_deref().map(str::trim))
    .bind(update.email.as_deref().map(normalize_email))
    .bind(update.password_hash.as_deref())
    .bind(update.role.map(Role::as_str))
    .fetch_optional(pool)
    .await
    .map_err(map_email_conflict)?
    .ok_or(DbError::NotFound)?;

    row.into_user()
}

/// Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_user(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Creates a superadmin, or promotes and re-keys an existing account with
/// the same email.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_superadmin(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO users (name, email, password_hash, role) \
         VALUES ($1, $2, $3, 'superadmin') \
         ON CONFLICT (email) DO UPDATE SET \
             name = EXCLUDED.name, \
             password_hash = EXCLUDED.password_hash, \
             role = 'superadmin', \
             updated_at = NOW() \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(name.trim())
    .bind(normalize_email(email))
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    row.into_user()
}
