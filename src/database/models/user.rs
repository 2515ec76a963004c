use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::error::ApiError;

use super::validate::{trimmed, Validator, EMAIL_RE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "publisher" => Some(Role::Publisher),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(&value).ok_or_else(|| format!("unknown role '{}'", value))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub reset_password_token: Option<String>,
    #[serde(skip)]
    pub reset_password_expire: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Body of register and admin user creation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Body of profile and admin user updates
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// A validated user ready for insertion; the password is still plain text
#[derive(Debug, Clone)]
pub struct ValidUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

fn password_ok(password: Option<&str>) -> bool {
    password.is_some_and(|p| (8..=64).contains(&p.chars().count()))
}

fn role_allowed(role: Option<&str>, allow_admin: bool) -> bool {
    match role.map(Role::parse) {
        None => true,
        Some(Some(Role::Admin)) => allow_admin,
        Some(Some(_)) => true,
        Some(None) => false,
    }
}

impl NewUser {
    /// Self-registration never grants `admin`
    pub fn validate(&self, allow_admin: bool) -> Result<ValidUser, ApiError> {
        let name = trimmed(&self.name);
        let email = trimmed(&self.email).map(|e| e.to_lowercase());

        Validator::new()
            .required(name.as_deref(), "name is required")
            .max_chars(name.as_deref(), 30, "name can not be more than 30 characters long.")
            .required(email.as_deref(), "email is required")
            .matches(email.as_deref(), &EMAIL_RE, "email is not valid")
            .check(self.password.is_some(), "password is required")
            .check(
                self.password.is_none() || password_ok(self.password.as_deref()),
                "password must be between 8 to 64 characters.",
            )
            .check(
                role_allowed(self.role.as_deref(), allow_admin),
                format!("role '{}' is not allowed", self.role.as_deref().unwrap_or_default()),
            )
            .finish()?;

        Ok(ValidUser {
            name: name.unwrap_or_default(),
            email: email.unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            role: self.role.as_deref().and_then(Role::parse).unwrap_or(Role::User),
        })
    }
}

impl UserChanges {
    pub fn validate(&self, allow_role: bool) -> Result<Self, ApiError> {
        let name = trimmed(&self.name);
        let email = trimmed(&self.email).map(|e| e.to_lowercase());

        Validator::new()
            .check(name.as_deref().map_or(true, |n| !n.is_empty()), "name is required")
            .max_chars(name.as_deref(), 30, "name can not be more than 30 characters long.")
            .matches(email.as_deref(), &EMAIL_RE, "email is not valid")
            .check(allow_role || self.role.is_none(), "role can not be changed here")
            .check(
                role_allowed(self.role.as_deref(), true),
                format!("role '{}' is not allowed", self.role.as_deref().unwrap_or_default()),
            )
            .finish()?;

        Ok(Self { name, email, role: self.role.clone() })
    }
}

/// Login body checks
pub fn validate_login(email: Option<&str>, password: Option<&str>) -> Result<(), ApiError> {
    Validator::new()
        .check(email.is_some_and(|e| EMAIL_RE.is_match(e.trim())), "email is not valid.")
        .check(password_ok(password), "password must be between 8 to 64 characters.")
        .finish()
}

pub fn validate_password(password: Option<&str>) -> Result<(), ApiError> {
    Validator::new()
        .check(password_ok(password), "password must be between 8 to 64 characters.")
        .finish()
}

const COLUMNS: &str = "id, name, email, role, password, reset_password_token, reset_password_expire, created_at";

impl User {
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(ex: E, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(ex).await?)
    }

    pub async fn find_by_email<'e, E: PgExecutor<'e>>(ex: E, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(ex)
            .await?)
    }

    /// User holding an unexpired reset token with this digest
    pub async fn find_by_reset_token<'e, E: PgExecutor<'e>>(
        ex: E,
        hashed: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM users WHERE reset_password_token = $1 AND reset_password_expire > $2",
            COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(hashed)
            .bind(now)
            .fetch_optional(ex)
            .await?)
    }

    pub async fn insert<'e, E: PgExecutor<'e>>(
        ex: E,
        user: &ValidUser,
        password_hash: &str,
    ) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (name, email, role, password) VALUES ($1, $2, $3, $4) RETURNING {}",
            COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.role.as_str())
            .bind(password_hash)
            .fetch_one(ex)
            .await?)
    }

    pub async fn update<'e, E: PgExecutor<'e>>(
        ex: E,
        id: Uuid,
        changes: &UserChanges,
    ) -> Result<Option<User>, DatabaseError> {
        let sql = format!(
            "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), role = COALESCE($4, role) \
             WHERE id = $1 RETURNING {}",
            COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.name.as_deref())
            .bind(changes.email.as_deref())
            .bind(changes.role.as_deref())
            .fetch_optional(ex)
            .await?)
    }

    /// Sets a new password hash and clears any pending reset token
    pub async fn set_password<'e, E: PgExecutor<'e>>(ex: E, id: Uuid, password_hash: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE users SET password = $2, reset_password_token = NULL, reset_password_expire = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(ex)
        .await?;
        Ok(())
    }

    pub async fn set_reset_token<'e, E: PgExecutor<'e>>(
        ex: E,
        id: Uuid,
        token: Option<(&str, DateTime<Utc>)>,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET reset_password_token = $2, reset_password_expire = $3 WHERE id = $1")
            .bind(id)
            .bind(token.map(|(hashed, _)| hashed))
            .bind(token.map(|(_, expires)| expires))
            .execute(ex)
            .await?;
        Ok(())
    }

    /// Cascades to the user's bootcamps, courses and reviews
    pub async fn delete<'e, E: PgExecutor<'e>>(ex: E, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(ex).await?;
        Ok(result.rows_affected() > 0)
    }
}
