/// User lookup
///
/// The auth core only needs to find users by email or id and to insert new
/// ones. `PgUserRepository` backs this with Postgres; `InMemoryUserRepository`
/// serves local development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;
use uuid::Uuid;

use crate::auth::{IdentityClaims, Role};
use crate::error::{AppError, DatabaseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(UserStatus::Active),
            "INACTIVE" => Ok(UserStatus::Inactive),
            other => Err(format!("unknown user status: {}", other)),
        }
    }
}

/// Stored user record
#[derive(Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub status: UserStatus,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
        password_hash: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            role,
            status: UserStatus::Active,
            password_hash,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn claims(&self) -> IdentityClaims {
        IdentityClaims::new(self.id, self.email.clone(), self.role)
    }
}

// Hand-written so the password hash never reaches a log line
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// # Errors
    /// `DatabaseError::UniqueConstraintViolation` if the email is taken
    async fn insert(&self, user: &User) -> Result<(), AppError>;
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> AppError {
        AppError::Internal("user store lock poisoned".to_string())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        Ok(users.get(&id).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().map_err(|_| Self::poisoned())?;
        if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            )));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }
}

// ============================================================================
// Postgres
// ============================================================================

type UserRow = (Uuid, String, String, String, String, String, DateTime<Utc>);

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: UserRow) -> Result<User, AppError> {
    let (id, email, name, role, status, password_hash, created_at) = row;

    let role = role
        .parse::<Role>()
        .map_err(|e| AppError::Database(DatabaseError::Corrupt(e)))?;
    let status = status
        .parse::<UserStatus>()
        .map_err(|e| AppError::Database(DatabaseError::Corrupt(e)))?;

    Ok(User {
        id,
        email,
        name,
        role,
        status,
        password_hash,
        created_at,
    })
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, name, role, status, password_hash, created_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, name, role, status, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    async fn insert(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, role, status, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User::new(email, "Test User", Role::Employee, "$2b$04$hash".to_string())
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = InMemoryUserRepository::new();
        let user = user("john@example.com");
        repo.insert(&user).await.unwrap();

        let by_email = repo.find_by_email("john@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        let by_id = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "john@example.com");
    }

    #[tokio::test]
    async fn test_email_lookup_ignores_case() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&user("Jane@Example.com")).await.unwrap();

        assert!(repo.find_by_email("jane@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let repo = InMemoryUserRepository::new();

        assert!(repo.find_by_email("nobody@example.com").await.unwrap().is_none());
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&user("dup@example.com")).await.unwrap();

        let result = repo.insert(&user("DUP@example.com")).await;
        assert!(matches!(
            result,
            Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_)))
        ));
    }

    #[test]
    fn test_debug_hides_password_hash() {
        let rendered = format!("{:?}", user("x@example.com"));
        assert!(!rendered.contains("$2b$"));
    }

    #[test]
    fn test_row_with_unknown_role_is_corrupt() {
        let row: UserRow = (
            Uuid::new_v4(),
            "x@example.com".to_string(),
            "X".to_string(),
            "OWNER".to_string(),
            "ACTIVE".to_string(),
            "hash".to_string(),
            Utc::now(),
        );

        assert!(matches!(
            user_from_row(row),
            Err(AppError::Database(DatabaseError::Corrupt(_)))
        ));
    }

    #[test]
    fn test_status_text() {
        assert_eq!("INACTIVE".parse::<UserStatus>().unwrap(), UserStatus::Inactive);
        assert!("SUSPENDED".parse::<UserStatus>().is_err());
    }
}
