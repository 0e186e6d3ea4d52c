use std::collections::HashMap;
use std::sync::Mutex;

use axum::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. The password hash and the refresh-token
/// reference never serialize.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub refresh_token_ref: String,
    pub created_at: OffsetDateTime,
}

/// Fields supplied by the signup flow; id and created_at are assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub refresh_token_ref: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return StoreError::DuplicateEmail;
            }
        }
        StoreError::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Exact-match lookup; email comparison is case-sensitive.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// Single-row atomic compare-and-set of the refresh-token reference.
    /// Ok(false) means the stored reference no longer matched `expected`
    /// (a concurrent rotation won, or the user is gone).
    async fn compare_and_set_refresh_ref(
        &self,
        id: Uuid,
        expected: &str,
        new_ref: &str,
    ) -> Result<bool, StoreError>;
}

pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, refresh_token_ref, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, refresh_token_ref, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, refresh_token_ref)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, refresh_token_ref, created_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.refresh_token_ref)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn compare_and_set_refresh_ref(
        &self,
        id: Uuid,
        expected: &str,
        new_ref: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_ref = $3
            WHERE id = $1 AND refresh_token_ref = $2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(new_ref)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

/// In-memory store backing `AppState::fake()` and the flow tests. Same
/// contract as the Postgres store, including CAS semantics.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let record = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            refresh_token_ref: user.refresh_token_ref,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn compare_and_set_refresh_ref(
        &self,
        id: Uuid,
        expected: &str,
        new_ref: &str,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&id) {
            Some(user) if user.refresh_token_ref == expected => {
                user.refresh_token_ref = new_ref.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
