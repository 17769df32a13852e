//! User and access token repositories

use chrono::Utc;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::domain::{AccessToken, User};
use crate::storage::Database;
use crate::{Error, Result};

const USER_COLUMNS: &str = "id, full_name, email, password_hash, created_at, updated_at";

/// User repository for database operations
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new user; a taken email becomes [`Error::Conflict`]
    pub async fn create(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, full_name, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.db.pool())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let err = Error::from(e);
                if err.is_unique_violation() {
                    Err(Error::Conflict("A user with this email already exists".to_string()))
                } else {
                    Err(err)
                }
            }
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|r| self.row_to_user(r)))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|r| self.row_to_user(r)))
    }

    pub async fn update_name(&self, id: Uuid, full_name: &str) -> Result<()> {
        sqlx::query("UPDATE users SET full_name = $1, updated_at = $2 WHERE id = $3")
            .bind(full_name)
            .bind(Utc::now())
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    fn row_to_user(&self, row: PgRow) -> User {
        User {
            id: row.get("id"),
            full_name: row.get("full_name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// Access token repository; tokens are looked up by their SHA-256 hex
pub struct AccessTokenRepository<'a> {
    db: &'a Database,
}

impl<'a> AccessTokenRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, token: &AccessToken) -> Result<()> {
        sqlx::query("INSERT INTO access_tokens (token, email, expires_at) VALUES ($1, $2, $3)")
            .bind(&token.token)
            .bind(&token.email)
            .bind(token.expires_at)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// Find a token that has not expired yet
    pub async fn find_valid(&self, token_hash: &str) -> Result<Option<AccessToken>> {
        let row = sqlx::query(
            "SELECT token, email, expires_at FROM access_tokens WHERE token = $1 AND expires_at > NOW()",
        )
        .bind(token_hash)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| AccessToken {
            token: r.get("token"),
            email: r.get("email"),
            expires_at: r.get("expires_at"),
        }))
    }

    /// Delete a token, returning whether it existed
    pub async fn delete(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE token = $1")
            .bind(token_hash)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every expired token
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE expires_at <= NOW()")
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
