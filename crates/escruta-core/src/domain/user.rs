//! Users and access tokens

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::Validator;
use crate::error::Result;

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A registered account
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.into(),
            email: normalize_email(&email.into()),
            password_hash: password_hash.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Emails are matched case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicUser {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

impl From<&User> for BasicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Stored bearer token; `token` holds the SHA-256 hex of the raw value
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.not_blank("fullName", self.full_name.as_deref())
            .not_blank("email", self.email.as_deref())
            .not_blank("password", self.password.as_deref());
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            v.email("email", email.trim());
        }
        if let Some(password) = self.password.as_deref().filter(|p| !p.trim().is_empty()) {
            v.min_len("password", password, MIN_PASSWORD_LENGTH);
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<()> {
        Validator::new()
            .not_blank("email", self.email.as_deref())
            .not_blank("password", self.password.as_deref())
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.not_blank("currentPassword", self.current_password.as_deref())
            .not_blank("newPassword", self.new_password.as_deref());
        if let Some(password) = self.new_password.as_deref().filter(|p| !p.trim().is_empty()) {
            v.min_len("newPassword", password, MIN_PASSWORD_LENGTH);
        }
        v.finish()
    }
}

/// Issued token and milliseconds until it expires
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub token: String,
    pub expires_in: i64,
}

/// Result of token introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Introspection {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Introspection {
    pub fn inactive() -> Self {
        Self {
            active: false,
            sub: None,
            exp: None,
        }
    }
}

impl From<&AccessToken> for Introspection {
    fn from(token: &AccessToken) -> Self {
        Self {
            active: true,
            sub: Some(token.email.clone()),
            exp: Some(token.expires_at.timestamp()),
        }
    }
}
