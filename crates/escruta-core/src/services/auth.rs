//! Registration, login and bearer tokens

use chrono::{DateTime, Duration, Utc};

use crate::domain::user::{
    AccessTokenResponse, Introspection, LoginRequest, RegisterRequest, normalize_email,
};
use crate::domain::{AccessToken, User};
use crate::error::{Error, Result};
use crate::infrastructure::{AccessTokenRepository, UserRepository};
use crate::security::{generate_token, hash_password, hash_token, verify_password};
use crate::storage::Database;

/// A freshly created token; the raw value is never stored
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Milliseconds left before the token expires, never negative
    pub fn expires_in_millis(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_milliseconds().max(0)
    }
}

impl From<IssuedToken> for AccessTokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            expires_in: issued.expires_in_millis(Utc::now()),
            token: issued.token,
        }
    }
}

/// Opaque bearer tokens persisted as SHA-256 hashes
#[derive(Debug, Clone)]
pub struct TokenService {
    db: Database,
    ttl: Duration,
}

impl TokenService {
    pub fn new(db: Database, ttl_secs: u64) -> Self {
        Self {
            db,
            ttl: Duration::seconds(ttl_secs.min(i64::MAX as u64) as i64),
        }
    }

    /// Issue a token for `email`, purging expired ones first
    pub async fn create_token(&self, email: &str) -> Result<IssuedToken> {
        let repo = AccessTokenRepository::new(&self.db);

        match repo.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "Purged expired access tokens"),
            Err(e) => tracing::warn!("Failed to purge expired access tokens: {}", e),
        }

        let raw = generate_token();
        let expires_at = Utc::now() + self.ttl;
        repo.create(&AccessToken {
            token: hash_token(&raw),
            email: email.to_string(),
            expires_at,
        })
        .await?;

        Ok(IssuedToken {
            token: raw,
            expires_at,
        })
    }

    /// The stored token for a raw value, if it exists and has not expired
    pub async fn validate_token(&self, raw: &str) -> Result<Option<AccessToken>> {
        AccessTokenRepository::new(&self.db)
            .find_valid(&hash_token(raw))
            .await
    }

    /// Delete a token; unknown tokens are ignored
    pub async fn invalidate_token(&self, raw: &str) -> Result<bool> {
        AccessTokenRepository::new(&self.db)
            .delete(&hash_token(raw))
            .await
    }
}

#[derive(Debug, Clone)]
pub struct AuthService {
    db: Database,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(db: Database, tokens: TokenService) -> Self {
        Self { db, tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create an account and sign it in
    pub async fn register(&self, request: RegisterRequest) -> Result<AccessTokenResponse> {
        request.validate()?;

        let full_name = request.full_name.unwrap_or_default();
        let email = normalize_email(&request.email.unwrap_or_default());
        let password_hash = hash_password(&request.password.unwrap_or_default())?;

        let user = User::new(full_name.trim(), email, password_hash);
        UserRepository::new(&self.db).create(&user).await?;
        tracing::info!(user_id = %user.id, "Registered user");

        Ok(self.tokens.create_token(&user.email).await?.into())
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AccessTokenResponse> {
        request.validate()?;

        let email = normalize_email(request.email.as_deref().unwrap_or_default());
        let password = request.password.unwrap_or_default();

        let user = UserRepository::new(&self.db)
            .find_by_email(&email)
            .await?
            .filter(|user| verify_password(&password, &user.password_hash))
            .ok_or(Error::BadCredentials)?;

        tracing::debug!(user_id = %user.id, "User logged in");
        Ok(self.tokens.create_token(&user.email).await?.into())
    }

    /// Resolve the user behind a raw bearer token
    pub async fn authenticate(&self, raw: &str) -> Result<User> {
        let unauthorized = || Error::Unauthorized("Invalid or expired token".to_string());

        let token = self.tokens.validate_token(raw).await?.ok_or_else(unauthorized)?;
        UserRepository::new(&self.db)
            .find_by_email(&token.email)
            .await?
            .ok_or_else(unauthorized)
    }

    pub async fn introspect(&self, raw: Option<&str>) -> Result<Introspection> {
        let Some(raw) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(Introspection::inactive());
        };

        Ok(match self.tokens.validate_token(raw).await? {
            Some(token) => Introspection::from(&token),
            None => Introspection::inactive(),
        })
    }

    pub async fn logout(&self, raw: &str) -> Result<()> {
        if self.tokens.invalidate_token(raw).await? {
            tracing::debug!("Access token invalidated");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_in_is_milliseconds() {
        let now = Utc::now();
        let issued = IssuedToken {
            token: "t".into(),
            expires_at: now + Duration::seconds(90),
        };
        assert_eq!(issued.expires_in_millis(now), 90_000);
    }

    #[test]
    fn test_expired_token_reports_zero() {
        let now = Utc::now();
        let issued = IssuedToken {
            token: "t".into(),
            expires_at: now - Duration::seconds(5),
        };
        assert_eq!(issued.expires_in_millis(now), 0);
    }

    #[test]
    fn test_response_keeps_raw_token() {
        let issued = IssuedToken {
            token: "raw-token".into(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        let response = AccessTokenResponse::from(issued);
        assert_eq!(response.token, "raw-token");
        assert!(response.expires_in > 3_500_000);
    }
}
