//! Account management for the signed-in user

use crate::domain::user::ChangePasswordRequest;
use crate::domain::{BasicUser, User};
use crate::error::{Error, Result};
use crate::infrastructure::UserRepository;
use crate::security::{hash_password, verify_password};
use crate::storage::Database;

#[derive(Debug, Clone)]
pub struct UserService {
    db: Database,
}

impl UserService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn me(&self, user: &User) -> BasicUser {
        BasicUser::from(user)
    }

    pub async fn change_name(&self, user: &User, new_full_name: Option<&str>) -> Result<()> {
        let name = new_full_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::invalid_field("newFullName", "must not be blank"))?;

        UserRepository::new(&self.db).update_name(user.id, name).await?;
        tracing::debug!(user_id = %user.id, "Changed user name");
        Ok(())
    }

    pub async fn change_password(&self, user: &User, request: ChangePasswordRequest) -> Result<()> {
        request.validate()?;

        let current = request.current_password.unwrap_or_default();
        if !verify_password(&current, &user.password_hash) {
            return Err(Error::InvalidInput("Current password is incorrect".to_string()));
        }

        let password_hash = hash_password(&request.new_password.unwrap_or_default())?;
        UserRepository::new(&self.db)
            .update_password(user.id, &password_hash)
            .await?;

        tracing::info!(user_id = %user.id, "Changed user password");
        Ok(())
    }
}
