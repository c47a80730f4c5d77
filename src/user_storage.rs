use crate::error::HubError;
use crate::storage::Storage;
use crate::user_models::User;
use anyhow::Result;

impl Storage {
    /// Adds a user, rejecting an email that is already registered.
    pub async fn create_user(&self, user: User) -> Result<User, HubError> {
        self.modify_users(|users| {
            if users.iter().any(|u| u.email == user.email) {
                return Err(HubError::EmailTaken);
            }
            users.push(user.clone());
            Ok(user)
        })
        .await
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.load_users()?.into_iter().find(|u| u.email == email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.load_users()?.into_iter().find(|u| u.id == id))
    }

    /// Applies `f` to the stored record for `user_id` and returns the updated user.
    pub async fn update_user(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut User),
    ) -> Result<User, HubError> {
        self.modify_users(|users| {
            let user = users
                .iter_mut()
                .find(|u| u.id == user_id)
                .ok_or(HubError::Unauthenticated)?;
            f(user);
            Ok(user.clone())
        })
        .await
    }
}
