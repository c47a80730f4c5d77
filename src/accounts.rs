use crate::error::HubError;
use crate::storage::Storage;
use crate::user_models::{AuthState, Credentials, ProfileUpdate, Registration, User};
use anyhow::Context;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Registration, login and profile edits.
///
/// The plain methods keep the one local session in the persisted `auth` entry,
/// which is what the command line uses. The `*_session` methods hand out a
/// bearer token per login instead, so concurrent HTTP callers never share a
/// signed-in state.
pub struct AccountService {
    storage: Arc<Storage>,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(storage: Arc<Storage>, bcrypt_cost: u32) -> Self {
        Self {
            storage,
            bcrypt_cost,
        }
    }

    pub fn current(&self) -> Result<AuthState, HubError> {
        Ok(self.storage.load_auth()?)
    }

    pub async fn register(&self, form: Registration) -> Result<User, HubError> {
        let user = self.create_account(form).await?;
        self.storage.save_auth(&AuthState::signed_in(&user))?;
        Ok(user.public())
    }

    pub fn login(&self, credentials: Credentials) -> Result<User, HubError> {
        let user = self.authenticate(credentials)?;
        self.storage.save_auth(&AuthState::signed_in(&user))?;
        Ok(user.public())
    }

    pub fn logout(&self) -> Result<(), HubError> {
        self.storage.clear_auth()?;
        info!("user logged out");
        Ok(())
    }

    /// Updates bio and avatar on both the stored user and the session.
    pub async fn update_profile(
        &self,
        session: &AuthState,
        update: ProfileUpdate,
    ) -> Result<AuthState, HubError> {
        let user = self.apply_profile(session, update).await?;
        let auth = AuthState::signed_in(&user);
        self.storage.save_auth(&auth)?;
        Ok(auth)
    }

    /// Registers and opens a token session without touching the `auth` entry.
    pub async fn register_session(&self, form: Registration) -> Result<(User, String), HubError> {
        let user = self.create_account(form).await?;
        let token = self.open_session(&user).await?;
        Ok((user.public(), token))
    }

    pub async fn login_session(&self, credentials: Credentials) -> Result<(User, String), HubError> {
        let user = self.authenticate(credentials)?;
        let token = self.open_session(&user).await?;
        Ok((user.public(), token))
    }

    /// Unknown or revoked tokens resolve to a logged-out state.
    pub fn session(&self, token: &str) -> Result<AuthState, HubError> {
        Ok(self
            .storage
            .load_session(token)?
            .unwrap_or_else(AuthState::logged_out))
    }

    pub async fn close_session(&self, token: &str) -> Result<(), HubError> {
        let closed = self
            .storage
            .modify_sessions(|sessions| Ok::<_, HubError>(sessions.remove(token).is_some()))
            .await?;
        debug!(closed, "session closed");
        Ok(())
    }

    /// Profile edit for token sessions. Every open session of the user sees the change.
    pub async fn update_session_profile(
        &self,
        session: &AuthState,
        update: ProfileUpdate,
    ) -> Result<AuthState, HubError> {
        let user = self.apply_profile(session, update).await?;
        let auth = AuthState::signed_in(&user);
        self.storage
            .modify_sessions(|sessions| {
                sessions
                    .values_mut()
                    .filter(|s| s.current_user().map_or(false, |u| u.id == user.id))
                    .for_each(|s| *s = auth.clone());
                Ok::<_, HubError>(())
            })
            .await?;
        Ok(auth)
    }

    async fn create_account(&self, form: Registration) -> Result<User, HubError> {
        let fields = [
            &form.name,
            &form.email,
            &form.password,
            &form.college,
            &form.branch,
            &form.semester,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(HubError::Validation(
                "Please fill in all mandatory fields".to_string(),
            ));
        }

        let password_hash =
            bcrypt::hash(&form.password, self.bcrypt_cost).context("Failed to hash password")?;
        let user = self.storage.create_user(User::new(&form, password_hash)).await?;
        info!(user_id = %user.id, college = %user.college, "user registered");
        Ok(user)
    }

    fn authenticate(&self, credentials: Credentials) -> Result<User, HubError> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(HubError::Validation("Please fill in all fields".to_string()));
        }

        let user = self
            .storage
            .get_user_by_email(credentials.email.trim())?
            .ok_or(HubError::InvalidCredentials)?;

        let valid = !user.password_hash.is_empty()
            && bcrypt::verify(&credentials.password, &user.password_hash).unwrap_or_else(|e| {
                warn!(user_id = %user.id, error = %e, "stored password hash is unreadable");
                false
            });
        if !valid {
            warn!(user_id = %user.id, "login rejected");
            return Err(HubError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    async fn open_session(&self, user: &User) -> Result<String, HubError> {
        let token = Uuid::new_v4().to_string();
        let auth = AuthState::signed_in(user);
        self.storage
            .modify_sessions(|sessions| {
                sessions.insert(token.clone(), auth);
                Ok::<_, HubError>(())
            })
            .await?;
        debug!(user_id = %user.id, "session opened");
        Ok(token)
    }

    async fn apply_profile(&self, session: &AuthState, update: ProfileUpdate) -> Result<User, HubError> {
        let user_id = session
            .current_user()
            .ok_or(HubError::Unauthenticated)?
            .id
            .clone();

        let user = self
            .storage
            .update_user(&user_id, |u| {
                if let Some(bio) = update.bio {
                    u.bio = Some(bio).filter(|b| !b.trim().is_empty());
                }
                if let Some(pic) = update.profile_pic {
                    u.profile_pic = Some(pic).filter(|p| !p.trim().is_empty());
                }
            })
            .await?;
        info!(user_id = %user.id, "profile updated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> AccountService {
        AccountService::new(Arc::new(Storage::new(dir.path()).unwrap()), 4)
    }

    fn registration(email: &str) -> Registration {
        Registration {
            name: "Asha".into(),
            email: email.into(),
            password: "hunter22".into(),
            college: "X College".into(),
            branch: "CSE".into(),
            semester: "3".into(),
        }
    }

    #[tokio::test]
    async fn register_signs_the_user_in() {
        let dir = TempDir::new().unwrap();
        let accounts = service(&dir);
        let user = accounts.register(registration("asha@x.edu")).await.unwrap();

        let auth = accounts.current().unwrap();
        assert!(auth.is_authenticated);
        assert_eq!(auth.current_user().unwrap().id, user.id);
        assert!(user.password_hash.is_empty());
    }

    #[tokio::test]
    async fn register_rejects_missing_fields_and_taken_email() {
        let dir = TempDir::new().unwrap();
        let accounts = service(&dir);
        let mut incomplete = registration("a@x.edu");
        incomplete.branch = String::new();
        let err = accounts.register(incomplete).await.unwrap_err();
        assert_eq!(err.to_string(), "Please fill in all mandatory fields");

        accounts.register(registration("a@x.edu")).await.unwrap();
        let err = accounts.register(registration("a@x.edu")).await.unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[tokio::test]
    async fn login_verifies_the_password() {
        let dir = TempDir::new().unwrap();
        let accounts = service(&dir);
        accounts.register(registration("a@x.edu")).await.unwrap();
        accounts.logout().unwrap();

        let wrong = Credentials { email: "a@x.edu".into(), password: "nope".into() };
        assert!(matches!(accounts.login(wrong), Err(HubError::InvalidCredentials)));
        let unknown = Credentials { email: "b@x.edu".into(), password: "hunter22".into() };
        assert!(matches!(accounts.login(unknown), Err(HubError::InvalidCredentials)));
        assert!(!accounts.current().unwrap().is_authenticated);

        let right = Credentials { email: "a@x.edu".into(), password: "hunter22".into() };
        accounts.login(right).unwrap();
        assert!(accounts.current().unwrap().is_authenticated);
    }

    #[tokio::test]
    async fn bio_survives_logout_and_login() {
        let dir = TempDir::new().unwrap();
        let accounts = service(&dir);
        accounts.register(registration("a@x.edu")).await.unwrap();
        let session = accounts.current().unwrap();

        let update = ProfileUpdate { bio: Some("Loves graphs".into()), profile_pic: None };
        let auth = accounts.update_profile(&session, update).await.unwrap();
        assert_eq!(auth.current_user().unwrap().bio.as_deref(), Some("Loves graphs"));

        accounts.logout().unwrap();
        let user = accounts
            .login(Credentials { email: "a@x.edu".into(), password: "hunter22".into() })
            .unwrap();
        assert_eq!(user.bio.as_deref(), Some("Loves graphs"));
    }

    #[tokio::test]
    async fn profile_update_requires_a_session() {
        let dir = TempDir::new().unwrap();
        let accounts = service(&dir);
        let err = accounts
            .update_profile(&AuthState::logged_out(), ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Unauthenticated));
    }

    #[tokio::test]
    async fn corrupt_password_hash_reads_as_invalid_credentials() {
        let dir = TempDir::new().unwrap();
        let accounts = service(&dir);
        accounts.register(registration("a@x.edu")).await.unwrap();
        accounts.logout().unwrap();
        accounts
            .storage
            .modify_users(|users| {
                users[0].password_hash = "not-a-bcrypt-hash".into();
                Ok::<_, HubError>(())
            })
            .await
            .unwrap();

        let creds = Credentials { email: "a@x.edu".into(), password: "hunter22".into() };
        assert!(matches!(accounts.login(creds), Err(HubError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn token_sessions_are_independent_of_each_other_and_of_auth() {
        let dir = TempDir::new().unwrap();
        let accounts = service(&dir);
        let (asha, asha_token) = accounts.register_session(registration("a@x.edu")).await.unwrap();
        let mut other = registration("b@y.edu");
        other.college = "Y College".into();
        let (_, bilal_token) = accounts.register_session(other).await.unwrap();

        assert!(!accounts.current().unwrap().is_authenticated);
        assert_eq!(accounts.session(&asha_token).unwrap().current_user().unwrap().id, asha.id);
        assert_eq!(accounts.session(&bilal_token).unwrap().college(), Some("Y College"));
        assert!(!accounts.session("made-up").unwrap().is_authenticated);

        accounts.close_session(&bilal_token).await.unwrap();
        assert!(!accounts.session(&bilal_token).unwrap().is_authenticated);
        assert!(accounts.session(&asha_token).unwrap().is_authenticated);
    }

    #[tokio::test]
    async fn session_profile_edit_refreshes_every_open_session() {
        let dir = TempDir::new().unwrap();
        let accounts = service(&dir);
        let (_, first) = accounts.register_session(registration("a@x.edu")).await.unwrap();
        let creds = Credentials { email: "a@x.edu".into(), password: "hunter22".into() };
        let (_, second) = accounts.login_session(creds).await.unwrap();
        assert_ne!(first, second);

        let session = accounts.session(&first).unwrap();
        let update = ProfileUpdate { bio: Some("Night owl".into()), profile_pic: None };
        accounts.update_session_profile(&session, update).await.unwrap();

        let refreshed = accounts.session(&second).unwrap();
        assert_eq!(refreshed.current_user().unwrap().bio.as_deref(), Some("Night owl"));
        assert!(!accounts.current().unwrap().is_authenticated);
    }
}
