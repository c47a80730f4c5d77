use crate::models::Resource;
use crate::user_models::{AuthState, User};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const USERS_KEY: &str = "users";
const RESOURCES_KEY: &str = "resources";
const AUTH_KEY: &str = "auth";
const SESSIONS_KEY: &str = "sessions";

/// Signed-in states of the HTTP server, keyed by bearer token.
pub type Sessions = HashMap<String, AuthState>;

/// Directory-backed key-value store holding the `users`, `resources`, `auth`
/// and `sessions` entries.
///
/// Every mutation reads the whole entry, changes an in-memory copy and writes the
/// whole entry back. `write_lock` serializes those cycles inside one process; two
/// processes sharing a directory race and the last write wins.
pub struct Storage {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn load_users(&self) -> Result<Vec<User>> {
        Ok(self.read_entry(USERS_KEY)?.unwrap_or_default())
    }

    pub fn load_resources(&self) -> Result<Vec<Resource>> {
        Ok(self.read_entry(RESOURCES_KEY)?.unwrap_or_default())
    }

    pub fn find_resource(&self, id: &str) -> Result<Option<Resource>> {
        Ok(self.load_resources()?.into_iter().find(|r| r.id == id))
    }

    /// The persisted session; absent or unreadable means logged out.
    pub fn load_auth(&self) -> Result<AuthState> {
        Ok(self.read_entry(AUTH_KEY)?.unwrap_or_else(AuthState::logged_out))
    }

    pub fn save_auth(&self, auth: &AuthState) -> Result<()> {
        self.write_entry(AUTH_KEY, auth)
    }

    pub fn clear_auth(&self) -> Result<()> {
        let path = self.entry_path(AUTH_KEY);
        if path.exists() {
            fs::remove_file(&path).context("Failed to remove auth entry")?;
        }
        Ok(())
    }

    /// The server-side session behind `token`, if any.
    pub fn load_session(&self, token: &str) -> Result<Option<AuthState>> {
        let mut sessions: Sessions = self.read_entry(SESSIONS_KEY)?.unwrap_or_default();
        Ok(sessions.remove(token))
    }

    pub async fn modify_sessions<T, E>(
        &self,
        f: impl FnOnce(&mut Sessions) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<anyhow::Error>,
    {
        let _guard = self.write_lock.lock().await;
        let mut sessions: Sessions = self.read_entry(SESSIONS_KEY)?.unwrap_or_default();
        let out = f(&mut sessions)?;
        self.write_entry(SESSIONS_KEY, &sessions)?;
        Ok(out)
    }

    /// Read-modify-write of the resource collection. Nothing is written when `f` fails.
    pub async fn modify_resources<T, E>(
        &self,
        f: impl FnOnce(&mut Vec<Resource>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<anyhow::Error>,
    {
        let _guard = self.write_lock.lock().await;
        let mut resources = self.load_resources()?;
        let out = f(&mut resources)?;
        self.write_entry(RESOURCES_KEY, &resources)?;
        Ok(out)
    }

    /// Read-modify-write of the user collection. Nothing is written when `f` fails.
    pub async fn modify_users<T, E>(
        &self,
        f: impl FnOnce(&mut Vec<User>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<anyhow::Error>,
    {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load_users()?;
        let out = f(&mut users)?;
        self.write_entry(USERS_KEY, &users)?;
        Ok(out)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {} entry", key))?;

        match serde_json::from_str(&data) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(entry = key, error = %e, "malformed entry, treating as empty");
                Ok(None)
            }
        }
    }

    fn write_entry<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to serialize {} entry", key))?;
        fs::write(self.entry_path(key), json)
            .with_context(|| format!("Failed to write {} entry", key))?;
        debug!(entry = key, "entry written");
        Ok(())
    }
}
