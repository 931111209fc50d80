//! Authenticated session state: bearer token, current user and hair profile.
//!
//! A [`Session`] is owned by the [`Client`](crate::client::Client) and shared
//! with the UI through [`SharedSession`]. Every mutation is mirrored to a
//! [`SessionStorage`] so the next start can rehydrate without logging in again.
//! Storage is only a cache: write failures are logged and the in-memory value
//! stays authoritative.

use std::sync::Arc;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use strum_macros::AsRefStr;
use tap::TapFallible;
use thiserror::Error;
use tokio::sync::RwLock;

use types::domain::{HairProfile, User};

mod file;
mod keyring;
mod memory;

pub use self::file::FileStorage;
pub use self::keyring::KeyringStorage;
pub use self::memory::MemoryStorage;

pub type SharedSession = Arc<RwLock<Session>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum StorageKey {
    Token,
    User,
    HairProfile,
}

impl StorageKey {
    pub const ALL: [StorageKey; 3] = [StorageKey::Token, StorageKey::User, StorageKey::HairProfile];
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session data is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Keyring error: {0}")]
    Keyring(#[from] ::keyring::Error),
    #[error("No data directory available for session storage")]
    NoDataDir,
}

/// Durable key-value store backing a [`Session`].
pub trait SessionStorage: Send + Sync {
    fn load(&self, key: StorageKey) -> Result<Option<String>, StorageError>;
    fn store(&mut self, key: StorageKey, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: StorageKey) -> Result<(), StorageError>;
}

pub struct Session {
    token: Option<String>,
    user: Option<User>,
    hair_profile: Option<HairProfile>,
    storage: Box<dyn SessionStorage>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.token.is_some())
            .field("user", &self.user)
            .field("hair_profile", &self.hair_profile)
            .finish()
    }
}

impl Session {
    /// Reads whatever a previous run left in `storage`. Unreadable entries are
    /// treated as absent.
    pub fn restore(storage: Box<dyn SessionStorage>) -> Self {
        let token = storage
            .load(StorageKey::Token)
            .tap_err(|e| warn!("Failed to load stored token: {}", e))
            .ok()
            .flatten();
        let user = load_json(storage.as_ref(), StorageKey::User);
        let hair_profile = load_json(storage.as_ref(), StorageKey::HairProfile);
        debug!(
            "Restored session: token={}, user={}, hair_profile={}",
            token.is_some(),
            user.is_some(),
            hair_profile.is_some()
        );
        Self {
            token,
            user,
            hair_profile,
            storage,
        }
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn hair_profile(&self) -> Option<&HairProfile> {
        self.hair_profile.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn set_token(&mut self, token: String) {
        let _ = self
            .storage
            .store(StorageKey::Token, &token)
            .tap_err(|e| warn!("Failed to persist token: {}", e));
        self.token = Some(token);
    }

    pub fn set_user(&mut self, user: User) {
        self.persist(StorageKey::User, &user);
        self.user = Some(user);
    }

    pub fn set_hair_profile(&mut self, hair_profile: Option<HairProfile>) {
        match &hair_profile {
            Some(profile) => self.persist(StorageKey::HairProfile, profile),
            None => {
                let _ = self
                    .storage
                    .remove(StorageKey::HairProfile)
                    .tap_err(|e| warn!("Failed to remove stored hair profile: {}", e));
            }
        }
        self.hair_profile = hair_profile;
    }

    /// Drops token, user and hair profile together. Memory is cleared first;
    /// every stored key is then removed even if an earlier removal fails.
    pub fn clear(&mut self) {
        self.token = None;
        self.user = None;
        self.hair_profile = None;
        for key in StorageKey::ALL {
            let _ = self
                .storage
                .remove(key)
                .tap_err(|e| warn!("Failed to remove stored {}: {}", key.as_ref(), e));
        }
        debug!("Session cleared");
    }

    fn persist<T: Serialize>(&mut self, key: StorageKey, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(StorageError::from)
            .and_then(|json| self.storage.store(key, &json));
        if let Err(e) = result {
            warn!("Failed to persist {}: {}", key.as_ref(), e);
        }
    }
}

fn load_json<T: DeserializeOwned>(storage: &dyn SessionStorage, key: StorageKey) -> Option<T> {
    storage
        .load(key)
        .and_then(|raw| {
            raw.map(|json| serde_json::from_str(&json))
                .transpose()
                .map_err(StorageError::from)
        })
        .tap_err(|e| warn!("Failed to load stored {}: {}", key.as_ref(), e))
        .ok()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::domain::{CurlPattern, Density, Porosity, ScalpType};
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "curls@example.com".to_string(),
            full_name: Some("Ada".to_string()),
            created_at: None,
            has_hair_profile: Some(true),
        }
    }

    fn profile() -> HairProfile {
        HairProfile {
            profile_id: Some("p-1".to_string()),
            user_id: None,
            porosity: Porosity::High,
            curl_pattern: CurlPattern::Type4B,
            scalp_type: ScalpType::Oily,
            density: Density::Low,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn restores_what_was_persisted() {
        let storage = MemoryStorage::default();
        let mut session = Session::restore(Box::new(storage.clone()));
        session.set_token("token-1".to_string());
        session.set_user(user());
        session.set_hair_profile(Some(profile()));

        let restored = Session::restore(Box::new(storage));
        assert_eq!(restored.token(), Some("token-1"));
        assert_eq!(restored.user(), session.user());
        assert_eq!(restored.hair_profile(), Some(&profile()));
    }

    #[test]
    fn clear_removes_every_stored_value() {
        let storage = MemoryStorage::default();
        let mut session = Session::restore(Box::new(storage.clone()));
        session.set_token("token-1".to_string());
        session.set_user(user());
        session.set_hair_profile(Some(profile()));

        session.clear();

        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        assert!(session.hair_profile().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn corrupt_entries_are_ignored() {
        let mut storage = MemoryStorage::default();
        storage.store(StorageKey::Token, "token-1").unwrap();
        storage.store(StorageKey::User, "{not json").unwrap();

        let session = Session::restore(Box::new(storage));
        assert_eq!(session.token(), Some("token-1"));
        assert!(session.user().is_none());
    }
}
