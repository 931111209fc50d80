use ::keyring::{Entry, Error as KeyringError};
use log::debug;

use super::{SessionStorage, StorageError, StorageKey};

/// Stores each session value as its own credential in the OS keyring.
#[derive(Debug, Clone)]
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: StorageKey) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, key.as_ref())?)
    }
}

impl SessionStorage for KeyringStorage {
    fn load(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&mut self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn remove(&mut self, key: StorageKey) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => debug!("Removed {} from keyring", key.as_ref()),
            Err(KeyringError::NoEntry) => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}
