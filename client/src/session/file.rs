use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use log::debug;

use super::{SessionStorage, StorageError, StorageKey};

const FILE_NAME: &str = "session.json";

/// Keeps all session values in a single JSON document on disk.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    /// Opens `session.json` under the platform data directory.
    pub fn in_data_dir(app: &str) -> Result<Self, StorageError> {
        let dir = dirs::data_dir().ok_or(StorageError::NoDataDir)?.join(app);
        Self::open(dir.join(FILE_NAME))
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened session file {}", path.display());
        Ok(Self { path, entries })
    }

    fn flush(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn load(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key.as_ref()).cloned())
    }

    fn store(&mut self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        self.entries
            .insert(key.as_ref().to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: StorageKey) -> Result<(), StorageError> {
        if self.entries.remove(key.as_ref()).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(FILE_NAME);

        let mut storage = FileStorage::open(&path).unwrap();
        storage.store(StorageKey::Token, "token-1").unwrap();
        storage.store(StorageKey::User, r#"{"user_id":"x"}"#).unwrap();
        storage.remove(StorageKey::User).unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.load(StorageKey::Token).unwrap().as_deref(), Some("token-1"));
        assert_eq!(reopened.load(StorageKey::User).unwrap(), None);
    }

    #[test]
    fn missing_file_is_an_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join(FILE_NAME)).unwrap();
        assert_eq!(storage.load(StorageKey::HairProfile).unwrap(), None);
    }
}
