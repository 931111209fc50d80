use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::session::{
    FileStorage, KeyringStorage, MemoryStorage, SessionStorage, StorageError,
};

pub const APP_NAME: &str = "hairscan";
pub const DEFAULT_API_URL: &str = "http://localhost:8001/api";
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Overrides the session file location for the `file` backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerSettings {
    pub interval_ms: u64,
    /// Image file the still-image camera reads frames from.
    #[serde(default)]
    pub camera_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub storage: StorageSettings,
    pub scanner: ScannerSettings,
}

impl Settings {
    /// Layers defaults, then `hairscan.toml` (or `path` when given, which must
    /// exist), then `HAIRSCAN_*` environment variables with `__` between
    /// nested keys, e.g. `HAIRSCAN_STORAGE__BACKEND=keyring`.
    pub fn new(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(&path.to_string_lossy())
                .format(FileFormat::Toml)
                .required(true),
            None => File::with_name(APP_NAME)
                .format(FileFormat::Toml)
                .required(false),
        };
        let config = Config::builder()
            .set_default("api_url", DEFAULT_API_URL)?
            .set_default("storage.backend", "file")?
            .set_default("scanner.interval_ms", DEFAULT_SCAN_INTERVAL_MS as i64)?
            .add_source(file)
            .add_source(
                Environment::with_prefix("HAIRSCAN")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let settings: Self = config.try_deserialize()?;
        if settings.scanner.interval_ms == 0 {
            return Err(ConfigError::Message(
                "scanner.interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(settings)
    }

    pub fn open_storage(&self) -> Result<Box<dyn SessionStorage>, StorageError> {
        Ok(match self.storage.backend {
            StorageBackend::File => match &self.storage.path {
                Some(path) => Box::new(FileStorage::open(path)?),
                None => Box::new(FileStorage::in_data_dir(APP_NAME)?),
            },
            StorageBackend::Keyring => Box::new(KeyringStorage::new(APP_NAME)),
            StorageBackend::Memory => Box::new(MemoryStorage::default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_a_file() {
        let settings = Settings::new(None).unwrap();
        assert_eq!(settings.scanner.interval_ms, DEFAULT_SCAN_INTERVAL_MS);
        assert!(settings.scanner.camera_path.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
api_url = "https://scan.example.com/api"

[storage]
backend = "memory"

[scanner]
interval_ms = 250
camera_path = "/tmp/frame.png"
"#
        )
        .unwrap();

        let settings = Settings::new(Some(file.path())).unwrap();
        assert_eq!(settings.api_url, "https://scan.example.com/api");
        assert_eq!(settings.storage.backend, StorageBackend::Memory);
        assert_eq!(settings.scanner.interval_ms, 250);
        assert_eq!(
            settings.scanner.camera_path.as_deref(),
            Some(Path::new("/tmp/frame.png"))
        );
    }

    #[test]
    fn zero_scan_interval_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[scanner]\ninterval_ms = 0").unwrap();

        let error = Settings::new(Some(file.path())).unwrap_err();
        assert!(error.to_string().contains("interval_ms"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(Settings::new(Some(Path::new("/nonexistent/hairscan.toml"))).is_err());
    }
}
