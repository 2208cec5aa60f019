//! Key-value document store
//!
//! The dashboard host owns the real persistence engine. The engine only needs
//! "load document by key" and "save document by key", so that is all the
//! [`DocumentStore`] trait exposes. [`JsonFileStore`] keeps one pretty-printed
//! JSON file per key in the config directory; [`MemoryStore`] backs tests.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

use crate::config::document::{ConfigSource, ConfigurationDocument};
use crate::constants::config as paths;
use crate::error::{EngineError, Result as EngineResult};

pub trait DocumentStore: Send + Sync {
    /// Returns `None` when nothing was ever stored under `key`
    fn load(&self, key: &str) -> Result<Option<Value>>;
    fn save(&self, key: &str, value: &Value) -> Result<()>;
}

/// One JSON file per key under a directory
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$CARDSMITH_CONFIG_DIR`, else the platform config dir
    pub fn default_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(paths::DIR_ENV) {
            return PathBuf::from(dir);
        }
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::APP_DIR);
        path
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{}", paths::FILE_EXTENSION))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(path = %path.display(), "No stored document");
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        let value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
        Ok(Some(value))
    }

    fn save(&self, key: &str, value: &Value) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create config directory {:?}", self.dir))?;
        let path = self.path_for(key);
        let contents = serde_json::to_string_pretty(value)
            .context("Failed to serialize document to JSON")?;
        fs::write(&path, contents).with_context(|| format!("Failed to write {:?}", path))?;
        info!(path = %path.display(), "Saved document");
        Ok(())
    }
}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Value>>,
}

impl DocumentStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        let documents = self
            .documents
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(documents.get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> Result<()> {
        let mut documents = self
            .documents
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        documents.insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// The configuration document shared between the mutation handler (writer)
/// and resolution passes (readers)
#[derive(Clone)]
pub struct SharedConfig {
    store: Arc<dyn DocumentStore>,
    document: Arc<RwLock<ConfigurationDocument>>,
}

impl SharedConfig {
    pub fn load(store: Arc<dyn DocumentStore>) -> Result<Self> {
        let document = ConfigurationDocument::load(store.as_ref())?;
        Ok(Self {
            store,
            document: Arc::new(RwLock::new(document)),
        })
    }

    /// Apply one edit to a copy of the document and persist it.
    /// The shared copy only changes once the store accepted the write.
    pub fn apply<T>(
        &self,
        edit: impl FnOnce(&mut ConfigurationDocument) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut next = self.get_configuration();
        let outcome = edit(&mut next)?;
        next.save(self.store.as_ref())
            .map_err(|e| EngineError::Persistence(format!("{e:#}")))?;
        let mut current = self
            .document
            .write()
            .map_err(|_| EngineError::Persistence("configuration lock poisoned".into()))?;
        *current = next;
        Ok(outcome)
    }
}

impl ConfigSource for SharedConfig {
    fn get_configuration(&self) -> ConfigurationDocument {
        match self.document.read() {
            Ok(document) => document.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FailingStore;

    impl DocumentStore for FailingStore {
        fn load(&self, _key: &str) -> Result<Option<Value>> {
            Ok(None)
        }

        fn save(&self, _key: &str, _value: &Value) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::default();
        assert!(store.load("config").unwrap().is_none());
        store.save("config", &json!({"a": 1})).unwrap();
        assert_eq!(store.load("config").unwrap(), Some(json!({"a": 1})));
    }

    #[test]
    fn test_file_store_paths() {
        let store = JsonFileStore::new("/tmp/cardsmith-test");
        assert_eq!(
            store.path_for("config"),
            PathBuf::from("/tmp/cardsmith-test/config.json")
        );
    }

    #[test]
    fn test_file_store_missing_file_is_none() {
        let dir = std::env::temp_dir().join(format!("cardsmith-missing-{}", std::process::id()));
        let store = JsonFileStore::new(&dir);
        assert!(store.load("nothing-here").unwrap().is_none());
    }

    #[test]
    fn test_file_store_save_and_load() {
        let dir = std::env::temp_dir().join(format!("cardsmith-store-{}", std::process::id()));
        let store = JsonFileStore::new(&dir);
        store.save("config", &json!({"devices": {"light": {"icon": "mdi:lamp"}}})).unwrap();
        let loaded = store.load("config").unwrap().unwrap();
        assert_eq!(loaded["devices"]["light"]["icon"], "mdi:lamp");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_shared_config_apply_persists() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::default());
        let shared = SharedConfig::load(store.clone()).unwrap();
        shared
            .apply(|doc| {
                doc.entity_mut("light.kitchen").favorite = Some(true);
                Ok(())
            })
            .unwrap();

        assert_eq!(shared.get_configuration().entity("light.kitchen").unwrap().favorite, Some(true));
        let reloaded = ConfigurationDocument::load(store.as_ref()).unwrap();
        assert_eq!(reloaded.entity("light.kitchen").unwrap().favorite, Some(true));
    }

    #[test]
    fn test_shared_config_failed_write_keeps_document() {
        let shared = SharedConfig::load(Arc::new(FailingStore)).unwrap();
        let result = shared.apply(|doc| {
            doc.entity_mut("light.kitchen").hidden = Some(true);
            Ok(())
        });

        assert!(matches!(result, Err(EngineError::Persistence(_))));
        assert!(shared.get_configuration().entity("light.kitchen").is_none());
    }

    #[test]
    fn test_shared_config_failed_edit_keeps_document() {
        let shared = SharedConfig::load(Arc::new(MemoryStore::default())).unwrap();
        let result: EngineResult<()> = shared.apply(|doc| {
            doc.entity_mut("light.kitchen").hidden = Some(true);
            Err(EngineError::UnknownTarget("nope".into()))
        });

        assert!(result.is_err());
        assert!(shared.get_configuration().entity("light.kitchen").is_none());
    }
}
