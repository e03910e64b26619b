//! Storage backend abstraction: capability traits, factory, and registry.
//!
//! Backends come in two capability tiers. [`StorageBackend`] is the
//! read-only base every backend implements; [`WritableBackend`] extends it
//! with mutation. The entity service holds `dyn StorageBackend` handles and
//! narrows to the writable capability only at write sites via
//! [`StorageBackend::as_writable`], failing explicitly on read-only
//! targets.

pub mod localfs;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::config::BackendConfig;
use crate::types::{CommitDetails, Metadata};
use crate::{Error, Result};

pub use localfs::LocalFsBackend;

/// Metadata accompanying backend initialization.
pub type InitMetadata = BTreeMap<String, String>;

/// Read-only storage capability.
///
/// Contracts:
/// - `read` reports a missing alias as [`Error::EntityNotFound`], a
///   sentinel distinguishable from other failures.
/// - `list("")` returns every alias; a non-empty prefix restricts to
///   aliases whose string form begins with it.
/// - `stat` tolerates malformed documents: it warns and returns partial
///   metadata rather than failing the whole listing.
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// The backend's configured name.
    fn name(&self) -> &str;

    /// Read the raw document bytes and best-effort metadata for an alias.
    fn read(&self, alias: &str) -> Result<(Vec<u8>, Metadata)>;

    /// List aliases beginning with `prefix`.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Metadata for a single alias without returning the body.
    fn stat(&self, alias: &str) -> Result<Metadata>;

    /// Narrow to the writable capability, when present.
    fn as_writable(&self) -> Option<&dyn WritableBackend> {
        None
    }
}

/// Writable storage capability, extending the read-only base.
pub trait WritableBackend: StorageBackend {
    /// Write the full document for an alias, creating parent directories
    /// as needed. Does not enforce create-uniqueness; that is the entity
    /// service's job.
    fn write(&self, alias: &str, content: &[u8], details: &CommitDetails) -> Result<()>;

    /// Remove the document for an alias. Missing aliases report the
    /// not-found sentinel.
    fn delete(&self, alias: &str) -> Result<()>;

    /// Prepare the backend for first use (create its storage location).
    fn init(&self, metadata: &InitMetadata) -> Result<()>;

    /// Whether this backend accepts writes.
    fn is_writable(&self) -> bool;

    /// Capability flags for this backend.
    fn capabilities(&self) -> BTreeMap<String, bool>;
}

/// Instantiate a backend from its configuration.
///
/// `config_dir` is the directory of the configuration file the backend
/// config was loaded from; relative backend paths resolve against it.
///
/// # Errors
///
/// Returns [`Error::UnsupportedOperation`] for unknown backend types and
/// [`Error::Config`] for a type whose settings block is missing.
pub fn instantiate(
    name: &str,
    config: &BackendConfig,
    config_dir: &Path,
) -> Result<Arc<dyn StorageBackend>> {
    match config.backend_type.as_str() {
        localfs::BACKEND_TYPE => {
            let settings = config.localfs.as_ref().ok_or_else(|| {
                Error::Config(format!(
                    "backend '{name}' is type localfs but has no localfs settings"
                ))
            })?;
            let backend = LocalFsBackend::new(name, settings, config_dir)?;
            Ok(Arc::new(backend))
        },
        other => Err(Error::UnsupportedOperation(format!(
            "backend '{name}' has unsupported type '{other}'"
        ))),
    }
}

/// Name-keyed registry of lazily-created backend instances.
///
/// The map is read-mostly and populated on first access. The mutex is held
/// across instantiation so two concurrent first accesses for the same name
/// cannot both create an instance.
#[derive(Default)]
pub struct BackendRegistry {
    backends: Mutex<HashMap<String, Arc<dyn StorageBackend>>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the backend for `name`, creating and caching it on first
    /// request.
    pub fn get_or_init(
        &self,
        name: &str,
        config: &BackendConfig,
        config_dir: &Path,
    ) -> Result<Arc<dyn StorageBackend>> {
        let mut backends = self
            .backends
            .lock()
            .map_err(|_| Error::Storage("backend registry lock poisoned".into()))?;

        if let Some(backend) = backends.get(name) {
            return Ok(Arc::clone(backend));
        }

        let backend = instantiate(name, config, config_dir)?;
        backends.insert(name.to_string(), Arc::clone(&backend));
        Ok(backend)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::LocalFsConfig;
    use tempfile::TempDir;

    fn localfs_config(path: &str) -> BackendConfig {
        BackendConfig {
            backend_type: localfs::BACKEND_TYPE.to_string(),
            localfs: Some(LocalFsConfig {
                path: path.to_string(),
            }),
        }
    }

    #[test]
    fn test_instantiate_localfs() {
        let dir = TempDir::new().unwrap();
        let backend = instantiate("primary", &localfs_config("store"), dir.path()).unwrap();
        assert_eq!(backend.name(), "primary");
        assert!(backend.as_writable().is_some());
    }

    #[test]
    fn test_instantiate_unknown_type() {
        let dir = TempDir::new().unwrap();
        let config = BackendConfig {
            backend_type: "s3".to_string(),
            localfs: None,
        };
        let err = instantiate("remote", &config, dir.path()).unwrap_err();
        assert_eq!(err.kind(), "unsupported-operation");
    }

    #[test]
    fn test_instantiate_localfs_missing_settings() {
        let dir = TempDir::new().unwrap();
        let config = BackendConfig {
            backend_type: localfs::BACKEND_TYPE.to_string(),
            localfs: None,
        };
        let err = instantiate("broken", &config, dir.path()).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_registry_caches_instances() {
        let dir = TempDir::new().unwrap();
        let registry = BackendRegistry::new();
        let config = localfs_config("store");

        let first = registry.get_or_init("be", &config, dir.path()).unwrap();
        let second = registry.get_or_init("be", &config, dir.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_registry_distinct_names_get_distinct_instances() {
        let dir = TempDir::new().unwrap();
        let registry = BackendRegistry::new();

        let a = registry
            .get_or_init("a", &localfs_config("store-a"), dir.path())
            .unwrap();
        let b = registry
            .get_or_init("b", &localfs_config("store-b"), dir.path())
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "a");
        assert_eq!(b.name(), "b");
    }
}
