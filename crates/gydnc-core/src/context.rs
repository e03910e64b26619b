//! Application context: configuration, resolved config directory, and the
//! lazily-initialized backend registry.
//!
//! The context is an explicit value threaded through every core operation;
//! there is no global state. Configuration is immutable after load, the
//! registry is populated lazily under a mutex, and the whole context is
//! safe to share behind an `Arc` for concurrent readers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{BackendRegistry, StorageBackend};
use crate::config::{self, Config};
use crate::service::EntityService;
use crate::{Error, Result};

/// Shared state for one process: config, its directory, and backends.
pub struct AppContext {
    config: Config,
    config_dir: PathBuf,
    registry: BackendRegistry,
}

impl AppContext {
    /// Build a context from an already-loaded configuration.
    ///
    /// `config_dir` must be the directory the configuration file was read
    /// from; relative backend paths resolve against it.
    #[must_use]
    pub fn new(config: Config, config_dir: PathBuf) -> Self {
        Self {
            config,
            config_dir,
            registry: BackendRegistry::new(),
        }
    }

    /// Load a context from the effective configuration path: explicit
    /// argument, then `GYDNC_CONFIG`, then a labelled error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = config::resolve_config_path(explicit)?;
        let (loaded, dir) = Config::load(&path)?;
        Ok(Self::new(loaded, dir))
    }

    /// The loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory of the configuration file.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// The backend for `name`, creating and caching it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendNotFound`] when the name is not configured,
    /// or the factory's error when instantiation fails.
    pub fn backend(&self, name: &str) -> Result<Arc<dyn StorageBackend>> {
        let backend_config = self
            .config
            .storage_backends
            .get(name)
            .ok_or_else(|| Error::BackendNotFound(name.to_string()))?;
        self.registry
            .get_or_init(name, backend_config, &self.config_dir)
    }

    /// The entity service over this context.
    #[must_use]
    pub fn entities(&self) -> EntityService<'_> {
        EntityService::new(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context_with_store() -> (AppContext, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = config::init(temp_dir.path(), false).unwrap();
        let (loaded, dir) = Config::load(&config_path).unwrap();
        (AppContext::new(loaded, dir), temp_dir)
    }

    #[test]
    fn test_backend_lookup() {
        let (ctx, _temp_dir) = context_with_store();
        let backend = ctx.backend(config::INIT_BACKEND_NAME).unwrap();
        assert_eq!(backend.name(), config::INIT_BACKEND_NAME);
    }

    #[test]
    fn test_unknown_backend() {
        let (ctx, _temp_dir) = context_with_store();
        let err = ctx.backend("nope").unwrap_err();
        assert_eq!(err.kind(), "backend-not-found");
    }

    #[test]
    fn test_backend_instances_are_cached() {
        let (ctx, _temp_dir) = context_with_store();
        let first = ctx.backend(config::INIT_BACKEND_NAME).unwrap();
        let second = ctx.backend(config::INIT_BACKEND_NAME).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_concurrent_first_access_creates_one_instance() {
        let (ctx, _temp_dir) = context_with_store();
        let ctx = Arc::new(ctx);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                std::thread::spawn(move || ctx.backend(config::INIT_BACKEND_NAME).unwrap())
            })
            .collect();

        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for instance in &instances[1..] {
            assert!(Arc::ptr_eq(&instances[0], instance));
        }
    }

    #[test]
    fn test_load_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = config::init(temp_dir.path(), false).unwrap();

        let ctx = AppContext::load(Some(config_path.as_path())).unwrap();
        assert_eq!(ctx.config_dir(), temp_dir.path().join(".gydnc"));
        assert!(
            ctx.config()
                .storage_backends
                .contains_key(config::INIT_BACKEND_NAME)
        );
    }
}
