//! Configuration model, loader, and store bootstrap.
//!
//! Configuration is a YAML mapping naming storage backends and an optional
//! default. The file's directory is part of the semantic context — relative
//! backend paths resolve against it — so loading returns the parsed config
//! together with that directory.
//!
//! There are no invented defaults: the effective config path is an explicit
//! argument, then the `GYDNC_CONFIG` environment variable, then a
//! clearly-labelled error. Repositories bootstrap with [`init`], which
//! writes a `.gydnc/` store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

/// Environment variable supplying the configuration file path when no
/// explicit argument is given.
pub const CONFIG_ENV: &str = "GYDNC_CONFIG";

/// Directory name created by [`init`].
pub const STORE_DIR: &str = ".gydnc";

/// Configuration file name inside the store directory.
pub const CONFIG_FILE: &str = "config.yml";

/// Backend name written by [`init`].
pub const INIT_BACKEND_NAME: &str = "default_local";

/// Tag-ontology reference file written by [`init`].
pub const TAG_ONTOLOGY_FILE: &str = "tag_ontology.md";

const TAG_ONTOLOGY_TEMPLATE: &str = "\
# Tag Ontology

Tags are colon-namespaced, lowercase strings. Keep the set small and
composable; filters match namespaces with `ns:*`.

## Namespaces

- `scope:` — what the guidance applies to (`scope:code`, `scope:docs`).
- `quality:` — the property it protects (`quality:safety`, `quality:clarity`).
- `recipes` — step-by-step procedures.
- `deprecated` — superseded guidance kept for reference; filter out with
  `-deprecated`.
";

/// Top-level configuration: an optional default backend and the named
/// backend set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Name of the backend used when an operation does not specify one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_backend: Option<String>,

    /// Named storage backends.
    #[serde(default)]
    pub storage_backends: BTreeMap<String, BackendConfig>,
}

/// Configuration of a single backend: its type plus the type-specific
/// settings block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend type discriminator; currently only `localfs`.
    #[serde(rename = "type")]
    pub backend_type: String,

    /// Settings for `localfs` backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localfs: Option<LocalFsConfig>,
}

/// Settings for a local-filesystem backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalFsConfig {
    /// Root directory; absolute, or relative to the configuration file's
    /// directory.
    pub path: String,
}

impl Config {
    /// The configuration [`init`] writes: a single localfs backend at `.`
    /// set as the default.
    #[must_use]
    pub fn bootstrap() -> Self {
        let mut storage_backends = BTreeMap::new();
        storage_backends.insert(
            INIT_BACKEND_NAME.to_string(),
            BackendConfig {
                backend_type: crate::backend::localfs::BACKEND_TYPE.to_string(),
                localfs: Some(LocalFsConfig {
                    path: ".".to_string(),
                }),
            },
        );
        Self {
            default_backend: Some(INIT_BACKEND_NAME.to_string()),
            storage_backends,
        }
    }

    /// Load configuration from a file, returning it together with the
    /// file's directory (the base for relative backend paths).
    pub fn load(path: &Path) -> Result<(Self, PathBuf)> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read configuration {}: {e}",
                path.display()
            ))
        })?;
        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            Error::Config(format!(
                "failed to parse configuration {}: {e}",
                path.display()
            ))
        })?;

        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        debug!(path = %path.display(), backends = config.storage_backends.len(),
            "loaded configuration");
        Ok((config, dir))
    }

    /// Write the configuration as YAML, mode 0o600 on Unix.
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| Error::Serialization(format!("failed to serialize config: {e}")))?;
        fs::write(path, yaml).map_err(|e| {
            Error::Config(format!(
                "failed to write configuration {}: {e}",
                path.display()
            ))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                Error::Config(format!(
                    "failed to set permissions on {}: {e}",
                    path.display()
                ))
            })?;
        }

        Ok(())
    }
}

/// Resolve the effective configuration path: explicit argument, then
/// `GYDNC_CONFIG`, then a labelled error.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Ok(value) = std::env::var(CONFIG_ENV) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }
    Err(Error::Config(format!(
        "no configuration file: pass an explicit path or set {CONFIG_ENV}"
    )))
}

/// Bootstrap a guidance store.
///
/// Creates `<target>/.gydnc/` holding a configuration file (single
/// `default_local` backend of type localfs at path `.`) and a tag-ontology
/// reference file. Returns the configuration file path.
///
/// # Errors
///
/// Refuses with [`Error::Config`] when `.gydnc/config.yml` already exists,
/// unless `force` is set.
pub fn init(target: &Path, force: bool) -> Result<PathBuf> {
    let store_dir = target.join(STORE_DIR);
    let config_path = store_dir.join(CONFIG_FILE);

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists; refusing to overwrite without force",
            config_path.display()
        )));
    }

    fs::create_dir_all(&store_dir).map_err(|e| {
        Error::Config(format!(
            "failed to create store directory {}: {e}",
            store_dir.display()
        ))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(&store_dir, fs::Permissions::from_mode(0o755));
    }

    Config::bootstrap().save(&config_path)?;

    let ontology_path = store_dir.join(TAG_ONTOLOGY_FILE);
    if !ontology_path.exists() || force {
        fs::write(&ontology_path, TAG_ONTOLOGY_TEMPLATE).map_err(|e| {
            Error::Config(format!(
                "failed to write {}: {e}",
                ontology_path.display()
            ))
        })?;
    }

    info!(path = %config_path.display(), "initialized guidance store");
    Ok(config_path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_documented_shape() {
        let yaml = "\
default_backend: primary
storage_backends:
  primary:
    type: localfs
    localfs:
      path: ./guidance
  mirror:
    type: localfs
    localfs:
      path: /srv/guidance
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.default_backend.as_deref(), Some("primary"));
        assert_eq!(config.storage_backends.len(), 2);
        assert_eq!(
            config.storage_backends["primary"]
                .localfs
                .as_ref()
                .unwrap()
                .path,
            "./guidance"
        );
        assert_eq!(config.storage_backends["mirror"].backend_type, "localfs");
    }

    #[test]
    fn test_default_backend_optional() {
        let yaml = "\
storage_backends:
  only:
    type: localfs
    localfs:
      path: .
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.default_backend.is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yml");

        let original = Config::bootstrap();
        original.save(&path).unwrap();
        let (loaded, dir) = Config::load(&path).unwrap();

        assert_eq!(loaded, original);
        assert_eq!(dir, temp_dir.path());
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = Config::load(Path::new("/nonexistent/config.yml")).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_load_invalid_yaml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yml");
        fs::write(&path, "storage_backends: [not, a, mapping]").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_resolve_explicit_path_wins() {
        let path = resolve_config_path(Some(Path::new("/tmp/explicit.yml"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/explicit.yml"));
    }

    #[test]
    fn test_init_writes_store() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = init(temp_dir.path(), false).unwrap();

        assert_eq!(
            config_path,
            temp_dir.path().join(".gydnc").join("config.yml")
        );
        assert!(config_path.is_file());
        assert!(temp_dir.path().join(".gydnc/tag_ontology.md").is_file());

        let (config, _) = Config::load(&config_path).unwrap();
        assert_eq!(config.default_backend.as_deref(), Some(INIT_BACKEND_NAME));
        let backend = &config.storage_backends[INIT_BACKEND_NAME];
        assert_eq!(backend.backend_type, "localfs");
        assert_eq!(backend.localfs.as_ref().unwrap().path, ".");
    }

    #[test]
    fn test_init_refuses_existing_store() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path(), false).unwrap();

        let err = init(temp_dir.path(), false).unwrap_err();
        assert_eq!(err.kind(), "config");
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_init_force_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path(), false).unwrap();
        init(temp_dir.path(), true).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_config_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let config_path = init(temp_dir.path(), false).unwrap();
        let mode = fs::metadata(&config_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
