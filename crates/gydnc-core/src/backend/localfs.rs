//! Local-filesystem backend: a directory tree of `.g6e` document files.
//!
//! Each entity lives at `<root>/<alias>.g6e`, with alias path segments
//! mapping to sub-directories. The configured root is resolved against the
//! configuration file's directory when relative, created when missing, and
//! canonicalized; every alias is validated so the resolved file path stays
//! inside the root.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::backend::{InitMetadata, StorageBackend, WritableBackend};
use crate::config::LocalFsConfig;
use crate::types::{CommitDetails, Metadata};
use crate::{Error, Result, document};

/// Backend type discriminator used in configuration.
pub const BACKEND_TYPE: &str = "localfs";

/// Fixed extension for guidance entity files.
pub const ENTITY_EXTENSION: &str = "g6e";

/// A storage backend over a local directory tree.
#[derive(Debug)]
pub struct LocalFsBackend {
    name: String,
    root: PathBuf,
}

impl LocalFsBackend {
    /// Create a backend rooted at the configured path.
    ///
    /// Absolute paths are used directly; relative paths are joined with
    /// `config_dir`. The directory is created when missing (mode 0o755 on
    /// Unix) and the result canonicalized.
    pub fn new(name: &str, config: &LocalFsConfig, config_dir: &Path) -> Result<Self> {
        let configured = PathBuf::from(&config.path);
        let resolved = if configured.is_absolute() {
            configured
        } else {
            config_dir.join(configured)
        };

        if !resolved.exists() {
            fs::create_dir_all(&resolved).map_err(|e| {
                Error::Storage(format!(
                    "failed to create backend root {}: {e}",
                    resolved.display()
                ))
            })?;
            set_mode(&resolved, 0o755);
        }

        let root = fs::canonicalize(&resolved).map_err(|e| {
            Error::Storage(format!(
                "failed to resolve backend root {}: {e}",
                resolved.display()
            ))
        })?;

        debug!(backend = name, root = %root.display(), "initialized localfs backend");

        Ok(Self {
            name: name.to_string(),
            root,
        })
    }

    /// The canonical root directory of this backend.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an alias to its on-disk path, enforcing containment.
    fn entity_path(&self, alias: &str) -> Result<PathBuf> {
        validate_alias(alias)?;
        let path = self.root.join(format!("{alias}.{ENTITY_EXTENSION}"));
        // Containment re-check on top of the segment validation.
        if path.strip_prefix(&self.root).is_err() {
            return Err(Error::InvalidAlias(alias.to_string()));
        }
        Ok(path)
    }

    fn walk(&self, dir: &Path, prefix: &str, aliases: &mut Vec<String>) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(backend = %self.name, dir = %dir.display(), error = %e,
                    "skipping unreadable directory during list");
                return;
            },
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(backend = %self.name, dir = %dir.display(), error = %e,
                        "skipping unreadable entry during list");
                    continue;
                },
            };
            let path = entry.path();
            if path.is_dir() {
                self.walk(&path, prefix, aliases);
            } else if path
                .extension()
                .and_then(std::ffi::OsStr::to_str)
                .is_some_and(|ext| ext == ENTITY_EXTENSION)
            {
                if let Some(alias) = self.alias_for_path(&path) {
                    if alias.starts_with(prefix) {
                        aliases.push(alias);
                    }
                }
            }
        }
    }

    /// Derive the alias for a file under the root: strip the root prefix
    /// and the extension, normalize separators to forward slashes.
    fn alias_for_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let stripped = relative.with_extension("");
        let segments: Vec<String> = stripped
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if segments.is_empty() {
            None
        } else {
            Some(segments.join("/"))
        }
    }
}

impl StorageBackend for LocalFsBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, alias: &str) -> Result<(Vec<u8>, Metadata)> {
        let path = self.entity_path(alias)?;
        let bytes = fs::read(&path).map_err(|e| map_not_found(e, alias))?;

        // Best-effort metadata: a malformed document still yields its raw
        // bytes, with the parse failure downgraded to a warning here. The
        // entity service re-parses and surfaces the error itself.
        let metadata = match document::parse(&bytes) {
            Ok(doc) => Metadata::from_frontmatter(&doc.frontmatter),
            Err(e) => {
                warn!(backend = %self.name, %alias, error = %e,
                    "document failed to parse during read; returning empty metadata");
                Metadata::default()
            },
        };

        Ok((bytes, metadata))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut aliases = Vec::new();
        self.walk(&self.root, prefix, &mut aliases);
        aliases.sort();
        Ok(aliases)
    }

    fn stat(&self, alias: &str) -> Result<Metadata> {
        let path = self.entity_path(alias)?;
        let bytes = fs::read(&path).map_err(|e| map_not_found(e, alias))?;

        match document::parse(&bytes) {
            Ok(doc) => Ok(Metadata::from_frontmatter(&doc.frontmatter)),
            Err(e) => {
                warn!(backend = %self.name, %alias, error = %e,
                    "document failed to parse during stat; returning filesystem attributes");
                let mut extra = BTreeMap::new();
                extra.insert(
                    "parse_error".to_string(),
                    serde_yaml::Value::from(e.to_string()),
                );
                if let Ok(file_meta) = fs::metadata(&path) {
                    extra.insert(
                        "size_bytes".to_string(),
                        serde_yaml::Value::from(file_meta.len()),
                    );
                }
                Ok(Metadata {
                    extra,
                    ..Metadata::default()
                })
            },
        }
    }

    fn as_writable(&self) -> Option<&dyn WritableBackend> {
        Some(self)
    }
}

impl WritableBackend for LocalFsBackend {
    fn write(&self, alias: &str, content: &[u8], _details: &CommitDetails) -> Result<()> {
        let path = self.entity_path(alias)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!(
                    "failed to create parent directories for '{alias}': {e}"
                ))
            })?;
        }

        // Write through a sibling temp file and rename for whole-file
        // replace atomicity.
        let tmp_path = path.with_extension(format!("{ENTITY_EXTENSION}.tmp"));
        fs::write(&tmp_path, content)
            .map_err(|e| Error::Storage(format!("failed to write '{alias}': {e}")))?;
        set_mode(&tmp_path, 0o640);
        fs::rename(&tmp_path, &path)
            .map_err(|e| Error::Storage(format!("failed to commit '{alias}': {e}")))?;

        debug!(backend = %self.name, %alias, "wrote entity");
        Ok(())
    }

    fn delete(&self, alias: &str) -> Result<()> {
        let path = self.entity_path(alias)?;
        fs::remove_file(&path).map_err(|e| map_not_found(e, alias))?;
        debug!(backend = %self.name, %alias, "deleted entity");
        Ok(())
    }

    fn init(&self, _metadata: &InitMetadata) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            Error::Storage(format!(
                "failed to create backend root {}: {e}",
                self.root.display()
            ))
        })?;
        set_mode(&self.root, 0o755);
        Ok(())
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn capabilities(&self) -> BTreeMap<String, bool> {
        ["readable", "listable", "writable", "deletable"]
            .into_iter()
            .map(|capability| (capability.to_string(), true))
            .collect()
    }
}

/// Reject aliases that are empty, absolute, contain `..` or empty/`.`
/// segments, or use backslashes instead of forward slashes.
fn validate_alias(alias: &str) -> Result<()> {
    if alias.is_empty() {
        return Err(Error::InvalidAlias(alias.to_string()));
    }
    if alias.contains('\\') || alias.contains('\0') {
        return Err(Error::InvalidAlias(alias.to_string()));
    }
    if Path::new(alias).is_absolute() || alias.starts_with('/') {
        return Err(Error::InvalidAlias(alias.to_string()));
    }
    if alias
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(Error::InvalidAlias(alias.to_string()));
    }
    Ok(())
}

fn map_not_found(e: std::io::Error, alias: &str) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::EntityNotFound(alias.to_string())
    } else {
        Error::Io(e)
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        warn!(path = %path.display(), error = %e, "failed to set permissions");
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}
