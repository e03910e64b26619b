//! Entity service: orchestrates read/list/save/overwrite/delete across the
//! configured backends.
//!
//! The service owns the cross-backend policy: merge and priority rules for
//! duplicate aliases, backend selection for writes, create-uniqueness, the
//! writability check, and discovery for update-style operations. Backends
//! stay policy-free underneath it.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use tracing::{debug, warn};

use crate::context::AppContext;
use crate::filter::TagFilter;
use crate::types::{CommitDetails, Entity};
use crate::{Error, Result, document};

/// Result of fetching a single entity.
///
/// A malformed stored document still yields an entity (alias, source
/// backend, raw bytes as body) so callers can display something, with the
/// parse failure carried alongside.
#[derive(Debug)]
pub struct GetResult {
    /// The fetched entity.
    pub entity: Entity,
    /// Set when the stored document failed to parse.
    pub parse_error: Option<Error>,
}

/// Result of a merged list across all backends.
#[derive(Debug)]
pub struct MergedList {
    /// Surviving entities, deduplicated and sorted by alias.
    pub entities: Vec<Entity>,
    /// Backends whose listing failed outright, with the failure.
    pub backend_errors: BTreeMap<String, Error>,
}

/// Entity operations over an [`AppContext`].
pub struct EntityService<'a> {
    ctx: &'a AppContext,
}

impl<'a> EntityService<'a> {
    /// Create a service over the given context.
    #[must_use]
    pub const fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// List entities in a single backend.
    ///
    /// Stats each listed alias, normalizes tags, applies the filter, and
    /// sorts by alias. Aliases whose stat fails are logged and skipped.
    pub fn list(
        &self,
        backend: &str,
        prefix: &str,
        filter: Option<&TagFilter>,
    ) -> Result<Vec<Entity>> {
        let handle = self.ctx.backend(backend)?;
        let aliases = handle.list(prefix)?;

        let mut entities = Vec::with_capacity(aliases.len());
        for alias in aliases {
            let metadata = match handle.stat(&alias) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(%alias, backend, error = %e, "skipping entity: stat failed");
                    continue;
                },
            };
            let entity = Entity::from_metadata(alias, backend, metadata);
            if filter.is_none_or(|f| f.matches(&entity.tags)) {
                entities.push(entity);
            }
        }
        entities.sort_by(|a, b| a.alias.cmp(&b.alias));
        Ok(entities)
    }

    /// List entities across every configured backend, merged.
    ///
    /// Duplicate aliases are resolved by priority: the default backend's
    /// version wins; otherwise the version from the lexicographically
    /// first backend name. Ignored versions are logged. Backends that fail
    /// to list at all land in the error map; the merged result is filtered
    /// then sorted by alias.
    pub fn list_merged(&self, prefix: &str, filter: Option<&TagFilter>) -> Result<MergedList> {
        if self.ctx.config().storage_backends.is_empty() {
            return Err(Error::NoDefaultBackend);
        }

        let mut backend_errors = BTreeMap::new();
        let mut merged: BTreeMap<String, Entity> = BTreeMap::new();

        for name in self.backend_priority_order() {
            let entities = match self.list(&name, prefix, None) {
                Ok(entities) => entities,
                Err(e) => {
                    warn!(backend = %name, error = %e, "backend listing failed");
                    backend_errors.insert(name, e);
                    continue;
                },
            };
            for entity in entities {
                match merged.entry(entity.alias.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(entity);
                    },
                    Entry::Occupied(existing) => {
                        warn!(
                            alias = %entity.alias,
                            chosen = %existing.get().source_backend,
                            ignored = %entity.source_backend,
                            "duplicate alias across backends; keeping higher-priority version"
                        );
                    },
                }
            }
        }

        let entities = merged
            .into_values()
            .filter(|entity| filter.is_none_or(|f| f.matches(&entity.tags)))
            .collect();

        Ok(MergedList {
            entities,
            backend_errors,
        })
    }

    /// Fetch a single entity.
    ///
    /// With an explicit backend, any read failure surfaces. Without one,
    /// the default backend is tried first, then the remaining backends in
    /// deterministic order; the first successful read wins and a miss
    /// everywhere is [`Error::EntityNotFound`].
    pub fn get(&self, alias: &str, backend: Option<&str>) -> Result<GetResult> {
        if let Some(name) = backend {
            let handle = self.ctx.backend(name)?;
            let (bytes, _) = handle.read(alias)?;
            return Ok(materialize(alias, name, &bytes));
        }

        for name in self.backend_priority_order() {
            let handle = match self.ctx.backend(&name) {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(backend = %name, error = %e, "skipping backend during lookup");
                    continue;
                },
            };
            match handle.read(alias) {
                Ok((bytes, _)) => return Ok(materialize(alias, &name, &bytes)),
                Err(e) if e.is_not_found() => {},
                Err(e) => {
                    warn!(backend = %name, %alias, error = %e,
                        "read failed; trying next backend");
                },
            }
        }

        Err(Error::EntityNotFound(alias.to_string()))
    }

    /// Save a new entity. The alias must not already exist in the target
    /// backend. Returns the name of the backend written to.
    pub fn save(&self, entity: &Entity, backend: Option<&str>) -> Result<String> {
        let name = self.select_backend(backend, None, &entity.alias)?;
        let handle = self.ctx.backend(&name)?;
        let writable = handle
            .as_writable()
            .ok_or_else(|| Error::ReadOnlyBackend(name.clone()))?;

        match handle.stat(&entity.alias) {
            Ok(_) => return Err(Error::EntityAlreadyExists(entity.alias.clone())),
            Err(e) if e.is_not_found() => {},
            Err(e) => return Err(e),
        }

        let content = document::serialize(&entity.to_document())?;
        writable.write(
            &entity.alias,
            content.as_bytes(),
            &CommitDetails::new(format!("create {}", entity.alias)),
        )?;
        debug!(alias = %entity.alias, backend = %name, "saved new entity");
        Ok(name)
    }

    /// Overwrite an entity wholesale, with no pre-existence check.
    ///
    /// Backend selection prefers the entity's `source_backend` when the
    /// caller does not name one. Returns the backend written to.
    pub fn overwrite(&self, entity: &Entity, backend: Option<&str>) -> Result<String> {
        let hint = (!entity.source_backend.is_empty()).then_some(entity.source_backend.as_str());
        let name = self.select_backend(backend, hint, &entity.alias)?;
        let handle = self.ctx.backend(&name)?;
        let writable = handle
            .as_writable()
            .ok_or_else(|| Error::ReadOnlyBackend(name.clone()))?;

        let content = document::serialize(&entity.to_document())?;
        writable.write(
            &entity.alias,
            content.as_bytes(),
            &CommitDetails::new(format!("update {}", entity.alias)),
        )?;
        debug!(alias = %entity.alias, backend = %name, "overwrote entity");
        Ok(name)
    }

    /// Delete an entity from the selected backend.
    pub fn delete(&self, alias: &str, backend: Option<&str>) -> Result<()> {
        let name = self.select_backend(backend, None, alias)?;
        let handle = self.ctx.backend(&name)?;
        let writable = handle
            .as_writable()
            .ok_or_else(|| Error::ReadOnlyBackend(name.clone()))?;

        writable.delete(alias)?;
        debug!(%alias, backend = %name, "deleted entity");
        Ok(())
    }

    /// Discover which backend holds an alias, for update-style operations
    /// where the target backend matters for correctness.
    ///
    /// Presence in more than one backend is an ambiguity error naming each
    /// containing backend. Backend initialization failures during
    /// discovery count as "not present here", with the last failure logged
    /// for diagnostics.
    pub fn locate_for_update(&self, alias: &str) -> Result<String> {
        let mut containing = Vec::new();
        let mut last_error: Option<Error> = None;

        for name in self.ctx.config().storage_backends.keys() {
            let handle = match self.ctx.backend(name) {
                Ok(handle) => handle,
                Err(e) => {
                    last_error = Some(e);
                    continue;
                },
            };
            match handle.stat(alias) {
                Ok(_) => containing.push(name.clone()),
                Err(e) if e.is_not_found() => {},
                Err(e) => last_error = Some(e),
            }
        }

        match containing.len() {
            0 => {
                if let Some(e) = last_error {
                    warn!(%alias, error = %e, "discovery saw backend failures");
                }
                Err(Error::EntityNotFound(alias.to_string()))
            },
            1 => Ok(containing.remove(0)),
            _ => Err(Error::AmbiguousBackend {
                alias: alias.to_string(),
                candidates: containing,
            }),
        }
    }

    /// Backend names in read/merge priority order: the default backend
    /// first (when configured and present), then the rest sorted by name.
    fn backend_priority_order(&self) -> Vec<String> {
        let config = self.ctx.config();
        let default = config
            .default_backend
            .as_deref()
            .filter(|name| config.storage_backends.contains_key(*name));

        let mut order = Vec::with_capacity(config.storage_backends.len());
        if let Some(default) = default {
            order.push(default.to_string());
        }
        for name in config.storage_backends.keys() {
            if Some(name.as_str()) != default {
                order.push(name.clone());
            }
        }
        order
    }

    /// Resolve the target backend for a mutating operation.
    ///
    /// Precedence: explicit argument, then the source-backend hint, then
    /// the configured default, then a sole configured backend. Anything
    /// else is ambiguous.
    fn select_backend(
        &self,
        explicit: Option<&str>,
        hint: Option<&str>,
        alias: &str,
    ) -> Result<String> {
        let config = self.ctx.config();

        if let Some(name) = explicit {
            if !config.storage_backends.contains_key(name) {
                return Err(Error::BackendNotFound(name.to_string()));
            }
            return Ok(name.to_string());
        }

        if let Some(name) = hint {
            if !config.storage_backends.contains_key(name) {
                return Err(Error::BackendNotFound(name.to_string()));
            }
            return Ok(name.to_string());
        }

        if let Some(default) = &config.default_backend {
            if !config.storage_backends.contains_key(default) {
                return Err(Error::BackendNotFound(default.clone()));
            }
            return Ok(default.clone());
        }

        let mut names = config.storage_backends.keys();
        match (names.next(), names.next()) {
            (None, _) => Err(Error::NoDefaultBackend),
            (Some(sole), None) => Ok(sole.clone()),
            (Some(_), Some(_)) => Err(Error::AmbiguousBackend {
                alias: alias.to_string(),
                candidates: config.storage_backends.keys().cloned().collect(),
            }),
        }
    }
}

/// Turn raw document bytes into a [`GetResult`], falling back to a
/// body-only entity when parsing fails.
fn materialize(alias: &str, backend: &str, bytes: &[u8]) -> GetResult {
    match document::parse(bytes) {
        Ok(doc) => GetResult {
            entity: Entity::from_document(alias, backend, doc),
            parse_error: None,
        },
        Err(e) => {
            let body = String::from_utf8_lossy(bytes).into_owned();
            let entity = Entity {
                alias: alias.to_string(),
                source_backend: backend.to_string(),
                cid: Some(document::content_id(&body)),
                body,
                ..Entity::default()
            };
            GetResult {
                entity,
                parse_error: Some(e),
            }
        },
    }
}
