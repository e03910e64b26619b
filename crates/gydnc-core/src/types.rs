//! Core data types shared across the entity/backend subsystem.
//!
//! The central type is [`Entity`]: the in-memory form of a guidance
//! document, carrying its alias (storage identity), the backend it was
//! loaded from, the parsed frontmatter fields, the Markdown body, and the
//! content ID (integrity identity). [`Metadata`] is the lighter shape that
//! backends return from `stat`/`list` paths where the body is not loaded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::{self, Document, Frontmatter};

/// An in-memory guidance entity.
///
/// Aliases are storage identity; content IDs are integrity identity. The
/// two are deliberately independent: renaming an entity (copy + delete)
/// keeps its CID, while editing the body changes the CID under the same
/// alias.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Hierarchical, forward-slash-separated identifier within a backend.
    pub alias: String,

    /// Name of the backend this entity instance was produced from. Empty
    /// for entities constructed in memory that have not been stored yet.
    #[serde(default)]
    pub source_backend: String,

    /// Title from frontmatter.
    #[serde(default)]
    pub title: String,

    /// Description from frontmatter.
    #[serde(default)]
    pub description: String,

    /// Tags from frontmatter, kept sorted ascending and free of duplicates
    /// after load and after any mutation of the tag set.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Markdown body, verbatim bytes after the closing delimiter.
    #[serde(default)]
    pub body: String,

    /// Additional frontmatter fields beyond title/description/tags.
    #[serde(default)]
    pub custom_metadata: BTreeMap<String, serde_yaml::Value>,

    /// Content ID: lowercase-hex SHA-256 of the body. Populated on load;
    /// `None` for listing results where the body was never read.
    #[serde(default)]
    pub cid: Option<String>,
}

impl Entity {
    /// Scaffold a new entity for the given alias.
    ///
    /// The title defaults to the alias and the body to a minimal Markdown
    /// stub, matching what the create path offers when the caller supplies
    /// no content of its own.
    #[must_use]
    pub fn new(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        let body = format!("# {alias}\n\nGuidance content for '{alias}' goes here.\n");
        Self {
            title: alias.clone(),
            cid: Some(document::content_id(&body)),
            body,
            alias,
            ..Self::default()
        }
    }

    /// Build an entity from backend `stat` metadata. The body stays empty
    /// and the CID unset; tags are normalized.
    #[must_use]
    pub fn from_metadata(
        alias: impl Into<String>,
        source_backend: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        let mut entity = Self {
            alias: alias.into(),
            source_backend: source_backend.into(),
            title: metadata.title,
            description: metadata.description,
            tags: metadata.tags,
            custom_metadata: metadata.extra,
            ..Self::default()
        };
        entity.normalize_tags();
        entity
    }

    /// Build an entity from a parsed document. Tags are normalized and the
    /// CID is recomputed from the body, never trusted from metadata.
    #[must_use]
    pub fn from_document(
        alias: impl Into<String>,
        source_backend: impl Into<String>,
        doc: Document,
    ) -> Self {
        let mut entity = Self {
            alias: alias.into(),
            source_backend: source_backend.into(),
            title: doc.frontmatter.title,
            description: doc.frontmatter.description,
            tags: doc.frontmatter.tags,
            custom_metadata: doc.frontmatter.custom,
            cid: Some(document::content_id(&doc.body)),
            body: doc.body,
        };
        entity.normalize_tags();
        entity
    }

    /// Convert to the document form the codec serializes.
    ///
    /// Only the standard frontmatter fields (title, description, tags) are
    /// emitted; tags are normalized on the way out.
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut tags = self.tags.clone();
        tags.sort();
        tags.dedup();
        Document {
            frontmatter: Frontmatter {
                title: self.title.clone(),
                description: self.description.clone(),
                tags,
                custom: BTreeMap::new(),
            },
            body: self.body.clone(),
        }
    }

    /// Sort tags ascending and drop duplicates.
    pub fn normalize_tags(&mut self) {
        self.tags.sort();
        self.tags.dedup();
    }

    /// Recompute the content ID from the current body.
    pub fn refresh_cid(&mut self) {
        self.cid = Some(document::content_id(&self.body));
    }
}

/// String-keyed metadata bag returned by backend `stat` and `read`.
///
/// Carries at minimum title, description and tags; backends may surface
/// additional fields (file size, parse-failure markers) through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Title from frontmatter; empty when unavailable.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Description from frontmatter; empty when unavailable.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Tags from frontmatter, in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Backend-specific fields and any custom frontmatter keys.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Metadata {
    /// Metadata extracted from parsed frontmatter.
    #[must_use]
    pub fn from_frontmatter(frontmatter: &Frontmatter) -> Self {
        Self {
            title: frontmatter.title.clone(),
            description: frontmatter.description.clone(),
            tags: frontmatter.tags.clone(),
            extra: frontmatter.custom.clone(),
        }
    }
}

/// Details accompanying a backend write.
///
/// The local-filesystem backend ignores these; backends with a commit
/// concept use them for the change description.
#[derive(Debug, Clone, Default)]
pub struct CommitDetails {
    /// Human-readable description of the change.
    pub message: String,
}

impl CommitDetails {
    /// Details for a given change description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
