//! # gydnc-core
//!
//! Core functionality for gydnc - a store of structured guidance entities
//! for AI agents and humans.
//!
//! A guidance entity is a Markdown document with YAML frontmatter (title,
//! description, tags), identified by a hierarchical alias such as
//! `recipes/git/commit-creation` and stored across one or more named
//! storage backends.
//!
//! ## Architecture
//!
//! The crate is organized around a few key components:
//!
//! - **Document codec**: strict parse/serialize of the frontmatter format
//!   and body-only content IDs
//! - **Filter engine**: compiled tag-query expressions with wildcard
//!   support
//! - **Backends**: a read-only/writable capability split with a
//!   local-filesystem implementation and a lazy registry
//! - **Entity service**: merge, priority, and selection policy across
//!   backends
//! - **Error handling**: a closed taxonomy callers match on for control
//!   flow
//!
//! ## Quick start
//!
//! ```no_run
//! use gydnc_core::{AppContext, Entity};
//!
//! let ctx = AppContext::load(None)?; // resolves GYDNC_CONFIG
//! let service = ctx.entities();
//!
//! let entity = Entity::new("must/safety-first");
//! let backend = service.save(&entity, None)?;
//! println!("saved to backend {backend}");
//! # Ok::<(), gydnc_core::Error>(())
//! ```

/// Storage backend traits, factory, and registry
pub mod backend;
/// Configuration model, loader, and store bootstrap
pub mod config;
/// Application context threading config and backends through operations
pub mod context;
/// Document codec: parse, serialize, content identity
pub mod document;
/// Error types and result alias
pub mod error;
/// Tag-filter query engine
pub mod filter;
/// Entity service orchestrating operations across backends
pub mod service;
/// Core data types
pub mod types;

// Re-export commonly used types
pub use backend::{
    BackendRegistry, InitMetadata, LocalFsBackend, StorageBackend, WritableBackend,
};
pub use config::{BackendConfig, Config, LocalFsConfig};
pub use context::AppContext;
pub use document::{Document, Frontmatter, content_id};
pub use error::{Error, Result};
pub use filter::TagFilter;
pub use service::{EntityService, GetResult, MergedList};
pub use types::{CommitDetails, Entity, Metadata};
