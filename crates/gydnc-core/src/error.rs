//! Error types and handling for gydnc-core operations.
//!
//! All failures are classified into a small closed set of variants. The
//! entity service maps low-level failures onto these variants, wrapping the
//! underlying cause in the message for diagnostics. Callers branch on the
//! variant (or on [`Error::kind`]) rather than on message text to decide
//! user-visible behavior: a duplicate create, a missing entity, and an
//! ambiguous backend selection all get distinct treatment at the boundary.

use thiserror::Error;

/// The main error type for gydnc-core operations.
///
/// All public functions in gydnc-core return `Result<T, Error>`. Sentinel
/// variants (`EntityNotFound`, `EntityAlreadyExists`, `AmbiguousBackend`,
/// `ReadOnlyBackend`, ...) are part of the service contract and are matched
/// by callers for control flow; the remaining variants carry ambient
/// failures (I/O, YAML, configuration).
#[derive(Error, Debug)]
pub enum Error {
    /// The named backend is not present in the configuration.
    #[error("backend '{0}' not found")]
    BackendNotFound(String),

    /// No entity with the given alias exists in the consulted backend(s).
    ///
    /// This is the standard not-found sentinel: backends report missing
    /// files with this variant so the service can distinguish "absent" from
    /// genuine I/O failures.
    #[error("entity '{0}' not found")]
    EntityNotFound(String),

    /// A create was attempted for an alias that already exists in the
    /// target backend.
    #[error("entity '{0}' already exists")]
    EntityAlreadyExists(String),

    /// A mutating operation targeted a backend without write capability.
    #[error("backend '{0}' is read-only")]
    ReadOnlyBackend(String),

    /// A backend could not be chosen unambiguously.
    ///
    /// Raised when a write-side operation has no explicit backend, no
    /// default is configured and more than one backend exists, or when an
    /// update discovers the alias in several backends at once.
    #[error("ambiguous backend for '{alias}': candidates {}", .candidates.join(", "))]
    AmbiguousBackend {
        /// Alias the operation was targeting.
        alias: String,
        /// Every backend that could satisfy the operation.
        candidates: Vec<String>,
    },

    /// An operation required a default backend and none is configured.
    #[error("no storage backends available and no default backend configured")]
    NoDefaultBackend,

    /// The requested operation is not supported by the backend or its
    /// configured type.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A stored document does not conform to the frontmatter format.
    ///
    /// Parsing is strict: a missing opening or closing delimiter, invalid
    /// UTF-8, or undecodable YAML all land here rather than being repaired.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// An alias failed validation (absolute, contains `..`, or escapes the
    /// backend root).
    #[error("invalid alias '{0}'")]
    InvalidAlias(String),

    /// A tag-filter expression could not be compiled.
    #[error("invalid tag filter: {0}")]
    Filter(String),

    /// Configuration is missing, unreadable, or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A storage-level failure that is not one of the sentinel conditions.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Stable string identifier for the error kind.
    ///
    /// These are the names surfaced across the tool boundary; adapters put
    /// them in structured responses so clients can branch without parsing
    /// messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BackendNotFound(_) => "backend-not-found",
            Self::EntityNotFound(_) => "entity-not-found",
            Self::EntityAlreadyExists(_) => "entity-already-exists",
            Self::ReadOnlyBackend(_) => "read-only-backend",
            Self::AmbiguousBackend { .. } => "ambiguous-backend",
            Self::NoDefaultBackend => "no-default-backend",
            Self::UnsupportedOperation(_) => "unsupported-operation",
            Self::MalformedDocument(_) => "malformed-document",
            Self::InvalidAlias(_) => "invalid-alias",
            Self::Filter(_) => "invalid-filter",
            Self::Config(_) => "config",
            Self::Storage(_) => "storage",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }

    /// True when the error is the not-found sentinel.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound(_))
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_kinds_are_stable() {
        let cases: Vec<(Error, &str)> = vec![
            (Error::BackendNotFound("b".into()), "backend-not-found"),
            (Error::EntityNotFound("a".into()), "entity-not-found"),
            (
                Error::EntityAlreadyExists("a".into()),
                "entity-already-exists",
            ),
            (Error::ReadOnlyBackend("b".into()), "read-only-backend"),
            (
                Error::AmbiguousBackend {
                    alias: "a".into(),
                    candidates: vec!["b1".into(), "b2".into()],
                },
                "ambiguous-backend",
            ),
            (Error::NoDefaultBackend, "no-default-backend"),
            (
                Error::UnsupportedOperation("x".into()),
                "unsupported-operation",
            ),
            (Error::MalformedDocument("x".into()), "malformed-document"),
            (Error::InvalidAlias("../x".into()), "invalid-alias"),
            (Error::Filter("x".into()), "invalid-filter"),
            (Error::Config("x".into()), "config"),
            (Error::Storage("x".into()), "storage"),
            (Error::Serialization("x".into()), "serialization"),
            (Error::Io(io::Error::other("x")), "io"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.kind(), expected, "kind mismatch for {error:?}");
        }
    }

    #[test]
    fn test_ambiguous_backend_names_candidates() {
        let error = Error::AmbiguousBackend {
            alias: "x".into(),
            candidates: vec!["backend1".into(), "backend2".into()],
        };
        let message = error.to_string();
        assert!(message.contains("backend1, backend2"));
        assert!(message.contains('x'));
    }

    #[test]
    fn test_not_found_sentinel() {
        assert!(Error::EntityNotFound("a".into()).is_not_found());
        assert!(!Error::BackendNotFound("a".into()).is_not_found());
        assert!(!Error::Io(io::Error::from(io::ErrorKind::NotFound)).is_not_found());
    }

    #[test]
    fn test_io_error_preserves_source() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: Error = io_error.into();

        let source = std::error::Error::source(&error);
        assert!(source.is_some());
        assert!(source.unwrap().to_string().contains("access denied"));
    }

    #[test]
    fn test_yaml_error_maps_to_serialization() {
        let yaml_error = serde_yaml::from_str::<u32>("not a number").unwrap_err();
        let error: Error = yaml_error.into();
        assert_eq!(error.kind(), "serialization");
    }
}
