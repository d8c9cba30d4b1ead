//! Error types for the facade layer.
//!
//! [`FacadeError`] is the single error type returned by the identity cache,
//! the resolver and formula construction. Recoverable lookups
//! (`NotFound`, `TypeConflict`, `TypeMismatch`, `Arity`) are never retried
//! internally; callers decide whether to coerce through
//! [`Factory::find_or_create`](crate::Factory::find_or_create).

use std::error::Error as StdError;
use std::path::PathBuf;

use kbf_kinds::Kind;
use thiserror::Error;

use crate::arity::ArityDescriptor;

/// Boxed, thread-safe error cause.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Convenience alias used throughout the crate.
pub type Result<T, E = FacadeError> = std::result::Result<T, E>;

/// Errors raised by the facade.
#[derive(Debug, Error)]
pub enum FacadeError {
    /// The key does not resolve to any term.
    #[error("no term found for {key}")]
    NotFound {
        /// The key as requested.
        key: String,
    },

    /// The term exists and is provably of a kind unrelated to the request.
    #[error("{term} is of type {found}, incompatible with requested {requested}")]
    TypeConflict {
        /// Canonical form of the term.
        term: String,
        /// What the term actually is.
        found: String,
        /// The kind that was requested.
        requested: Kind,
    },

    /// The term exists but is less specific than requested. Coercible only
    /// through `find_or_create`.
    #[error("{term} is only known as {found}, not {requested}")]
    TypeMismatch {
        /// Canonical form of the term.
        term: String,
        /// The tightest kind the term is known to have.
        found: Kind,
        /// The kind that was requested.
        requested: Kind,
    },

    /// A facade object could not be constructed.
    #[error("could not create {kind} for {term}: {reason}")]
    CreateFailure {
        /// Canonical form of the term.
        term: String,
        /// The kind construction was attempted for.
        kind: Kind,
        /// What went wrong.
        reason: String,
        /// True when the term exists but nothing confirms the requested
        /// kind. The only construction failure that asserting a
        /// classification can repair.
        unconfirmed: bool,
        /// Underlying cause, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The argument list does not fit the relation's arity.
    #[error("bad arguments for {relation}: {source}")]
    Arity {
        /// Canonical form of the relation.
        relation: String,
        /// The arity violation.
        #[source]
        source: ArityError,
    },

    /// The facade object was invalidated.
    #[error("stale reference to {term}: the object has been invalidated")]
    StaleReference {
        /// Canonical form of the term the object wrapped.
        term: String,
    },

    /// A path addressed into something that has no arguments.
    #[error("not an expression with arguments at {path}")]
    NotAnExpression {
        /// The offending path, rendered as `[i, j, ...]`.
        path: String,
    },

    /// A path index is outside the expression's argument list.
    #[error("argument {index} out of range at {path} (expression has {len} positions)")]
    ArgumentOutOfRange {
        /// The offending path.
        path: String,
        /// The index that was out of range.
        index: usize,
        /// Number of addressable positions, operator included.
        len: usize,
    },

    /// An indexical term could not be evaluated.
    #[error("cannot evaluate indexical {term}: {reason}")]
    Unevaluatable {
        /// Canonical form of the indexical.
        term: String,
        /// Reason reported by the knowledge base.
        reason: String,
    },

    /// An argument could not be converted into a formula position.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with it.
        reason: String,
    },

    /// The knowledge-base collaborator failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl FacadeError {
    /// Returns true for `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, FacadeError::NotFound { .. })
    }

    /// Returns true for `TypeMismatch`.
    #[must_use]
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, FacadeError::TypeMismatch { .. })
    }

    /// Returns true for `TypeConflict`.
    #[must_use]
    pub fn is_type_conflict(&self) -> bool {
        matches!(self, FacadeError::TypeConflict { .. })
    }

    /// Returns true for a `CreateFailure` that asserting a classification
    /// could repair.
    #[must_use]
    pub fn is_unconfirmed(&self) -> bool {
        matches!(self, FacadeError::CreateFailure { unconfirmed: true, .. })
    }

    /// Returns true for `StaleReference`.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, FacadeError::StaleReference { .. })
    }
}

/// Argument-list violations against an [`ArityDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArityError {
    /// The number of arguments does not fit the descriptor.
    #[error("expected {expected} argument(s), got {actual}")]
    WrongCount {
        /// The descriptor that was violated.
        expected: ArityDescriptor,
        /// Number of arguments supplied.
        actual: usize,
    },
    /// Null arguments were supplied where they are forbidden.
    #[error("null argument(s) at position(s) {positions:?}")]
    NullArguments {
        /// 1-based argument positions holding nulls, in order.
        positions: Vec<usize>,
    },
}

/// Failure reported by a [`KnowledgeBase`](crate::KnowledgeBase) collaborator.
#[derive(Debug, Error)]
#[error("knowledge base error: {message}")]
pub struct BackendError {
    /// What failed.
    pub message: String,
    /// Underlying cause, if any.
    #[source]
    pub source: Option<BoxError>,
}

impl BackendError {
    /// Creates an error with a message and no cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping a cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Errors raised while loading a [`FactoryConfig`](crate::FactoryConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for the config schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_both_kinds() {
        let err = FacadeError::TypeConflict {
            term: "Dog".into(),
            found: "Collection".into(),
            requested: Kind::Predicate,
        };
        assert_eq!(
            err.to_string(),
            "Dog is of type Collection, incompatible with requested Predicate"
        );
        assert!(err.is_type_conflict());
        assert!(!err.is_type_mismatch());
    }

    #[test]
    fn create_failure_keeps_its_cause() {
        let err = FacadeError::CreateFailure {
            term: "Dog".into(),
            kind: Kind::Collection,
            reason: "backend refused".into(),
            unconfirmed: false,
            source: Some(Box::new(BackendError::new("read only"))),
        };
        let cause = err.source().map(ToString::to_string);
        assert_eq!(cause.as_deref(), Some("knowledge base error: read only"));
    }

    #[test]
    fn arity_error_reports_every_null_position() {
        let err = ArityError::NullArguments {
            positions: vec![1, 3],
        };
        assert_eq!(err.to_string(), "null argument(s) at position(s) [1, 3]");
    }
}
