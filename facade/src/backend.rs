//! The knowledge-base collaborator interface.
//!
//! Everything that talks to the server sits behind [`KnowledgeBase`]. Calls
//! are synchronous and may block on network I/O; timeouts and cancellation are
//! the implementation's business. The identity cache never holds its lock
//! across one of these calls.

use crate::error::BackendError;
use crate::term::{RawArg, TermRef};

/// Arity metadata as reported by the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArityRange {
    /// Minimum number of arguments, if known.
    pub min: Option<usize>,
    /// Maximum number of arguments, if known.
    pub max: Option<usize>,
}

/// Server-side operations consumed by the facade.
pub trait KnowledgeBase: Send + Sync {
    /// Resolves a human-readable name or compact external id to a term.
    ///
    /// # Errors
    ///
    /// Returns an error only if the server could not be asked; an unknown key
    /// is `Ok(None)`.
    fn lookup(&self, key: &str) -> Result<Option<TermRef>, BackendError>;

    /// Returns the collections `term` is an instance of, most specific first.
    /// An empty list means the term is unclassified.
    ///
    /// # Errors
    ///
    /// Returns an error if the classification query fails.
    fn classify(&self, term: &TermRef) -> Result<Vec<String>, BackendError>;

    /// Creates a new constant named `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses the creation.
    fn create_term(&self, name: &str) -> Result<TermRef, BackendError>;

    /// Asserts that `term` is an instance of `collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the assertion is rejected.
    fn assert_classification(&self, term: &TermRef, collection: &str) -> Result<(), BackendError>;

    /// Evaluates a context-dependent term ("now", "the current user") to a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the term is unevaluatable.
    fn evaluate_indexical(&self, term: &TermRef) -> Result<RawArg, BackendError>;

    /// Returns the fixed arity of a relation, if it has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn arity(&self, relation: &TermRef) -> Result<Option<usize>, BackendError>;

    /// Returns the argument-count bounds of a variable-arity relation.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn arity_range(&self, relation: &TermRef) -> Result<ArityRange, BackendError>;

    /// Returns the documentation comments attached to a term.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn comments(&self, _term: &TermRef) -> Result<Vec<String>, BackendError> {
        Ok(Vec::new())
    }

    /// Returns the collections the term is a quoted instance of, that is,
    /// classifications of the term's syntax rather than of what it denotes.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn quoted_isa(&self, _term: &TermRef) -> Result<Vec<String>, BackendError> {
        Ok(Vec::new())
    }
}
