//! Kind resolution against the classification oracle.
//!
//! Resolution runs in three steps:
//!
//! 1. Structural shapes (variables, symbols, sentences, assertions) map
//!    straight to their fixed kind. The oracle is not consulted and the
//!    result is never coercible.
//! 2. Otherwise the oracle's classifications are mapped through the registry.
//!    A classification that is a subkind of the request wins outright; failing
//!    that the most specific mapped kind is compared with the request.
//! 3. An unclassified term falls back to the requested kind, unless that kind
//!    needs a confirming classification, in which case construction fails.

use std::sync::Arc;

use kbf_kinds::{Kind, KindRegistry, TermShape};
use tracing::debug;

use crate::backend::KnowledgeBase;
use crate::error::{FacadeError, Result};
use crate::term::TermRef;

/// Outcome of comparing what a term is with what was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// The term satisfies the request at this (possibly tighter) kind.
    Accept(Kind),
    /// The term is only known at this less specific kind; coercible.
    Mismatch(Kind),
    /// The term is provably something else, named here.
    Conflict(String),
    /// No classification confirms the request.
    Unsatisfied(String),
}

/// Determines the tightest kind a term can be wrapped as.
#[derive(Debug, Clone)]
pub struct TypeResolver {
    registry: Arc<KindRegistry>,
}

impl TypeResolver {
    /// Creates a resolver over `registry`.
    #[must_use]
    pub fn new(registry: Arc<KindRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the registry this resolver consults.
    #[must_use]
    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Resolves `term` against `requested`.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::TypeMismatch`] if the term is only known as an
    ///   ancestor of `requested`.
    /// - [`FacadeError::TypeConflict`] if it is provably unrelated, or is a
    ///   structural kind other than the one requested.
    /// - [`FacadeError::CreateFailure`] if it is unclassified and `requested`
    ///   needs a classification.
    /// - [`FacadeError::Backend`] if the oracle fails.
    pub fn resolve(&self, kb: &dyn KnowledgeBase, term: &TermRef, requested: Kind) -> Result<Kind> {
        match self.judge(kb, term, requested)? {
            Verdict::Accept(kind) => Ok(kind),
            Verdict::Mismatch(found) => Err(FacadeError::TypeMismatch {
                term: term.to_string(),
                found,
                requested,
            }),
            Verdict::Conflict(found) => Err(FacadeError::TypeConflict {
                term: term.to_string(),
                found,
                requested,
            }),
            Verdict::Unsatisfied(reason) => Err(FacadeError::CreateFailure {
                term: term.to_string(),
                kind: requested,
                reason,
                unconfirmed: true,
                source: None,
            }),
        }
    }

    pub(crate) fn judge(
        &self,
        kb: &dyn KnowledgeBase,
        term: &TermRef,
        requested: Kind,
    ) -> Result<Verdict> {
        let shape = term.shape();
        if let Some(fixed) = self.registry.structural_kind(shape) {
            debug!(term = %term, kind = %fixed, "structural resolution");
            return Ok(self.compare(fixed, requested, shape, false));
        }

        let classes = kb.classify(term)?;
        let mapped: Vec<Kind> = classes
            .iter()
            .filter_map(|c| self.registry.kind_for_collection(c))
            .filter(|k| self.registry.admits(*k, shape))
            .collect();
        debug!(term = %term, ?classes, ?mapped, "classified");

        let satisfying = mapped
            .iter()
            .copied()
            .filter(|k| self.registry.is_subkind(*k, requested));
        if let Some(best) = self.tightest(satisfying) {
            return Ok(Verdict::Accept(best));
        }
        if let Some(best) = self.tightest(mapped.iter().copied()) {
            return Ok(self.compare(best, requested, shape, true));
        }
        if !self.registry.admits(requested, shape) {
            return Ok(Verdict::Conflict(shape.to_string()));
        }
        if !classes.is_empty() && shape.is_denotational() {
            // Classified, but only under collections the registry does not
            // know: the term is at least a Term.
            return Ok(self.compare(Kind::Term, requested, shape, true));
        }
        if self.registry.requires_classification(requested) {
            return Ok(Verdict::Unsatisfied(format!(
                "no classification confirms {requested}"
            )));
        }
        Ok(Verdict::Accept(requested))
    }

    /// Folds kinds to the most specific one. Among unrelated kinds the first
    /// one seen is kept.
    fn tightest(&self, kinds: impl Iterator<Item = Kind>) -> Option<Kind> {
        kinds.fold(None, |best, k| match best {
            None => Some(k),
            Some(b) if self.registry.is_subkind(k, b) => Some(k),
            keep => keep,
        })
    }

    fn compare(&self, found: Kind, requested: Kind, shape: TermShape, coercible: bool) -> Verdict {
        if self.registry.is_subkind(found, requested) {
            Verdict::Accept(found)
        } else if coercible
            && self.registry.is_subkind(requested, found)
            && self.registry.admits(requested, shape)
        {
            Verdict::Mismatch(found)
        } else {
            Verdict::Conflict(found.label().to_owned())
        }
    }
}
