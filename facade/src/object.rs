//! Facade objects and the constructor dispatch table.
//!
//! A [`FacadeObject`] wraps one [`TermRef`] with the tightest kind the
//! resolver could establish. Its kind never changes; a tighter resolution of
//! the same term produces a new object that supersedes this one in the cache.
//!
//! Validity is a one-way flag. Once an object is invalidated every accessor
//! that would hand out its term fails with
//! [`FacadeError::StaleReference`] instead of falling back to the server.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use kbf_kinds::{Kind, KindRegistry, TermShape};

use crate::arity::ArityDescriptor;
use crate::error::{FacadeError, Result};
use crate::formula::FormulaTree;
use crate::term::TermRef;

/// Typed, identity-stable local representation of a knowledge-base term.
pub struct FacadeObject {
    core: TermRef,
    kind: Kind,
    valid: AtomicBool,
    arity: Option<OnceLock<ArityDescriptor>>,
    formula: Option<FormulaTree>,
}

impl FacadeObject {
    /// Returns the wrapped term.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::StaleReference`] if the object was invalidated.
    pub fn term(&self) -> Result<&TermRef> {
        self.ensure_valid()?;
        Ok(&self.core)
    }

    /// Returns the object's kind.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Returns the structural shape of the wrapped term.
    #[must_use]
    pub fn shape(&self) -> TermShape {
        self.core.shape()
    }

    /// Returns false once the object has been invalidated.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Fails fast on an invalidated object.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::StaleReference`] if the object was invalidated.
    pub fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(FacadeError::StaleReference {
                term: self.label(),
            })
        }
    }

    /// Returns the formula behind a composite term (non-atomic term, sentence
    /// or assertion), operator first.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::StaleReference`] if the object was invalidated.
    pub fn formula(&self) -> Result<Option<&FormulaTree>> {
        self.ensure_valid()?;
        Ok(self.formula.as_ref())
    }

    /// Returns true if this object's kind is `kind` or more specific.
    #[must_use]
    pub fn is_kind(&self, kind: Kind, registry: &KindRegistry) -> bool {
        registry.is_subkind(self.kind, kind)
    }

    /// Returns the arity if it has already been resolved.
    #[must_use]
    pub fn cached_arity(&self) -> Option<ArityDescriptor> {
        self.arity.as_ref().and_then(|cell| cell.get().copied())
    }

    /// Returns true if both handles are the very same object.
    #[must_use]
    pub fn same(a: &Arc<FacadeObject>, b: &Arc<FacadeObject>) -> bool {
        Arc::ptr_eq(a, b)
    }

    /// Returns a human-readable label for the wrapped term. Works on stale
    /// objects, for diagnostics.
    #[must_use]
    pub fn label(&self) -> String {
        self.core.to_string()
    }

    /// Returns a view exposing relation capabilities, if this is a relation.
    #[must_use]
    pub fn as_relation(&self) -> Option<crate::capability::RelationView<'_>> {
        self.arity
            .as_ref()
            .map(|_| crate::capability::RelationView::new(self))
    }

    /// Returns a view exposing term capabilities, if this wraps a
    /// denotational term.
    #[must_use]
    pub fn as_term(&self) -> Option<crate::capability::TermView<'_>> {
        self.core
            .shape()
            .is_denotational()
            .then(|| crate::capability::TermView::new(self))
    }

    pub(crate) fn core(&self) -> &TermRef {
        &self.core
    }

    pub(crate) fn arity_cell(&self) -> Option<&OnceLock<ArityDescriptor>> {
        self.arity.as_ref()
    }

    /// Flips the validity flag. Returns true if this call did the transition.
    pub(crate) fn invalidate(&self) -> bool {
        self.valid.swap(false, Ordering::AcqRel)
    }
}

impl PartialEq for FacadeObject {
    fn eq(&self, other: &Self) -> bool {
        self.core == other.core
    }
}

impl Eq for FacadeObject {}

impl Hash for FacadeObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.core.hash(state);
    }
}

impl fmt::Debug for FacadeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacadeObject")
            .field("term", &self.core)
            .field("kind", &self.kind)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl fmt::Display for FacadeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.core, f)
    }
}

/// Inputs to a constructor.
pub(crate) struct Construction {
    pub term: TermRef,
    pub kind: Kind,
    pub formula: Option<FormulaTree>,
}

type Constructor = fn(Construction) -> Result<FacadeObject>;

/// Static dispatch from kind to constructor.
pub(crate) struct ConstructorTable {
    table: HashMap<Kind, Constructor>,
}

impl ConstructorTable {
    /// Assigns a constructor to every kind in the registry by family.
    pub fn standard(registry: &KindRegistry) -> Self {
        let table = registry
            .kinds()
            .map(|def| {
                let constructor: Constructor = if registry.is_subkind(def.kind, Kind::Relation) {
                    construct_relation
                } else if def.structural && !def.shapes.is_empty() {
                    construct_structural
                } else {
                    construct_term
                };
                (def.kind, constructor)
            })
            .collect();
        Self { table }
    }

    pub fn construct(&self, c: Construction) -> Result<FacadeObject> {
        match self.table.get(&c.kind) {
            Some(constructor) => constructor(c),
            None => Err(FacadeError::CreateFailure {
                term: c.term.to_string(),
                kind: c.kind,
                reason: "no constructor registered for this kind".to_owned(),
                unconfirmed: false,
                source: None,
            }),
        }
    }
}

fn needs_formula(shape: TermShape) -> bool {
    matches!(
        shape,
        TermShape::NonAtomic
            | TermShape::Sentence
            | TermShape::GroundAssertion
            | TermShape::RuleAssertion
    )
}

fn checked_formula(c: &Construction) -> Result<()> {
    let shape = c.term.shape();
    if needs_formula(shape) && c.formula.is_none() {
        return Err(FacadeError::CreateFailure {
            term: c.term.to_string(),
            kind: c.kind,
            reason: format!("a {shape} term needs its formula"),
            unconfirmed: false,
            source: None,
        });
    }
    Ok(())
}

fn construct_term(c: Construction) -> Result<FacadeObject> {
    checked_formula(&c)?;
    Ok(FacadeObject {
        core: c.term,
        kind: c.kind,
        valid: AtomicBool::new(true),
        arity: None,
        formula: c.formula,
    })
}

fn construct_relation(c: Construction) -> Result<FacadeObject> {
    checked_formula(&c)?;
    Ok(FacadeObject {
        core: c.term,
        kind: c.kind,
        valid: AtomicBool::new(true),
        arity: Some(OnceLock::new()),
        formula: c.formula,
    })
}

fn construct_structural(c: Construction) -> Result<FacadeObject> {
    checked_formula(&c)?;
    if c.term.shape().is_denotational() {
        return Err(FacadeError::CreateFailure {
            term: c.term.to_string(),
            kind: c.kind,
            reason: "structural kinds never wrap denotational terms".to_owned(),
            unconfirmed: false,
            source: None,
        });
    }
    Ok(FacadeObject {
        core: c.term,
        kind: c.kind,
        valid: AtomicBool::new(true),
        arity: None,
        formula: c.formula,
    })
}

#[cfg(test)]
pub(crate) fn test_object(term: TermRef, kind: Kind) -> Arc<FacadeObject> {
    let arity = matches!(
        kind,
        Kind::Relation | Kind::Predicate | Kind::BinaryPredicate | Kind::Function
    )
    .then(OnceLock::new);
    Arc::new(FacadeObject {
        core: term,
        kind,
        valid: AtomicBool::new(true),
        arity,
        formula: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::RawArg;

    #[test]
    fn invalidation_is_terminal_and_fails_fast() {
        let obj = test_object(TermRef::constant("c1", "Dog"), Kind::Collection);
        assert!(obj.term().is_ok());
        assert!(obj.invalidate());
        assert!(!obj.invalidate());
        assert!(!obj.is_valid());
        assert!(obj.term().unwrap_err().is_stale());
        assert!(obj.formula().unwrap_err().is_stale());
        assert_eq!(obj.label(), "Dog");
    }

    #[test]
    fn equality_follows_the_term() {
        let a = test_object(TermRef::constant("c1", "Dog"), Kind::Collection);
        let b = test_object(TermRef::constant("c1", "Dog"), Kind::Term);
        assert_eq!(*a, *b);
        assert!(!FacadeObject::same(&a, &b));
    }

    #[test]
    fn relation_view_only_for_relations() {
        let pred = test_object(TermRef::constant("c2", "likes"), Kind::Predicate);
        let dog = test_object(TermRef::constant("c1", "Dog"), Kind::Collection);
        assert!(pred.as_relation().is_some());
        assert!(dog.as_relation().is_none());
        assert!(dog.as_term().is_some());
        let var = test_object(TermRef::variable("X"), Kind::Variable);
        assert!(var.as_term().is_none());
    }

    #[test]
    fn dispatch_table_covers_every_kind() {
        let reg = KindRegistry::standard();
        let table = ConstructorTable::standard(&reg);
        for kind in Kind::ALL {
            assert!(table.table.contains_key(&kind), "no constructor for {kind}");
        }
    }

    #[test]
    fn composite_terms_need_a_formula() {
        let reg = KindRegistry::standard();
        let table = ConstructorTable::standard(&reg);
        let nat = TermRef::non_atomic(vec![RawArg::Term(TermRef::constant("c3", "FruitFn"))]);
        let err = table
            .construct(Construction {
                term: nat,
                kind: Kind::Individual,
                formula: None,
            })
            .unwrap_err();
        assert!(matches!(err, FacadeError::CreateFailure { .. }));
    }

    #[test]
    fn relation_constructor_attaches_an_arity_cell() {
        let reg = KindRegistry::standard();
        let table = ConstructorTable::standard(&reg);
        let obj = table
            .construct(Construction {
                term: TermRef::constant("c2", "likes"),
                kind: Kind::BinaryPredicate,
                formula: None,
            })
            .unwrap();
        assert!(obj.arity_cell().is_some());
        assert_eq!(obj.cached_arity(), None);
    }
}
