//! Opaque references to server-side terms.
//!
//! A [`TermRef`] is an immutable, cheaply clonable handle. The facade never
//! mutates one and never copies the data behind it; equality and hashing
//! follow the knowledge base's notion of identity (external id for constants,
//! assertion handle for assertions, structure for everything else).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use kbf_kinds::TermShape;

/// A primitive (non-term) value appearing in a formula.
#[derive(Debug, Clone)]
pub enum Primitive {
    /// An integer.
    Int(i64),
    /// A floating-point number. Compared and hashed by bit pattern.
    Float(f64),
    /// A string literal.
    Str(String),
}

impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Primitive::Int(a), Primitive::Int(b)) => a == b,
            (Primitive::Float(a), Primitive::Float(b)) => a.to_bits() == b.to_bits(),
            (Primitive::Str(a), Primitive::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Primitive {}

impl Hash for Primitive {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Primitive::Int(v) => v.hash(state),
            Primitive::Float(v) => v.to_bits().hash(state),
            Primitive::Str(v) => v.hash(state),
        }
    }
}

impl From<i64> for Primitive {
    fn from(v: i64) -> Self {
        Primitive::Int(v)
    }
}

impl From<f64> for Primitive {
    fn from(v: f64) -> Self {
        Primitive::Float(v)
    }
}

impl From<&str> for Primitive {
    fn from(v: &str) -> Self {
        Primitive::Str(v.to_owned())
    }
}

impl From<String> for Primitive {
    fn from(v: String) -> Self {
        Primitive::Str(v)
    }
}

/// One argument position of a raw (server-side) expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawArg {
    /// A nested term.
    Term(TermRef),
    /// A primitive value.
    Value(Primitive),
}

impl From<TermRef> for RawArg {
    fn from(t: TermRef) -> Self {
        RawArg::Term(t)
    }
}

impl From<Primitive> for RawArg {
    fn from(v: Primitive) -> Self {
        RawArg::Value(v)
    }
}

/// The data behind a [`TermRef`].
#[derive(Debug)]
pub enum TermData {
    /// A reified constant.
    Constant {
        /// Compact external id; the constant's identity.
        id: String,
        /// Current name.
        name: String,
    },
    /// A logical variable, named without the leading `?`.
    Variable {
        /// Variable name.
        name: String,
    },
    /// A keyword symbol, named without the leading `:`.
    Symbol {
        /// Symbol name.
        name: String,
    },
    /// A non-atomic functional term. `args[0]` is the function.
    NonAtomic {
        /// Functor followed by arguments.
        args: Vec<RawArg>,
    },
    /// A sentence. `args[0]` is the predicate or connective.
    Sentence {
        /// Operator followed by arguments.
        args: Vec<RawArg>,
    },
    /// A stored assertion.
    Assertion {
        /// Server handle; the assertion's identity.
        id: u64,
        /// The asserted sentence, operator first.
        args: Vec<RawArg>,
        /// Name of the context the assertion lives in.
        context: String,
        /// Whether this is a rule (true) or a ground fact (false).
        rule: bool,
    },
}

/// Opaque, immutable handle to a server-side term.
#[derive(Clone)]
pub struct TermRef(Arc<TermData>);

impl TermRef {
    /// Wraps raw term data.
    #[must_use]
    pub fn new(data: TermData) -> Self {
        Self(Arc::new(data))
    }

    /// A constant with the given external id and name.
    pub fn constant(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(TermData::Constant {
            id: id.into(),
            name: name.into(),
        })
    }

    /// A variable.
    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(TermData::Variable { name: name.into() })
    }

    /// A keyword symbol.
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::new(TermData::Symbol { name: name.into() })
    }

    /// A non-atomic term, functor first.
    #[must_use]
    pub fn non_atomic(args: Vec<RawArg>) -> Self {
        Self::new(TermData::NonAtomic { args })
    }

    /// A sentence, operator first.
    #[must_use]
    pub fn sentence(args: Vec<RawArg>) -> Self {
        Self::new(TermData::Sentence { args })
    }

    /// A stored assertion.
    pub fn assertion(id: u64, args: Vec<RawArg>, context: impl Into<String>, rule: bool) -> Self {
        Self::new(TermData::Assertion {
            id,
            args,
            context: context.into(),
            rule,
        })
    }

    /// Returns the underlying data.
    #[must_use]
    pub fn data(&self) -> &TermData {
        &self.0
    }

    /// Returns the structural shape of the term.
    #[must_use]
    pub fn shape(&self) -> TermShape {
        match &*self.0 {
            TermData::Constant { .. } => TermShape::Constant,
            TermData::Variable { .. } => TermShape::Variable,
            TermData::Symbol { .. } => TermShape::Symbol,
            TermData::NonAtomic { .. } => TermShape::NonAtomic,
            TermData::Sentence { .. } => TermShape::Sentence,
            TermData::Assertion { rule: false, .. } => TermShape::GroundAssertion,
            TermData::Assertion { rule: true, .. } => TermShape::RuleAssertion,
        }
    }

    /// Returns the name of a constant, variable or symbol.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &*self.0 {
            TermData::Constant { name, .. }
            | TermData::Variable { name }
            | TermData::Symbol { name } => Some(name),
            _ => None,
        }
    }

    /// Returns the external id of a constant.
    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        match &*self.0 {
            TermData::Constant { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Returns the operator-first argument list of a composite term.
    #[must_use]
    pub fn args(&self) -> Option<&[RawArg]> {
        match &*self.0 {
            TermData::NonAtomic { args }
            | TermData::Sentence { args }
            | TermData::Assertion { args, .. } => Some(args),
            _ => None,
        }
    }

    /// Returns true for assertions, which have no stable canonical string.
    #[must_use]
    pub fn is_assertion(&self) -> bool {
        matches!(&*self.0, TermData::Assertion { .. })
    }

    /// Returns true if both handles share the same allocation.
    #[must_use]
    pub fn ptr_eq(a: &TermRef, b: &TermRef) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl PartialEq for TermRef {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        match (&*self.0, &*other.0) {
            (TermData::Constant { id: a, .. }, TermData::Constant { id: b, .. }) => a == b,
            (TermData::Variable { name: a }, TermData::Variable { name: b }) => a == b,
            (TermData::Symbol { name: a }, TermData::Symbol { name: b }) => a == b,
            (TermData::NonAtomic { args: a }, TermData::NonAtomic { args: b }) => a == b,
            (TermData::Sentence { args: a }, TermData::Sentence { args: b }) => a == b,
            (TermData::Assertion { id: a, .. }, TermData::Assertion { id: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for TermRef {}

impl Hash for TermRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shape().hash(state);
        match &*self.0 {
            TermData::Constant { id, .. } => id.hash(state),
            TermData::Variable { name } | TermData::Symbol { name } => name.hash(state),
            TermData::NonAtomic { args } | TermData::Sentence { args } => args.hash(state),
            TermData::Assertion { id, .. } => id.hash(state),
        }
    }
}

impl fmt::Debug for TermRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TermRef({self})")
    }
}

impl fmt::Display for TermRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::render::sexpr::term_label(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn constants_compare_by_external_id() {
        let a = TermRef::constant("c1", "Dog");
        let renamed = TermRef::constant("c1", "Canine");
        let other = TermRef::constant("c2", "Dog");
        assert_eq!(a, renamed);
        assert_ne!(a, other);
        let set: HashSet<_> = [a, renamed].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn assertions_compare_by_handle() {
        let pred = TermRef::constant("c9", "isa");
        let a = TermRef::assertion(7, vec![RawArg::Term(pred.clone())], "BaseKB", false);
        let b = TermRef::assertion(7, vec![], "OtherMt", false);
        assert_eq!(a, b);
        assert_eq!(a.shape(), TermShape::GroundAssertion);
        assert!(a.is_assertion());
    }

    #[test]
    fn non_atomic_terms_compare_structurally() {
        let f = TermRef::constant("c3", "FruitFn");
        let x = TermRef::constant("c4", "AppleTree");
        let a = TermRef::non_atomic(vec![f.clone().into(), x.clone().into()]);
        let b = TermRef::non_atomic(vec![f.into(), x.into()]);
        assert_eq!(a, b);
        assert!(!TermRef::ptr_eq(&a, &b));
        assert_eq!(a.shape(), TermShape::NonAtomic);
    }

    #[test]
    fn floats_hash_by_bits() {
        let mut set = HashSet::new();
        set.insert(Primitive::Float(1.5));
        assert!(set.contains(&Primitive::Float(1.5)));
        assert_ne!(Primitive::Int(1), Primitive::Float(1.0));
    }
}
