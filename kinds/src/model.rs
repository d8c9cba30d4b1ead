//! Core kind model types.
//!
//! These types describe the facade kind lattice as typed Rust data. Every
//! [`KindDef`] is plain `'static` data; the registry that indexes them lives in
//! [`crate::registry`].

use std::fmt;
use std::str::FromStr;

/// Structural category of a server-side term.
///
/// The shape is read directly off a term without a server round-trip and
/// decides which facade kinds may wrap it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TermShape {
    /// An atomic, reified constant (e.g. `Dog`).
    Constant,
    /// A logical variable (e.g. `?X`).
    Variable,
    /// A keyword-like symbol (e.g. `:TRUE`).
    Symbol,
    /// A non-atomic (functional) term such as `(FruitFn AppleTree)`.
    NonAtomic,
    /// A sentence or formula that is not itself a term.
    Sentence,
    /// A ground assertion stored in the knowledge base.
    GroundAssertion,
    /// A rule assertion (contains variables) stored in the knowledge base.
    RuleAssertion,
}

impl TermShape {
    /// All shapes, in declaration order.
    pub const ALL: [TermShape; 7] = [
        TermShape::Constant,
        TermShape::Variable,
        TermShape::Symbol,
        TermShape::NonAtomic,
        TermShape::Sentence,
        TermShape::GroundAssertion,
        TermShape::RuleAssertion,
    ];

    /// Returns true for shapes that denote a term (constants and non-atomic terms).
    #[must_use]
    pub fn is_denotational(self) -> bool {
        matches!(self, TermShape::Constant | TermShape::NonAtomic)
    }

    /// Returns true for assertion shapes.
    #[must_use]
    pub fn is_assertion(self) -> bool {
        matches!(self, TermShape::GroundAssertion | TermShape::RuleAssertion)
    }

    /// Returns the lowercase name of the shape.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TermShape::Constant => "constant",
            TermShape::Variable => "variable",
            TermShape::Symbol => "symbol",
            TermShape::NonAtomic => "non_atomic",
            TermShape::Sentence => "sentence",
            TermShape::GroundAssertion => "ground_assertion",
            TermShape::RuleAssertion => "rule_assertion",
        }
    }
}

impl fmt::Display for TermShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A facade kind: one node of the kind lattice.
///
/// `Object` is the root. A kind is more specific than each of its ancestors;
/// see [`crate::KindRegistry::is_subkind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Kind {
    /// Root of the lattice; any facade object.
    Object,
    /// A denotational term (constant or non-atomic term).
    Term,
    /// A term that is not a collection.
    Individual,
    /// A collection of things.
    Collection,
    /// A context (microtheory) in which assertions hold.
    Context,
    /// Any relation: predicates and functions.
    Relation,
    /// A predicate; heads sentences.
    Predicate,
    /// A predicate of fixed arity two.
    BinaryPredicate,
    /// A denotational function; heads non-atomic terms.
    Function,
    /// A logical variable.
    Variable,
    /// A keyword-like symbol.
    Symbol,
    /// A sentence that is not stored as an assertion.
    Sentence,
    /// Any stored assertion.
    Assertion,
    /// A ground assertion.
    Fact,
    /// A rule assertion.
    Rule,
}

impl Kind {
    /// Every kind, in lattice declaration order.
    pub const ALL: [Kind; 15] = [
        Kind::Object,
        Kind::Term,
        Kind::Individual,
        Kind::Collection,
        Kind::Context,
        Kind::Relation,
        Kind::Predicate,
        Kind::BinaryPredicate,
        Kind::Function,
        Kind::Variable,
        Kind::Symbol,
        Kind::Sentence,
        Kind::Assertion,
        Kind::Fact,
        Kind::Rule,
    ];

    /// Returns the kind's label, which is also its `FromStr` spelling.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Kind::Object => "Object",
            Kind::Term => "Term",
            Kind::Individual => "Individual",
            Kind::Collection => "Collection",
            Kind::Context => "Context",
            Kind::Relation => "Relation",
            Kind::Predicate => "Predicate",
            Kind::BinaryPredicate => "BinaryPredicate",
            Kind::Function => "Function",
            Kind::Variable => "Variable",
            Kind::Symbol => "Symbol",
            Kind::Sentence => "Sentence",
            Kind::Assertion => "Assertion",
            Kind::Fact => "Fact",
            Kind::Rule => "Rule",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown kind label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown kind: {}", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .iter()
            .copied()
            .find(|k| k.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownKind(s.to_owned()))
    }
}

/// Static definition of one kind in the lattice.
#[derive(Debug, Clone)]
pub struct KindDef {
    /// The kind this definition describes.
    pub kind: Kind,
    /// Human-readable label.
    pub label: &'static str,
    /// Description.
    pub comment: &'static str,
    /// Direct parents in the lattice. Empty only for the root.
    pub parents: &'static [Kind],
    /// Name of the knowledge-base collection whose instances are of this kind,
    /// as reported by the classification oracle.
    pub collection: Option<&'static str>,
    /// Term shapes this kind may wrap.
    pub shapes: &'static [TermShape],
    /// Structural kinds are fixed by term shape and can never be coerced.
    pub structural: bool,
    /// Whether membership must be confirmed by the classification oracle.
    /// When false, an unclassified term of an admitted shape satisfies the kind.
    pub requires_classification: bool,
}

/// A group of related kind definitions (one catalog module).
#[derive(Debug, Clone)]
pub struct CatalogModule {
    /// Short name of the module (e.g. `"relational"`).
    pub name: &'static str,
    /// Description of the group.
    pub comment: &'static str,
    /// Kinds defined in this module.
    pub kinds: Vec<KindDef>,
}

/// Shapes that denote terms.
pub const DENOTATIONAL_SHAPES: &[TermShape] = &[TermShape::Constant, TermShape::NonAtomic];
