//! The kind registry: an immutable index over the catalog.
//!
//! A [`KindRegistry`] is built once and shared by reference (typically behind
//! an `Arc`). It answers every lattice question the resolver and the identity
//! cache ask: ancestry, relatedness, specificity, and the mapping between
//! kinds and knowledge-base collection names.

use std::collections::{BTreeSet, HashMap};

use crate::catalog;
use crate::model::{CatalogModule, Kind, KindDef, TermShape};

/// Immutable index over a set of kind definitions.
#[derive(Debug, Clone)]
pub struct KindRegistry {
    modules: Vec<CatalogModule>,
    by_kind: HashMap<Kind, (usize, usize)>,
    by_collection: HashMap<&'static str, Kind>,
    ancestors: HashMap<Kind, BTreeSet<Kind>>,
}

impl KindRegistry {
    /// Returns the standard registry.
    ///
    /// Assembly order: `structural → denotational → relational`.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_modules(vec![
            catalog::structural::module(),
            catalog::denotational::module(),
            catalog::relational::module(),
        ])
    }

    /// Builds a registry from arbitrary catalog modules.
    ///
    /// No validation is performed here; a malformed catalog (unknown parents,
    /// cycles, duplicate collections) still yields a registry whose queries
    /// are total. Well-formedness is checked separately by the conformance
    /// validators.
    #[must_use]
    pub fn from_modules(modules: Vec<CatalogModule>) -> Self {
        let mut by_kind = HashMap::new();
        let mut by_collection = HashMap::new();
        for (m, module) in modules.iter().enumerate() {
            for (k, def) in module.kinds.iter().enumerate() {
                by_kind.entry(def.kind).or_insert((m, k));
                if let Some(collection) = def.collection {
                    by_collection.entry(collection).or_insert(def.kind);
                }
            }
        }
        let mut registry = Self {
            modules,
            by_kind,
            by_collection,
            ancestors: HashMap::new(),
        };
        let ancestors = registry
            .kinds()
            .map(|def| (def.kind, registry.collect_ancestors(def.kind)))
            .collect();
        registry.ancestors = ancestors;
        registry
    }

    fn collect_ancestors(&self, kind: Kind) -> BTreeSet<Kind> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![kind];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(def) = self.def(current) {
                stack.extend(def.parents.iter().copied());
            }
        }
        seen
    }

    /// Returns the catalog modules in assembly order.
    #[must_use]
    pub fn modules(&self) -> &[CatalogModule] {
        &self.modules
    }

    /// Iterates over every kind definition in assembly order.
    pub fn kinds(&self) -> impl Iterator<Item = &KindDef> {
        self.modules.iter().flat_map(|m| m.kinds.iter())
    }

    /// Returns the number of registered kinds.
    #[must_use]
    pub fn kind_count(&self) -> usize {
        self.by_kind.len()
    }

    /// Looks up a kind's definition. Returns `None` if the kind is not registered.
    #[must_use]
    pub fn def(&self, kind: Kind) -> Option<&KindDef> {
        let (m, k) = *self.by_kind.get(&kind)?;
        self.modules.get(m)?.kinds.get(k)
    }

    /// Returns the reflexive-transitive ancestors of `kind` (including itself).
    #[must_use]
    pub fn ancestors(&self, kind: Kind) -> BTreeSet<Kind> {
        self.ancestors
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| BTreeSet::from([kind]))
    }

    /// Returns true if `sub` is `sup` or a descendant of it.
    #[must_use]
    pub fn is_subkind(&self, sub: Kind, sup: Kind) -> bool {
        sub == sup
            || self
                .ancestors
                .get(&sub)
                .is_some_and(|ancestors| ancestors.contains(&sup))
    }

    /// Returns true if either kind is a subkind of the other.
    #[must_use]
    pub fn related(&self, a: Kind, b: Kind) -> bool {
        self.is_subkind(a, b) || self.is_subkind(b, a)
    }

    /// Returns the longest parent chain from `kind` up to the root.
    ///
    /// Used to rank unrelated kinds by specificity. The root has depth 0.
    #[must_use]
    pub fn depth(&self, kind: Kind) -> usize {
        self.depth_guarded(kind, &mut Vec::new())
    }

    fn depth_guarded(&self, kind: Kind, path: &mut Vec<Kind>) -> usize {
        if path.contains(&kind) {
            return 0;
        }
        let Some(def) = self.def(kind) else {
            return 0;
        };
        path.push(kind);
        let depth = def
            .parents
            .iter()
            .map(|p| self.depth_guarded(*p, path) + 1)
            .max()
            .unwrap_or(0);
        path.pop();
        depth
    }

    /// Returns whichever of `a` and `b` is more specific, or `None` if they
    /// are unrelated. Ties (equal kinds) return `a`.
    #[must_use]
    pub fn more_specific(&self, a: Kind, b: Kind) -> Option<Kind> {
        if self.is_subkind(a, b) {
            Some(a)
        } else if self.is_subkind(b, a) {
            Some(b)
        } else {
            None
        }
    }

    /// Maps a knowledge-base collection name to the kind whose instances it holds.
    #[must_use]
    pub fn kind_for_collection(&self, collection: &str) -> Option<Kind> {
        self.by_collection.get(collection).copied()
    }

    /// Returns the collection that must be asserted to make a term of `kind`.
    #[must_use]
    pub fn collection_for(&self, kind: Kind) -> Option<&'static str> {
        self.def(kind).and_then(|d| d.collection)
    }

    /// Returns the fixed structural kind for a term shape, if the shape is
    /// resolved without consulting the oracle.
    #[must_use]
    pub fn structural_kind(&self, shape: TermShape) -> Option<Kind> {
        self.kinds()
            .filter(|d| d.structural && d.shapes.contains(&shape))
            .max_by_key(|d| self.depth(d.kind))
            .map(|d| d.kind)
    }

    /// Returns true if `kind` may wrap a term of the given shape.
    #[must_use]
    pub fn admits(&self, kind: Kind, shape: TermShape) -> bool {
        self.def(kind).is_some_and(|d| d.shapes.contains(&shape))
    }

    /// Returns true if `kind` is structural (fixed by term shape).
    #[must_use]
    pub fn is_structural(&self, kind: Kind) -> bool {
        self.def(kind).is_some_and(|d| d.structural)
    }

    /// Returns true if `kind` needs oracle confirmation before it can wrap a term.
    #[must_use]
    pub fn requires_classification(&self, kind: Kind) -> bool {
        self.def(kind).is_some_and(|d| d.requires_classification)
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subkind_is_reflexive_and_transitive() {
        let reg = KindRegistry::standard();
        assert!(reg.is_subkind(Kind::Predicate, Kind::Predicate));
        assert!(reg.is_subkind(Kind::BinaryPredicate, Kind::Relation));
        assert!(reg.is_subkind(Kind::BinaryPredicate, Kind::Object));
        assert!(!reg.is_subkind(Kind::Relation, Kind::Predicate));
    }

    #[test]
    fn collections_and_functions_are_unrelated() {
        let reg = KindRegistry::standard();
        assert!(!reg.related(Kind::Collection, Kind::Function));
        assert!(reg.related(Kind::Function, Kind::Term));
        assert_eq!(reg.more_specific(Kind::Relation, Kind::Predicate), Some(Kind::Predicate));
        assert_eq!(reg.more_specific(Kind::Collection, Kind::Predicate), None);
    }

    #[test]
    fn depth_ranks_specificity() {
        let reg = KindRegistry::standard();
        assert_eq!(reg.depth(Kind::Object), 0);
        assert_eq!(reg.depth(Kind::Term), 1);
        assert_eq!(reg.depth(Kind::BinaryPredicate), 5);
    }

    #[test]
    fn collection_mapping_is_bidirectional() {
        let reg = KindRegistry::standard();
        assert_eq!(reg.kind_for_collection("Predicate"), Some(Kind::Predicate));
        assert_eq!(reg.kind_for_collection("Microtheory"), Some(Kind::Context));
        assert_eq!(reg.collection_for(Kind::Function), Some("Function-Denotational"));
        assert_eq!(reg.kind_for_collection("Dog"), None);
        assert_eq!(reg.collection_for(Kind::Variable), None);
    }

    #[test]
    fn structural_shapes_pick_the_tightest_kind() {
        let reg = KindRegistry::standard();
        assert_eq!(reg.structural_kind(TermShape::Variable), Some(Kind::Variable));
        assert_eq!(reg.structural_kind(TermShape::GroundAssertion), Some(Kind::Fact));
        assert_eq!(reg.structural_kind(TermShape::RuleAssertion), Some(Kind::Rule));
        assert_eq!(reg.structural_kind(TermShape::Constant), None);
        assert_eq!(reg.structural_kind(TermShape::NonAtomic), None);
    }

    #[test]
    fn admitted_shapes() {
        let reg = KindRegistry::standard();
        assert!(reg.admits(Kind::Predicate, TermShape::NonAtomic));
        assert!(!reg.admits(Kind::Predicate, TermShape::Variable));
        assert!(reg.admits(Kind::Object, TermShape::Symbol));
    }

    #[test]
    fn cyclic_catalog_does_not_hang() {
        let module = CatalogModule {
            name: "broken",
            comment: "",
            kinds: vec![
                KindDef {
                    kind: Kind::Term,
                    label: "Term",
                    comment: "",
                    parents: &[Kind::Individual],
                    collection: None,
                    shapes: &[],
                    structural: false,
                    requires_classification: false,
                },
                KindDef {
                    kind: Kind::Individual,
                    label: "Individual",
                    comment: "",
                    parents: &[Kind::Term],
                    collection: None,
                    shapes: &[],
                    structural: false,
                    requires_classification: false,
                },
            ],
        };
        let reg = KindRegistry::from_modules(vec![module]);
        assert!(reg.is_subkind(Kind::Term, Kind::Individual));
        assert!(reg.is_subkind(Kind::Individual, Kind::Term));
        let _ = reg.depth(Kind::Term);
    }
}
