//! Leaf substitution over formula trees.

use std::collections::HashMap;

use super::{FormulaTree, Leaf};

/// A mapping from leaves to replacement subtrees.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    map: HashMap<Leaf, FormulaTree>,
}

impl Substitution {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `from` to `to`, returning the previous replacement if any.
    pub fn insert(
        &mut self,
        from: impl Into<Leaf>,
        to: impl Into<FormulaTree>,
    ) -> Option<FormulaTree> {
        self.map.insert(from.into(), to.into())
    }

    /// Returns the replacement for `leaf`.
    #[must_use]
    pub fn get(&self, leaf: &Leaf) -> Option<&FormulaTree> {
        self.map.get(leaf)
    }

    /// Returns true if nothing is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of mapped leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }
}

impl<K: Into<Leaf>, V: Into<FormulaTree>> FromIterator<(K, V)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl FormulaTree {
    /// Returns a new tree with every mapped leaf replaced.
    ///
    /// Replacement is simultaneous: replacements are not themselves
    /// substituted again. Subtrees containing no mapped leaf are shared with
    /// the original rather than copied. Object leaves wrapping composite terms
    /// are replaced only as a whole; see
    /// [`Factory::substitute_deep`](crate::Factory::substitute_deep) for
    /// rewriting inside them.
    #[must_use]
    pub fn substitute(&self, mapping: &Substitution) -> FormulaTree {
        if mapping.is_empty() {
            return self.clone();
        }
        self.substitute_with(&mut |leaf| mapping.get(leaf).cloned())
    }

    /// Rewrites leaves with `f`, rebuilding only the spines that changed.
    pub(crate) fn substitute_with<F>(&self, f: &mut F) -> FormulaTree
    where
        F: FnMut(&Leaf) -> Option<FormulaTree>,
    {
        match self {
            FormulaTree::Leaf(leaf) => f(leaf).unwrap_or_else(|| self.clone()),
            FormulaTree::Node(node) => {
                let mut changed = false;
                let terms: Vec<FormulaTree> = node
                    .terms
                    .iter()
                    .map(|term| {
                        let next = term.substitute_with(f);
                        if !next.shares(term) {
                            changed = true;
                        }
                        next
                    })
                    .collect();
                if changed {
                    FormulaTree::from_terms(terms)
                } else {
                    self.clone()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::test_object;
    use crate::term::{Primitive, TermRef};
    use kbf_kinds::Kind;

    fn leaf(id: &str, name: &str, kind: Kind) -> FormulaTree {
        FormulaTree::from(test_object(TermRef::constant(id, name), kind))
    }

    #[test]
    fn replaces_matched_leaves_only() {
        let pred = leaf("c1", "pred", Kind::Predicate);
        let a = leaf("c2", "a", Kind::Individual);
        let a2 = leaf("c3", "a2", Kind::Individual);
        let b = leaf("c4", "b", Kind::Individual);
        let tree = FormulaTree::node(pred, vec![a.clone(), b]);

        let mut mapping = Substitution::new();
        mapping.insert(a.as_leaf().cloned().unwrap(), a2);
        let out = tree.substitute(&mapping);

        assert_eq!(out.to_string(), "(pred a2 b)");
        assert_eq!(tree.to_string(), "(pred a b)");
        assert!(out.args()[1].shares(&tree.args()[1]));
    }

    #[test]
    fn untouched_trees_are_shared() {
        let inner = FormulaTree::node(
            leaf("c5", "FruitFn", Kind::Function),
            vec![FormulaTree::from(Primitive::Int(1))],
        );
        let tree = FormulaTree::node(leaf("c1", "pred", Kind::Predicate), vec![inner]);
        let mapping: Substitution = [(Primitive::Int(2), Primitive::Int(3))].into_iter().collect();
        let out = tree.substitute(&mapping);
        assert!(out.shares(&tree));
    }

    #[test]
    fn replacement_is_simultaneous() {
        let tree = FormulaTree::node(
            leaf("c1", "pred", Kind::Predicate),
            vec![FormulaTree::from(Primitive::Int(1)), FormulaTree::from(Primitive::Int(2))],
        );
        let mapping: Substitution = [
            (Primitive::Int(1), Primitive::Int(2)),
            (Primitive::Int(2), Primitive::Int(1)),
        ]
        .into_iter()
        .collect();
        assert_eq!(tree.substitute(&mapping).to_string(), "(pred 2 1)");
    }

    #[test]
    fn identity_mappings_preserve_the_tree() {
        let a = leaf("c2", "a", Kind::Individual);
        let tree = FormulaTree::node(leaf("c1", "pred", Kind::Predicate), vec![a.clone()]);
        assert_eq!(tree.substitute(&Substitution::new()), tree);
        let mapping: Substitution = [(a.as_leaf().cloned().unwrap(), a.clone())]
            .into_iter()
            .collect();
        assert_eq!(tree.substitute(&mapping), tree);
    }
}
