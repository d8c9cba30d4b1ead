//! Immutable formula trees.
//!
//! A [`FormulaTree`] is either a [`Leaf`] (a primitive value, a facade
//! object, or an empty-collection sentinel) or a node holding an
//! operator-first list of subtrees. Nodes sit behind `Arc`, so every edit
//! builds a new spine and shares the untouched subtrees with the original.
//!
//! Positions are addressed Cyc-style: index 0 is the operator, 1.. are the
//! arguments. An [`ArgPath`] is a sequence of such indices into nested nodes.
//!
//! The operations here are pure. Operations that need to re-canonicalise a
//! non-atomic term through the identity cache live on
//! [`Factory`](crate::Factory).

mod substitute;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub use substitute::Substitution;

use crate::error::{FacadeError, Result};
use crate::object::FacadeObject;
use crate::term::Primitive;

/// Which empty collection a sentinel leaf stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionShape {
    /// An ordered list.
    List,
    /// An unordered set.
    Set,
}

/// A leaf of a formula tree.
#[derive(Debug, Clone)]
pub enum Leaf {
    /// A primitive value.
    Value(Primitive),
    /// A canonical facade object.
    Object(Arc<FacadeObject>),
    /// The empty list or empty set sentinel.
    Empty(CollectionShape),
}

impl PartialEq for Leaf {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Leaf::Value(a), Leaf::Value(b)) => a == b,
            (Leaf::Object(a), Leaf::Object(b)) => Arc::ptr_eq(a, b) || a == b,
            (Leaf::Empty(a), Leaf::Empty(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Leaf {}

impl Hash for Leaf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Leaf::Value(v) => v.hash(state),
            Leaf::Object(o) => o.hash(state),
            Leaf::Empty(s) => s.hash(state),
        }
    }
}

impl From<Primitive> for Leaf {
    fn from(v: Primitive) -> Self {
        Leaf::Value(v)
    }
}

impl From<Arc<FacadeObject>> for Leaf {
    fn from(o: Arc<FacadeObject>) -> Self {
        Leaf::Object(o)
    }
}

impl From<&Arc<FacadeObject>> for Leaf {
    fn from(o: &Arc<FacadeObject>) -> Self {
        Leaf::Object(Arc::clone(o))
    }
}

/// An interior node: operator followed by arguments.
#[derive(Debug)]
pub struct FormulaNode {
    terms: Vec<FormulaTree>,
}

/// An immutable formula or term expression.
#[derive(Debug, Clone)]
pub enum FormulaTree {
    /// A single primitive, object or sentinel.
    Leaf(Leaf),
    /// A composite expression.
    Node(Arc<FormulaNode>),
}

impl From<Leaf> for FormulaTree {
    fn from(leaf: Leaf) -> Self {
        FormulaTree::Leaf(leaf)
    }
}

impl From<Primitive> for FormulaTree {
    fn from(v: Primitive) -> Self {
        FormulaTree::Leaf(Leaf::Value(v))
    }
}

impl From<Arc<FacadeObject>> for FormulaTree {
    fn from(o: Arc<FacadeObject>) -> Self {
        FormulaTree::Leaf(Leaf::Object(o))
    }
}

impl From<&Arc<FacadeObject>> for FormulaTree {
    fn from(o: &Arc<FacadeObject>) -> Self {
        FormulaTree::Leaf(Leaf::Object(Arc::clone(o)))
    }
}

/// A path of positions into nested nodes. Index 0 addresses the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ArgPath(Vec<usize>);

impl ArgPath {
    /// The empty path, addressing the whole tree.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns this path extended by one more index.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Returns the indices, outermost first.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Returns true for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<usize>> for ArgPath {
    fn from(v: Vec<usize>) -> Self {
        Self(v)
    }
}

impl From<&[usize]> for ArgPath {
    fn from(v: &[usize]) -> Self {
        Self(v.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for ArgPath {
    fn from(v: [usize; N]) -> Self {
        Self(v.to_vec())
    }
}

impl fmt::Display for ArgPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl FormulaTree {
    /// Assembles a node from an operator and arguments without any
    /// resolution or arity check. Prefer [`Factory::build`](crate::Factory::build),
    /// which validates the arguments and canonicalises functional terms.
    #[must_use]
    pub fn node(operator: FormulaTree, args: Vec<FormulaTree>) -> Self {
        let mut terms = Vec::with_capacity(args.len() + 1);
        terms.push(operator);
        terms.extend(args);
        Self::from_terms(terms)
    }

    pub(crate) fn from_terms(terms: Vec<FormulaTree>) -> Self {
        FormulaTree::Node(Arc::new(FormulaNode { terms }))
    }

    /// Returns the leaf, if this tree is one.
    #[must_use]
    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            FormulaTree::Leaf(leaf) => Some(leaf),
            FormulaTree::Node(_) => None,
        }
    }

    /// Returns the facade object, if this tree is an object leaf.
    #[must_use]
    pub fn as_object(&self) -> Option<&Arc<FacadeObject>> {
        match self {
            FormulaTree::Leaf(Leaf::Object(o)) => Some(o),
            _ => None,
        }
    }

    /// Returns true for leaves.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, FormulaTree::Leaf(_))
    }

    /// Returns every position of a node, operator first. Empty for leaves.
    #[must_use]
    pub fn positions(&self) -> &[FormulaTree] {
        match self {
            FormulaTree::Leaf(_) => &[],
            FormulaTree::Node(node) => &node.terms,
        }
    }

    /// Returns the operator of a node.
    #[must_use]
    pub fn operator(&self) -> Option<&FormulaTree> {
        self.positions().first()
    }

    /// Returns the operator of a node when it is a facade object.
    #[must_use]
    pub fn operator_object(&self) -> Option<&Arc<FacadeObject>> {
        self.operator().and_then(FormulaTree::as_object)
    }

    /// Returns the arguments of a node, operator excluded.
    #[must_use]
    pub fn args(&self) -> &[FormulaTree] {
        self.positions().get(1..).unwrap_or(&[])
    }

    /// Returns the number of arguments, operator excluded.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args().len()
    }

    /// Returns the subtree at `path`.
    ///
    /// Descends through nodes and through object leaves that wrap composite
    /// terms (non-atomic terms, sentences, assertions).
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::NotAnExpression`] when the path continues into
    /// an atomic leaf, [`FacadeError::ArgumentOutOfRange`] when an index
    /// exceeds the expression, and `StaleReference` when it passes through an
    /// invalidated object.
    pub fn arg_at(&self, path: &ArgPath) -> Result<FormulaTree> {
        let mut current = self.clone();
        for (depth, &index) in path.indices().iter().enumerate() {
            let next = {
                let positions = expression_positions(&current, path, depth)?;
                positions
                    .get(index)
                    .cloned()
                    .ok_or_else(|| FacadeError::ArgumentOutOfRange {
                        path: path.to_string(),
                        index,
                        len: positions.len(),
                    })?
            };
            current = next;
        }
        Ok(current)
    }

    /// Returns a new tree with the subtree at `path` replaced.
    ///
    /// Only descends through nodes; rewriting inside a non-atomic term needs
    /// the identity cache, see [`Factory::replace_arg`](crate::Factory::replace_arg).
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::NotAnExpression`] when the path continues into a
    /// leaf and [`FacadeError::ArgumentOutOfRange`] when an index exceeds the
    /// node.
    pub fn with_arg_at(&self, path: &ArgPath, replacement: FormulaTree) -> Result<FormulaTree> {
        self.replace_at(path, 0, replacement)
    }

    fn replace_at(
        &self,
        path: &ArgPath,
        depth: usize,
        replacement: FormulaTree,
    ) -> Result<FormulaTree> {
        let Some(&index) = path.indices().get(depth) else {
            return Ok(replacement);
        };
        let FormulaTree::Node(node) = self else {
            return Err(FacadeError::NotAnExpression {
                path: ArgPath::from(&path.indices()[..depth]).to_string(),
            });
        };
        let child = node
            .terms
            .get(index)
            .ok_or_else(|| FacadeError::ArgumentOutOfRange {
                path: path.to_string(),
                index,
                len: node.terms.len(),
            })?;
        let replaced = child.replace_at(path, depth + 1, replacement)?;
        Ok(self.with_position(index, replaced))
    }

    /// Returns a copy of this node with one position swapped. Leaves are
    /// returned unchanged.
    pub(crate) fn with_position(&self, index: usize, replacement: FormulaTree) -> FormulaTree {
        match self {
            FormulaTree::Leaf(_) => self.clone(),
            FormulaTree::Node(node) => {
                let mut terms = node.terms.clone();
                if let Some(slot) = terms.get_mut(index) {
                    *slot = replacement;
                }
                FormulaTree::from_terms(terms)
            }
        }
    }

    /// Returns every leaf reachable through nodes, in depth-first order.
    /// Composite object leaves count as single leaves.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        match self {
            FormulaTree::Leaf(leaf) => out.push(leaf),
            FormulaTree::Node(node) => {
                for term in &node.terms {
                    term.collect_leaves(out);
                }
            }
        }
    }

    /// Returns true if `leaf` occurs anywhere in the tree's nodes.
    #[must_use]
    pub fn contains(&self, leaf: &Leaf) -> bool {
        self.leaves().into_iter().any(|l| l == leaf)
    }

    /// Returns the paths at which `leaf` occurs, in depth-first order.
    #[must_use]
    pub fn positions_of(&self, leaf: &Leaf) -> Vec<ArgPath> {
        let mut out = Vec::new();
        self.collect_positions(leaf, &ArgPath::root(), &mut out);
        out
    }

    fn collect_positions(&self, leaf: &Leaf, here: &ArgPath, out: &mut Vec<ArgPath>) {
        match self {
            FormulaTree::Leaf(l) => {
                if l == leaf {
                    out.push(here.clone());
                }
            }
            FormulaTree::Node(node) => {
                for (i, term) in node.terms.iter().enumerate() {
                    term.collect_positions(leaf, &here.child(i), out);
                }
            }
        }
    }

    /// Returns true if every object leaf reachable through nodes is valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.leaves().into_iter().all(|leaf| match leaf {
            Leaf::Object(o) => o.is_valid(),
            _ => true,
        })
    }

    /// Returns true if both trees are the same allocation (nodes) or equal
    /// leaves. Used to detect untouched subtrees cheaply.
    #[must_use]
    pub fn shares(&self, other: &FormulaTree) -> bool {
        match (self, other) {
            (FormulaTree::Node(a), FormulaTree::Node(b)) => Arc::ptr_eq(a, b),
            (FormulaTree::Leaf(a), FormulaTree::Leaf(b)) => a == b,
            _ => false,
        }
    }
}

fn expression_positions<'a>(
    tree: &'a FormulaTree,
    path: &ArgPath,
    depth: usize,
) -> Result<&'a [FormulaTree]> {
    match tree {
        FormulaTree::Node(node) => Ok(&node.terms),
        FormulaTree::Leaf(Leaf::Object(object)) => match object.formula()? {
            Some(formula) => Ok(formula.positions()),
            None => Err(FacadeError::NotAnExpression {
                path: ArgPath::from(&path.indices()[..depth]).to_string(),
            }),
        },
        FormulaTree::Leaf(_) => Err(FacadeError::NotAnExpression {
            path: ArgPath::from(&path.indices()[..depth]).to_string(),
        }),
    }
}

impl PartialEq for FormulaTree {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FormulaTree::Leaf(a), FormulaTree::Leaf(b)) => a == b,
            (FormulaTree::Node(a), FormulaTree::Node(b)) => Arc::ptr_eq(a, b) || a.terms == b.terms,
            _ => false,
        }
    }
}

impl Eq for FormulaTree {}

impl fmt::Display for FormulaTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::render::sexpr::tree(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::test_object;
    use crate::term::TermRef;
    use kbf_kinds::Kind;

    fn obj(id: &str, name: &str, kind: Kind) -> FormulaTree {
        FormulaTree::from(test_object(TermRef::constant(id, name), kind))
    }

    fn sample() -> FormulaTree {
        // (likes Fido (FriendFn Rex) 3)
        let inner = FormulaTree::node(
            obj("c4", "FriendFn", Kind::Function),
            vec![obj("c5", "Rex", Kind::Individual)],
        );
        FormulaTree::node(
            obj("c1", "likes", Kind::Predicate),
            vec![
                obj("c2", "Fido", Kind::Individual),
                inner,
                FormulaTree::from(Primitive::Int(3)),
            ],
        )
    }

    #[test]
    fn operator_and_arguments() {
        let tree = sample();
        assert_eq!(tree.arity(), 3);
        assert_eq!(tree.operator_object().map(|o| o.label()), Some("likes".to_owned()));
        assert_eq!(tree.to_string(), "(likes Fido (FriendFn Rex) 3)");
    }

    #[test]
    fn arg_at_follows_paths() {
        let tree = sample();
        assert_eq!(tree.arg_at(&ArgPath::from([2, 1])).unwrap().to_string(), "Rex");
        assert_eq!(tree.arg_at(&ArgPath::from([0])).unwrap().to_string(), "likes");
        assert_eq!(tree.arg_at(&ArgPath::root()).unwrap(), tree);
    }

    #[test]
    fn arg_at_rejects_leaves_and_overruns() {
        let tree = sample();
        let err = tree.arg_at(&ArgPath::from([1, 0])).unwrap_err();
        assert!(matches!(err, FacadeError::NotAnExpression { ref path } if path == "[1]"));
        let err = tree.arg_at(&ArgPath::from([4])).unwrap_err();
        assert!(matches!(err, FacadeError::ArgumentOutOfRange { index: 4, len: 4, .. }));
    }

    #[test]
    fn with_arg_at_leaves_the_original_untouched() {
        let tree = sample();
        let edited = tree
            .with_arg_at(&ArgPath::from([2, 1]), FormulaTree::from(Primitive::Int(9)))
            .unwrap();
        assert_eq!(edited.to_string(), "(likes Fido (FriendFn 9) 3)");
        assert_eq!(tree.to_string(), "(likes Fido (FriendFn Rex) 3)");
        // The first argument is shared, not copied.
        assert!(edited.args()[0].shares(&tree.args()[0]));
    }

    #[test]
    fn positions_of_finds_every_occurrence() {
        let fido = obj("c2", "Fido", Kind::Individual);
        let tree = FormulaTree::node(
            obj("c6", "and", Kind::Object),
            vec![
                FormulaTree::node(obj("c7", "isa", Kind::BinaryPredicate), vec![fido.clone()]),
                fido.clone(),
            ],
        );
        let leaf = fido.as_leaf().unwrap();
        assert_eq!(
            tree.positions_of(leaf),
            vec![ArgPath::from([1, 1]), ArgPath::from([2])]
        );
        assert!(tree.contains(leaf));
        assert!(!tree.contains(&Leaf::Value(Primitive::Int(0))));
    }

    #[test]
    fn stale_leaves_make_the_tree_invalid() {
        let fido = test_object(TermRef::constant("c2", "Fido"), Kind::Individual);
        let tree = FormulaTree::node(
            obj("c1", "likes", Kind::Predicate),
            vec![FormulaTree::from(&fido)],
        );
        assert!(tree.is_valid());
        fido.invalidate();
        assert!(!tree.is_valid());
    }
}
