//! Property-based tests for formula substitution and arity validation.

use std::sync::Arc;

use kbf_memory::MemoryKb;
use kbfacade::{
    ArityDescriptor, ArityError, Factory, FacadeObject, FormulaTree, Kind, Leaf, Primitive, Substitution,
};
use proptest::prelude::*;

/// A tree skeleton; materialised with a real operator object.
#[derive(Debug, Clone)]
enum Shape {
    Int(i64),
    Text(String),
    Node(Vec<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Shape::Int),
        "[a-z]{0,4}".prop_map(Shape::Text),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Shape::Node)
    })
}

fn operator() -> Arc<FacadeObject> {
    let kb = Arc::new(MemoryKb::animals().unwrap());
    Factory::new(kb).get("and", Kind::Relation).unwrap()
}

fn materialise(shape: &Shape, op: &Arc<FacadeObject>) -> FormulaTree {
    match shape {
        Shape::Int(v) => FormulaTree::from(Primitive::Int(*v)),
        Shape::Text(s) => FormulaTree::from(Primitive::Str(s.clone())),
        Shape::Node(children) => FormulaTree::node(
            FormulaTree::from(op),
            children.iter().map(|c| materialise(c, op)).collect(),
        ),
    }
}

// =============================================================================
// Substitution Identity Law
// =============================================================================

proptest! {
    /// substitute(tree, {}) = tree
    #[test]
    fn prop_empty_substitution_is_identity(s in shape()) {
        let tree = materialise(&s, &operator());
        let out = tree.substitute(&Substitution::new());
        prop_assert_eq!(&out, &tree);
        prop_assert!(out.shares(&tree));
    }

    /// substitute(tree, {x: x}) = tree
    #[test]
    fn prop_self_substitution_is_identity(s in shape(), x: i64) {
        let tree = materialise(&s, &operator());
        let mapping: Substitution = [(Primitive::Int(x), Primitive::Int(x))].into_iter().collect();
        prop_assert_eq!(tree.substitute(&mapping), tree.clone());
        prop_assert_eq!(tree.substitute(&mapping).to_string(), tree.to_string());
    }

    /// Substitution never changes the skeleton, only leaf values.
    #[test]
    fn prop_substitution_preserves_positions(s in shape(), from: i64, to: i64) {
        let tree = materialise(&s, &operator());
        let leaf = Leaf::Value(Primitive::Int(from));
        let before = tree.positions_of(&leaf);
        let mapping: Substitution = [(Primitive::Int(from), Primitive::Int(to))].into_iter().collect();
        let out = tree.substitute(&mapping);
        prop_assert_eq!(out.leaves().len(), tree.leaves().len());
        if from != to {
            prop_assert!(!out.contains(&leaf));
            prop_assert!(out.positions_of(&Leaf::Value(Primitive::Int(to))).len() >= before.len());
        }
    }
}

// =============================================================================
// Arity Law
// =============================================================================

proptest! {
    /// Fixed(n) accepts exactly n arguments.
    #[test]
    fn prop_fixed_arity_accepts_only_n(n in 0usize..8, len in 0usize..10) {
        let args = vec![Some(()); len];
        prop_assert_eq!(ArityDescriptor::Fixed(n).validate(&args, true).is_ok(), len == n);
    }

    /// Variable(min, max) accepts exactly the lengths in [min, max].
    #[test]
    fn prop_variable_arity_accepts_its_range(min in 0usize..5, span in 0usize..5, len in 0usize..12) {
        let max = min + span;
        let arity = ArityDescriptor::Variable { min: Some(min), max: Some(max) };
        let args = vec![Some(()); len];
        prop_assert_eq!(arity.validate(&args, true).is_ok(), (min..=max).contains(&len));
    }

    /// Unknown bounds trust the caller's length.
    #[test]
    fn prop_unknown_bounds_accept_any_length(len in 0usize..20) {
        let args = vec![Some(()); len];
        let open = ArityDescriptor::Variable { min: None, max: None };
        prop_assert!(open.validate(&args, true).is_ok());
        prop_assert!(ArityDescriptor::Unknown.validate(&args, true).is_ok());
    }

    /// Every null position is reported, 1-based, in order.
    #[test]
    fn prop_all_null_positions_reported(mask in prop::collection::vec(any::<bool>(), 0..10)) {
        let args: Vec<Option<()>> = mask.iter().map(|null| (!null).then_some(())).collect();
        let expected: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter(|(_, null)| **null)
            .map(|(i, _)| i + 1)
            .collect();
        let result = ArityDescriptor::Unknown.validate(&args, true);
        if expected.is_empty() {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(ArityError::NullArguments { positions: expected }));
        }
        prop_assert!(ArityDescriptor::Unknown.validate(&args, false).is_ok());
    }
}

