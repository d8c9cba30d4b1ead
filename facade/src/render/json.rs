//! JSON rendering of formula trees and facade objects.
//!
//! Nodes become arrays, operator first. Object leaves become
//! `{"term", "kind", "shape", "valid"}` maps; empty sentinels become
//! `{"empty": "list" | "set"}`.

use serde_json::{json, Map, Value};

use crate::formula::{CollectionShape, FormulaTree, Leaf};
use crate::object::FacadeObject;
use crate::term::Primitive;

/// Renders a facade object. Stale objects are rendered too, flagged invalid.
#[must_use]
pub fn object_to_json(object: &FacadeObject) -> Value {
    let mut map = Map::new();
    map.insert("term".to_owned(), Value::String(object.label()));
    map.insert("kind".to_owned(), json!(object.kind()));
    map.insert("shape".to_owned(), json!(object.shape()));
    map.insert("valid".to_owned(), Value::Bool(object.is_valid()));
    Value::Object(map)
}

/// Renders a primitive value. Non-finite floats become strings.
#[must_use]
pub fn primitive_to_json(value: &Primitive) -> Value {
    match value {
        Primitive::Int(v) => json!(v),
        Primitive::Float(v) => serde_json::Number::from_f64(*v)
            .map_or_else(|| Value::String(v.to_string()), Value::Number),
        Primitive::Str(s) => Value::String(s.clone()),
    }
}

/// Renders a formula tree.
#[must_use]
pub fn tree_to_json(tree: &FormulaTree) -> Value {
    match tree {
        FormulaTree::Leaf(Leaf::Value(v)) => primitive_to_json(v),
        FormulaTree::Leaf(Leaf::Object(o)) => object_to_json(o),
        FormulaTree::Leaf(Leaf::Empty(shape)) => {
            let name = match shape {
                CollectionShape::List => "list",
                CollectionShape::Set => "set",
            };
            json!({ "empty": name })
        }
        FormulaTree::Node(_) => Value::Array(tree.positions().iter().map(tree_to_json).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::test_object;
    use crate::term::TermRef;
    use kbf_kinds::Kind;

    #[test]
    fn renders_nodes_as_arrays() {
        let pred = test_object(TermRef::constant("c1", "likes"), Kind::BinaryPredicate);
        let tree = FormulaTree::node(
            FormulaTree::from(pred),
            vec![
                FormulaTree::from(Primitive::Int(1)),
                FormulaTree::from(Leaf::Empty(CollectionShape::Set)),
            ],
        );
        let value = tree_to_json(&tree);
        assert_eq!(value[0]["term"], "likes");
        assert_eq!(value[0]["kind"], "BinaryPredicate");
        assert_eq!(value[0]["shape"], "constant");
        assert_eq!(value[1], 1);
        assert_eq!(value[2]["empty"], "set");
    }

    #[test]
    fn non_finite_floats_become_strings() {
        assert_eq!(primitive_to_json(&Primitive::Float(f64::NAN)), Value::String("NaN".into()));
    }
}
