//! Canonical s-expression rendering.
//!
//! Constants render as their name, variables as `?X`, symbols as `:KEY`,
//! composite terms as parenthesised operator-first lists. Strings are quoted
//! with `\` and `"` escaped; floats always carry a decimal point so they never
//! collide with integers.

use crate::formula::{CollectionShape, FormulaTree, Leaf};
use crate::term::{Primitive, RawArg, TermData, TermRef};

/// Renders a term for display. Total: assertions render with their handle.
#[must_use]
pub fn term_label(term: &TermRef) -> String {
    let mut out = String::new();
    write_term(term, &mut out);
    out
}

/// Returns the canonical string of a term, or `None` for assertions, whose
/// identity is their server handle rather than their text.
#[must_use]
pub fn canonical(term: &TermRef) -> Option<String> {
    (!term.is_assertion()).then(|| term_label(term))
}

/// Renders a primitive value.
#[must_use]
pub fn primitive(value: &Primitive) -> String {
    match value {
        Primitive::Int(v) => v.to_string(),
        Primitive::Float(v) => format!("{v:?}"),
        Primitive::Str(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for c in s.chars() {
                if c == '"' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
            out
        }
    }
}

/// Renders a formula tree.
#[must_use]
pub fn tree(tree: &FormulaTree) -> String {
    let mut out = String::new();
    write_tree(tree, &mut out);
    out
}

fn write_term(term: &TermRef, out: &mut String) {
    match term.data() {
        TermData::Constant { name, .. } => out.push_str(name),
        TermData::Variable { name } => {
            out.push('?');
            out.push_str(name);
        }
        TermData::Symbol { name } => {
            out.push(':');
            out.push_str(name);
        }
        TermData::NonAtomic { args } | TermData::Sentence { args } => write_args(args, out),
        TermData::Assertion { id, args, context, .. } => {
            out.push_str(&format!("#<assertion {id} in {context}: "));
            write_args(args, out);
            out.push('>');
        }
    }
}

fn write_args(args: &[RawArg], out: &mut String) {
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        match arg {
            RawArg::Term(t) => write_term(t, out),
            RawArg::Value(v) => out.push_str(&primitive(v)),
        }
    }
    out.push(')');
}

fn write_tree(tree: &FormulaTree, out: &mut String) {
    match tree {
        FormulaTree::Leaf(Leaf::Value(v)) => out.push_str(&primitive(v)),
        FormulaTree::Leaf(Leaf::Object(o)) => out.push_str(&o.label()),
        FormulaTree::Leaf(Leaf::Empty(CollectionShape::List)) => out.push_str("()"),
        FormulaTree::Leaf(Leaf::Empty(CollectionShape::Set)) => out.push_str("{}"),
        FormulaTree::Node(_) => {
            out.push('(');
            for (i, term) in tree.positions().iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_tree(term, out);
            }
            out.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atoms() {
        assert_eq!(term_label(&TermRef::constant("c1", "Dog")), "Dog");
        assert_eq!(term_label(&TermRef::variable("X")), "?X");
        assert_eq!(term_label(&TermRef::symbol("TRUE")), ":TRUE");
    }

    #[test]
    fn nested_terms() {
        let fruit = TermRef::non_atomic(vec![
            TermRef::constant("c3", "FruitFn").into(),
            TermRef::constant("c4", "AppleTree").into(),
        ]);
        let sentence = TermRef::sentence(vec![
            TermRef::constant("c5", "isa").into(),
            fruit.into(),
            RawArg::Value(Primitive::from("tart \"green\"")),
        ]);
        assert_eq!(
            canonical(&sentence).as_deref(),
            Some(r#"(isa (FruitFn AppleTree) "tart \"green\"")"#)
        );
    }

    #[test]
    fn assertions_have_no_canonical_string() {
        let a = TermRef::assertion(
            42,
            vec![TermRef::constant("c5", "isa").into()],
            "BaseKB",
            false,
        );
        assert_eq!(canonical(&a), None);
        assert_eq!(term_label(&a), "#<assertion 42 in BaseKB: (isa)>");
    }

    #[test]
    fn floats_keep_their_point() {
        assert_eq!(primitive(&Primitive::Float(2.0)), "2.0");
        assert_eq!(primitive(&Primitive::Int(2)), "2");
    }
}
