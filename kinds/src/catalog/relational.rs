//! Relational kinds — relations, predicates, functions.
//!
//! Relation kinds carry arity metadata, resolved lazily per facade object.

use crate::model::{CatalogModule, Kind, KindDef, DENOTATIONAL_SHAPES};

/// Returns the relational catalog module.
#[must_use]
pub fn module() -> CatalogModule {
    CatalogModule {
        name: "relational",
        comment: "Relations and their two principal specialisations.",
        kinds: kinds(),
    }
}

fn kinds() -> Vec<KindDef> {
    vec![
        KindDef {
            kind: Kind::Relation,
            label: "Relation",
            comment: "A relation of fixed or variable arity.",
            parents: &[Kind::Individual],
            collection: Some("Relation"),
            shapes: DENOTATIONAL_SHAPES,
            structural: false,
            requires_classification: true,
        },
        KindDef {
            kind: Kind::Predicate,
            label: "Predicate",
            comment: "A relation that heads sentences; a sentence headed by a \
                      predicate is true or false.",
            parents: &[Kind::Relation],
            collection: Some("Predicate"),
            shapes: DENOTATIONAL_SHAPES,
            structural: false,
            requires_classification: true,
        },
        KindDef {
            kind: Kind::BinaryPredicate,
            label: "BinaryPredicate",
            comment: "A predicate that takes exactly two arguments.",
            parents: &[Kind::Predicate],
            collection: Some("BinaryPredicate"),
            shapes: DENOTATIONAL_SHAPES,
            structural: false,
            requires_classification: true,
        },
        KindDef {
            kind: Kind::Function,
            label: "Function",
            comment: "A relation that heads non-atomic terms; applying it \
                      denotes a thing.",
            parents: &[Kind::Relation],
            collection: Some("Function-Denotational"),
            shapes: DENOTATIONAL_SHAPES,
            structural: false,
            requires_classification: true,
        },
    ]
}
